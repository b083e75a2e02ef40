use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod highlight;
pub mod hyperlinks;
pub mod models;
pub mod password;
pub mod permissions;
pub mod repository;

// Viewsets, the API root and the plain public endpoints.
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::list_users, handlers::users::get_user, handlers::users::create_user,
        handlers::accounts::signup, handlers::accounts::login,
        handlers::snippets::list_snippets, handlers::snippets::get_snippet,
        handlers::snippets::create_snippet, handlers::snippets::update_snippet,
        handlers::snippets::partial_update_snippet, handlers::snippets::delete_snippet,
        handlers::snippets::highlight_snippet,
        handlers::polls::list_questions, handlers::polls::get_question,
        handlers::polls::create_question, handlers::polls::update_question,
        handlers::polls::partial_update_question, handlers::polls::delete_question,
        handlers::polls::list_choices, handlers::polls::get_choice,
        handlers::polls::create_choice, handlers::polls::update_choice,
        handlers::polls::partial_update_choice, handlers::polls::delete_choice
    ),
    components(
        schemas(
            models::User, models::CreateUserRequest, models::SignupRequest,
            models::LoginRequest, models::TokenResponse,
            models::Snippet, models::SnippetPayload,
            models::QuestionResponse, models::QuestionPayload,
            models::ChoiceResponse, models::ChoicePayload,
        )
    ),
    tags(
        (name = "tutorial-api", description = "Users, snippets and polls")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared by every request: the persistence layer and the immutable
/// configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in deployments, in-memory for local runs and tests.
    pub repo: RepositoryState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // API root, resource viewsets and the public endpoints.
        .merge(routes::api_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`. Includes the `x-request-id` header so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

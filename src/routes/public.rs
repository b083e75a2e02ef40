use crate::{AppState, handlers::accounts};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints outside the resource viewsets. None of them require credentials.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; never touches the repository.
        .route("/health", get(|| async { "ok" }))
        // POST /signup/
        // Account creation with password confirmation.
        .route("/signup/", post(accounts::signup))
        // POST /login/
        // Exchanges credentials for a bearer token.
        .route("/login/", post(accounts::login))
}

use axum::{Json, extract::State, http::StatusCode};

use super::{Payload, users::register};
use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    error::{ApiError, ApiResult},
    models::{LoginRequest, SignupRequest, TokenResponse, User},
    password,
};

/// signup
///
/// [Public Route] Account creation with password confirmation.
#[utoipa::path(
    post,
    path = "/signup/",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Validation error")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Payload<SignupRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(payload) = payload?;
    let draft = payload.validate()?;
    let user = register(&state, draft).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Exchanges username and password for a bearer token.
/// Unknown users and wrong passwords get the same answer.
#[utoipa::path(
    post,
    path = "/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Payload<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    payload.validate()?;

    let rejected = ApiError::AuthenticationFailed("Unable to log in with provided credentials.");

    let Some(credentials) = state.repo.get_credentials(payload.username.trim()).await? else {
        tracing::info!(username = %payload.username, "login for unknown user");
        return Err(rejected);
    };

    if !password::verify_password_blocking(payload.password, credentials.password_hash).await {
        tracing::info!(user_id = credentials.id, "login with wrong password");
        return Err(rejected);
    }

    let user = AuthUser {
        id: credentials.id,
        username: credentials.username,
    };
    let access_token = issue_token(&state.config, &user)?;
    tracing::info!(user_id = user.id, "token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.token_ttl_secs,
    }))
}

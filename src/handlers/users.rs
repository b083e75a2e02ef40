use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::Payload;
use crate::{
    AppState,
    error::{ApiError, ApiResult, ValidationErrors},
    models::{AccountDraft, CreateUserRequest, User},
    password,
    repository::RepositoryError,
    routes::viewset::ViewSet,
};

/// Users: list, create, retrieve. No update or delete.
pub fn viewset() -> ViewSet {
    ViewSet::new()
        .list(list_users)
        .create(create_user)
        .retrieve(get_user)
}

/// list_users
///
/// [Public Route] Lists every account, ordered by id.
#[utoipa::path(
    get,
    path = "/users/",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

/// get_user
///
/// [Public Route] Read-only account detail, including owned snippet ids.
#[utoipa::path(
    get,
    path = "/users/{id}/",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<User>> {
    state
        .repo
        .get_user(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_user
///
/// [Public Route] Registers an account. Username format, uniqueness and the
/// password policy are enforced; only the argon2id hash is stored.
#[utoipa::path(
    post,
    path = "/users/",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Payload<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(payload) = payload?;
    let draft = payload.validate()?;
    let user = register(&state, draft).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Hashes the password and stores the account. Shared with signup.
pub(crate) async fn register(state: &AppState, draft: AccountDraft) -> ApiResult<User> {
    let hash = password::hash_password_blocking(draft.password.clone()).await?;

    match state.repo.create_user(draft.into_new_user(hash)).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, username = %user.username, "user registered");
            Ok(user)
        }
        Err(RepositoryError::Conflict(_)) => Err(ApiError::Validation(ValidationErrors::single(
            "username",
            "A user with that username already exists.",
        ))),
        Err(e) => Err(e.into()),
    }
}

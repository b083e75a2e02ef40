use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::get,
};

use super::Payload;
use crate::{
    AppState,
    auth::Requester,
    error::{ApiError, ApiResult, NOT_AUTHENTICATED},
    highlight,
    models::{Snippet, SnippetPayload},
    permissions::{
        Action, IsAuthenticatedOrReadOnly, IsOwnerOrReadOnly, Permission, check_object_permissions,
        check_permissions,
    },
    routes::viewset::ViewSet,
};

/// Snippets: full CRUD plus the `highlight` detail action.
pub fn viewset() -> ViewSet {
    ViewSet::new()
        .list(list_snippets)
        .create(create_snippet)
        .retrieve(get_snippet)
        .update(update_snippet)
        .partial_update(partial_update_snippet)
        .destroy(delete_snippet)
        .detail_action("highlight", get(highlight_snippet))
}

/// Checks applied to every snippet request, in order.
fn permissions() -> [&'static dyn Permission; 2] {
    [&IsAuthenticatedOrReadOnly, &IsOwnerOrReadOnly]
}

/// list_snippets
///
/// [Public Route] All snippets, oldest first.
#[utoipa::path(
    get,
    path = "/snippets/",
    responses((status = 200, description = "All snippets", body = [Snippet]))
)]
pub async fn list_snippets(
    requester: Requester,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Snippet>>> {
    check_permissions(&permissions(), Action::Read, requester.user())?;
    Ok(Json(state.repo.list_snippets().await?))
}

/// get_snippet
///
/// [Public Route] Anyone, including anonymous requesters, may read a snippet.
#[utoipa::path(
    get,
    path = "/snippets/{id}/",
    params(("id" = i64, Path, description = "Snippet ID")),
    responses(
        (status = 200, description = "Found", body = Snippet),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_snippet(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Snippet>> {
    check_permissions(&permissions(), Action::Read, requester.user())?;
    state
        .repo
        .get_snippet(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// highlight_snippet
///
/// [Public Route] Derived, read-only HTML rendering of the snippet's code.
#[utoipa::path(
    get,
    path = "/snippets/{id}/highlight/",
    params(("id" = i64, Path, description = "Snippet ID")),
    responses(
        (status = 200, description = "Rendered HTML", body = String, content_type = "text/html"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn highlight_snippet(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Html<String>> {
    check_permissions(&permissions(), Action::Read, requester.user())?;
    let snippet = state.repo.get_snippet(id).await?.ok_or(ApiError::NotFound)?;
    let html = tokio::task::spawn_blocking(move || highlight::render(&snippet))
        .await
        .map_err(|e| ApiError::Internal(format!("highlight task failed: {e}")))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Html(html))
}

/// create_snippet
///
/// [Authenticated Route] The owner is always the requester. An `owner` field
/// in the body is ignored.
#[utoipa::path(
    post,
    path = "/snippets/",
    request_body = SnippetPayload,
    responses(
        (status = 201, description = "Created", body = Snippet),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not authenticated")
    )
)]
pub async fn create_snippet(
    requester: Requester,
    State(state): State<AppState>,
    payload: Payload<SnippetPayload>,
) -> ApiResult<(StatusCode, Json<Snippet>)> {
    if let Err(denied) = check_permissions(&permissions(), Action::Write, requester.user()) {
        tracing::warn!("anonymous snippet create denied");
        return Err(denied);
    }
    let owner = requester
        .user()
        .ok_or(ApiError::PermissionDenied(NOT_AUTHENTICATED))?;

    let Json(payload) = payload?;
    let snippet = payload.validate(false)?.into_new();
    let created = state.repo.create_snippet(snippet, owner.id).await?;

    tracing::info!(snippet_id = created.id, owner_id = owner.id, "snippet created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_snippet
///
/// [Owner Only] Full update; `code` is required.
#[utoipa::path(
    put,
    path = "/snippets/{id}/",
    params(("id" = i64, Path, description = "Snippet ID")),
    request_body = SnippetPayload,
    responses(
        (status = 200, description = "Updated", body = Snippet),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_snippet(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Payload<SnippetPayload>,
) -> ApiResult<Json<Snippet>> {
    save(requester, state, id, payload, false).await
}

/// partial_update_snippet
///
/// [Owner Only] Only the supplied fields change.
#[utoipa::path(
    patch,
    path = "/snippets/{id}/",
    params(("id" = i64, Path, description = "Snippet ID")),
    request_body = SnippetPayload,
    responses(
        (status = 200, description = "Updated", body = Snippet),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn partial_update_snippet(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Payload<SnippetPayload>,
) -> ApiResult<Json<Snippet>> {
    save(requester, state, id, payload, true).await
}

/// delete_snippet
///
/// [Owner Only] Removes the snippet.
#[utoipa::path(
    delete,
    path = "/snippets/{id}/",
    params(("id" = i64, Path, description = "Snippet ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_snippet(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let snippet = load_for_write(&requester, &state, id).await?;

    if !state.repo.delete_snippet(snippet.id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(snippet_id = id, user_id = ?requester.id(), "snippet deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn save(
    requester: Requester,
    state: AppState,
    id: i64,
    payload: Payload<SnippetPayload>,
    partial: bool,
) -> ApiResult<Json<Snippet>> {
    load_for_write(&requester, &state, id).await?;

    let Json(payload) = payload?;
    let changes = payload.validate(partial)?;
    let updated = state
        .repo
        .update_snippet(id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(snippet_id = id, user_id = ?requester.id(), partial, "snippet updated");
    Ok(Json(updated))
}

/// View-level check, lookup, then the ownership check.
async fn load_for_write(requester: &Requester, state: &AppState, id: i64) -> ApiResult<Snippet> {
    let permissions = permissions();
    check_permissions(&permissions, Action::Write, requester.user())?;

    let snippet = state.repo.get_snippet(id).await?.ok_or(ApiError::NotFound)?;

    if let Err(denied) =
        check_object_permissions(&permissions, Action::Write, requester.user(), snippet.owner_id)
    {
        tracing::warn!(
            snippet_id = id,
            owner_id = ?snippet.owner_id,
            user_id = ?requester.id(),
            "write on snippet denied"
        );
        return Err(denied);
    }
    Ok(snippet)
}

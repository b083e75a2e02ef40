use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::Payload;
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    hyperlinks::Hyperlinks,
    models::{ChoicePayload, ChoiceResponse, QuestionPayload, QuestionResponse},
    routes::viewset::ViewSet,
};

pub fn question_viewset() -> ViewSet {
    ViewSet::new()
        .list(list_questions)
        .create(create_question)
        .retrieve(get_question)
        .update(update_question)
        .partial_update(partial_update_question)
        .destroy(delete_question)
}

pub fn choice_viewset() -> ViewSet {
    ViewSet::new()
        .list(list_choices)
        .create(create_choice)
        .retrieve(get_choice)
        .update(update_choice)
        .partial_update(partial_update_choice)
        .destroy(delete_choice)
}

fn links(state: &AppState) -> Hyperlinks {
    Hyperlinks::new(&state.config.public_url)
}

// --- Questions ---

/// list_questions
///
/// [Public Route] Every question with hyperlinks to its choices.
#[utoipa::path(
    get,
    path = "/questions/",
    responses((status = 200, description = "All questions", body = [QuestionResponse]))
)]
pub async fn list_questions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<QuestionResponse>>> {
    let links = links(&state);
    let questions = state.repo.list_questions().await?;
    Ok(Json(
        questions
            .into_iter()
            .map(|question| QuestionResponse::new(question, &links))
            .collect(),
    ))
}

/// get_question
#[utoipa::path(
    get,
    path = "/questions/{id}/",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Found", body = QuestionResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<QuestionResponse>> {
    let question = state.repo.get_question(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(QuestionResponse::new(question, &links(&state))))
}

/// create_question
///
/// [Public Route] `question_text` and an RFC 3339 `pub_date` are required.
/// `choices` is read-only and ignored on input.
#[utoipa::path(
    post,
    path = "/questions/",
    request_body = QuestionPayload,
    responses(
        (status = 201, description = "Created", body = QuestionResponse),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_question(
    State(state): State<AppState>,
    payload: Payload<QuestionPayload>,
) -> ApiResult<(StatusCode, Json<QuestionResponse>)> {
    let Json(payload) = payload?;
    let question = payload.validate(false)?.into_new()?;
    let created = state.repo.create_question(question).await?;

    tracing::info!(question_id = created.id, "question created");
    Ok((
        StatusCode::CREATED,
        Json(QuestionResponse::new(created, &links(&state))),
    ))
}

/// update_question
#[utoipa::path(
    put,
    path = "/questions/{id}/",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = QuestionPayload,
    responses(
        (status = 200, description = "Updated", body = QuestionResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Payload<QuestionPayload>,
) -> ApiResult<Json<QuestionResponse>> {
    save_question(state, id, payload, false).await
}

/// partial_update_question
#[utoipa::path(
    patch,
    path = "/questions/{id}/",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = QuestionPayload,
    responses(
        (status = 200, description = "Updated", body = QuestionResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn partial_update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Payload<QuestionPayload>,
) -> ApiResult<Json<QuestionResponse>> {
    save_question(state, id, payload, true).await
}

/// delete_question
///
/// [Public Route] Removes the question and all of its choices.
#[utoipa::path(
    delete,
    path = "/questions/{id}/",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.repo.delete_question(id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(question_id = id, "question deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn save_question(
    state: AppState,
    id: i64,
    payload: Payload<QuestionPayload>,
    partial: bool,
) -> ApiResult<Json<QuestionResponse>> {
    if state.repo.get_question(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let Json(payload) = payload?;
    let changes = payload.validate(partial)?;
    let updated = state
        .repo
        .update_question(id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(QuestionResponse::new(updated, &links(&state))))
}

// --- Choices ---

/// list_choices
///
/// [Public Route] Every choice with a hyperlink to its question.
#[utoipa::path(
    get,
    path = "/choices/",
    responses((status = 200, description = "All choices", body = [ChoiceResponse]))
)]
pub async fn list_choices(State(state): State<AppState>) -> ApiResult<Json<Vec<ChoiceResponse>>> {
    let links = links(&state);
    let choices = state.repo.list_choices().await?;
    Ok(Json(
        choices
            .into_iter()
            .map(|choice| ChoiceResponse::new(choice, &links))
            .collect(),
    ))
}

/// get_choice
#[utoipa::path(
    get,
    path = "/choices/{id}/",
    params(("id" = i64, Path, description = "Choice ID")),
    responses(
        (status = 200, description = "Found", body = ChoiceResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_choice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ChoiceResponse>> {
    let choice = state.repo.get_choice(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(ChoiceResponse::new(choice, &links(&state))))
}

/// create_choice
///
/// [Public Route] `question` must be the hyperlink of an existing question.
#[utoipa::path(
    post,
    path = "/choices/",
    request_body = ChoicePayload,
    responses(
        (status = 201, description = "Created", body = ChoiceResponse),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_choice(
    State(state): State<AppState>,
    payload: Payload<ChoicePayload>,
) -> ApiResult<(StatusCode, Json<ChoiceResponse>)> {
    let links = links(&state);
    let Json(payload) = payload?;
    let choice = payload.validate(false, &links)?.into_new()?;
    let created = state.repo.create_choice(choice).await?;

    tracing::info!(choice_id = created.id, question_id = created.question_id, "choice created");
    Ok((StatusCode::CREATED, Json(ChoiceResponse::new(created, &links))))
}

/// update_choice
#[utoipa::path(
    put,
    path = "/choices/{id}/",
    params(("id" = i64, Path, description = "Choice ID")),
    request_body = ChoicePayload,
    responses(
        (status = 200, description = "Updated", body = ChoiceResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_choice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Payload<ChoicePayload>,
) -> ApiResult<Json<ChoiceResponse>> {
    save_choice(state, id, payload, false).await
}

/// partial_update_choice
///
/// [Public Route] Typical use is bumping `votes`.
#[utoipa::path(
    patch,
    path = "/choices/{id}/",
    params(("id" = i64, Path, description = "Choice ID")),
    request_body = ChoicePayload,
    responses(
        (status = 200, description = "Updated", body = ChoiceResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn partial_update_choice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Payload<ChoicePayload>,
) -> ApiResult<Json<ChoiceResponse>> {
    save_choice(state, id, payload, true).await
}

/// delete_choice
#[utoipa::path(
    delete,
    path = "/choices/{id}/",
    params(("id" = i64, Path, description = "Choice ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_choice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.repo.delete_choice(id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(choice_id = id, "choice deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn save_choice(
    state: AppState,
    id: i64,
    payload: Payload<ChoicePayload>,
    partial: bool,
) -> ApiResult<Json<ChoiceResponse>> {
    if state.repo.get_choice(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let links = links(&state);
    let Json(payload) = payload?;
    let changes = payload.validate(partial, &links)?;
    let updated = state
        .repo
        .update_choice(id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ChoiceResponse::new(updated, &links)))
}

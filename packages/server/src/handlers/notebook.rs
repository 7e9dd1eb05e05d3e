use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::notebook::{CreateNotebookRequest, NotebookResponse};
use crate::repository::NewNotebook;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/notebook",
    tag = "Notebooks",
    operation_id = "listNotebooks",
    summary = "List notebooks",
    description = "Returns every notebook, oldest first.",
    responses(
        (status = 200, description = "Notebooks", body = Vec<NotebookResponse>),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_notebooks(
    State(state): State<AppState>,
) -> Result<Json<Vec<NotebookResponse>>, AppError> {
    let notebooks = state.repo.list_notebooks().await?;
    Ok(Json(
        notebooks.into_iter().map(NotebookResponse::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/notebook",
    tag = "Notebooks",
    operation_id = "createNotebook",
    summary = "Create a notebook",
    request_body = CreateNotebookRequest,
    responses(
        (status = 201, description = "Notebook created", body = NotebookResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Commit failed (COMMIT_FAILED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn create_notebook(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateNotebookRequest>,
) -> Result<impl IntoResponse, AppError> {
    let notebook = state
        .repo
        .create_notebook(NewNotebook { name: payload.name })
        .await?;
    Ok((StatusCode::CREATED, Json(NotebookResponse::from(notebook))))
}

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::storage::ContentHash;
use tracing::{instrument, warn};

use crate::error::{AppError, ErrorBody};
use crate::extractors::id::IdPath;
use crate::extractors::json::AppJson;
use crate::models::note::{
    CreateNoteRequest, NoteListQuery, NoteResponse, UpdateNoteRequest, VersionResponse,
};
use crate::repository::{EntityId, NewNote, NotePatch, RepoError};
use crate::search::NoteFilter;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/note",
    tag = "Notes",
    operation_id = "listNotes",
    summary = "List or search notes",
    description = "Notes ordered by most recent body update. `notebook` takes precedence \
        over `query`; with neither, every note is returned.",
    params(NoteListQuery),
    responses(
        (status = 200, description = "Matching notes", body = Vec<NoteResponse>),
        (status = 400, description = "Malformed notebook ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "Search index unavailable (INDEX_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params))]
pub async fn list_notes(
    State(state): State<AppState>,
    Query(params): Query<NoteListQuery>,
) -> Result<Json<Vec<NoteResponse>>, AppError> {
    let filter = note_filter(&params)?;
    let ids = state.indexer.query(&filter).await?;

    let mut notes = Vec::with_capacity(ids.len());
    for id in ids {
        match state.repo.get_note(id).await {
            Ok(note) => notes.push(NoteResponse::from(note)),
            Err(RepoError::NotFound(_)) => {
                warn!(note_id = %id, "Index returned a note the store does not have");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Json(notes))
}

fn note_filter(params: &NoteListQuery) -> Result<NoteFilter, AppError> {
    if let Some(notebook) = non_blank(&params.notebook) {
        return Ok(NoteFilter::Notebook(EntityId::parse(notebook)?));
    }
    Ok(match non_blank(&params.query) {
        Some(text) => NoteFilter::Text(text.to_owned()),
        None => NoteFilter::MatchAll,
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[utoipa::path(
    post,
    path = "/api/note",
    tag = "Notes",
    operation_id = "createNote",
    summary = "Create a note",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Commit failed (COMMIT_FAILED)", body = ErrorBody),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn create_note(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let notebook_id = EntityId::parse(&payload.notebook)?;
    let note = state
        .repo
        .create_note(NewNote {
            title: payload.title,
            notebook_id,
            body: payload.body,
            attachment_id: None,
        })
        .await?;

    state.indexer.publish_created(&note, None).await;

    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

#[utoipa::path(
    get,
    path = "/api/note/{id}",
    tag = "Notes",
    operation_id = "getNote",
    summary = "Get a note",
    description = "Returns the note with its current body text and full body history.",
    params(("id" = String, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note", body = NoteResponse),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Note not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(note_id = %id))]
pub async fn get_note(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<NoteResponse>, AppError> {
    let note = state.repo.get_note(id).await?;
    Ok(Json(NoteResponse::from(note)))
}

#[utoipa::path(
    put,
    path = "/api/note/{id}",
    tag = "Notes",
    operation_id = "updateNote",
    summary = "Update a note",
    description = "Merge-patch: only `title` and `body` are read, and only when present. \
        Each present field gets a new history entry.",
    params(("id" = String, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Updated note", body = NoteResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Note not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Commit failed (COMMIT_FAILED)", body = ErrorBody),
        (status = 503, description = "Nothing was written (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(note_id = %id))]
pub async fn update_note(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    AppJson(payload): AppJson<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    let patch = NotePatch::from(payload);
    let note = state.repo.update_note(id, &patch).await?;

    if !patch.is_empty() {
        state.indexer.publish_updated(&note, &patch).await;
    }

    Ok(Json(NoteResponse::from(note)))
}

#[utoipa::path(
    get,
    path = "/api/note/version/{hash}",
    tag = "Notes",
    operation_id = "getNoteVersion",
    summary = "Get a historical body",
    params(("hash" = String, Path, description = "Body version hash from a note's history")),
    responses(
        (status = 200, description = "Body text", body = VersionResponse),
        (status = 400, description = "Malformed hash (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Version not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_version(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<VersionResponse>, AppError> {
    let hash = ContentHash::from_hex(&hash)?;
    let body = state.repo.body_version(&hash).await?;
    Ok(Json(VersionResponse { body }))
}

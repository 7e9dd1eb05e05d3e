use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{info, instrument, warn};

use crate::error::{AppError, ErrorBody};
use crate::extractors::id::IdPath;
use crate::models::note::NoteResponse;
use crate::repository::NewAttachment;
use crate::state::AppState;

/// Room for the multipart framing around a maximum-size file.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let limit = max_blob_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/api/upload/{notebook}",
    tag = "Attachments",
    operation_id = "uploadFiles",
    summary = "Import files as notes",
    description = "Each multipart `file` field becomes an attachment plus a note titled \
        after the filename. Text is extracted from PDFs and text files for search.",
    params(("notebook" = String, Path, description = "Notebook ID")),
    request_body(content_type = "multipart/form-data", description = "One or more `file` fields"),
    responses(
        (status = 201, description = "Created notes", body = Vec<NoteResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 500, description = "Commit failed (COMMIT_FAILED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart), fields(notebook_id = %notebook_id))]
pub async fn upload_files(
    State(state): State<AppState>,
    IdPath(notebook_id): IdPath,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_size = state.config.storage.max_blob_size;
    let mut created = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }

        let filename = field
            .file_name()
            .and_then(flat_filename)
            .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
        let content = read_field(field, max_size).await?;
        let kind = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();

        let extracted = match state.extractor.extract(&content, &kind).await {
            Ok(text) => text,
            Err(e) => {
                warn!(%filename, error = %e, "Text extraction failed; importing without text");
                None
            }
        };

        let note = state
            .repo
            .import_file(
                notebook_id,
                filename.clone(),
                NewAttachment {
                    content: &content,
                    extracted_text: extracted.as_deref(),
                    filename,
                    kind,
                },
            )
            .await?;

        state.indexer.publish_created(&note, extracted).await;
        created.push(NoteResponse::from(note));
    }

    if created.is_empty() {
        return Err(AppError::Validation("Missing 'file' field".into()));
    }

    info!(count = created.len(), "Files imported");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Last path component of a client-supplied filename.
fn flat_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_owned())
    }
}

async fn read_field(mut field: Field<'_>, max_size: u64) -> Result<Vec<u8>, AppError> {
    let mut content = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (content.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        content.extend_from_slice(&chunk);
    }
    Ok(content)
}

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::{BlobStore, ContentHash};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::id::IdPath;
use crate::models::attachment::AttachmentResponse;
use crate::models::note::PdfQuery;
use crate::repository::Attachment;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/note/{id}/pdf",
    tag = "Attachments",
    operation_id = "downloadNoteAttachment",
    summary = "Download a note's attachment",
    description = "Streams the original uploaded file. Shown inline unless `dl` is set. \
        Supports ETag-based caching via If-None-Match.",
    params(
        ("id" = String, Path, description = "Note ID"),
        PdfQuery,
    ),
    responses(
        (status = 200, description = "Attachment content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Note or attachment not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers, query), fields(note_id = %id))]
pub async fn download_note_attachment(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    Query(query): Query<PdfQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let head = state.repo.note_head(id).await?;
    let attachment_id = head
        .attachment_id
        .ok_or_else(|| AppError::NotFound(format!("Note {id} has no attachment")))?;
    let attachment = state.repo.get_attachment(attachment_id).await?;

    let disposition = if query.dl.as_deref().is_some_and(|v| !v.is_empty()) {
        Disposition::Attachment
    } else {
        Disposition::Inline
    };

    build_blob_response(&attachment, &headers, state.repo.blobs().as_ref(), disposition).await
}

#[utoipa::path(
    get,
    path = "/api/attachment/{id}",
    tag = "Attachments",
    operation_id = "getAttachment",
    summary = "Get attachment metadata",
    params(("id" = String, Path, description = "Attachment ID")),
    responses(
        (status = 200, description = "Attachment", body = AttachmentResponse),
        (status = 404, description = "Attachment not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(attachment_id = %id))]
pub async fn get_attachment(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<AttachmentResponse>, AppError> {
    let attachment = state.repo.get_attachment(id).await?;
    Ok(Json(AttachmentResponse::from(attachment)))
}

#[derive(Clone, Copy)]
enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// Stream an attachment's content blob.
async fn build_blob_response(
    attachment: &Attachment,
    headers: &HeaderMap,
    blob_store: &dyn BlobStore,
    disposition: Disposition,
) -> Result<Response, AppError> {
    let etag = blob_etag(&attachment.content_ref);
    if client_has(headers, &etag) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = blob_store.get_stream(&attachment.content_ref).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = if attachment.kind.is_empty() {
        "application/octet-stream"
    } else {
        attachment.kind.as_str()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, attachment.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(disposition, &attachment.filename),
        )
        .header(header::ETAG, &etag)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Strong ETag: the quoted content hash.
fn blob_etag(hash: &ContentHash) -> String {
    format!("\"{hash}\"")
}

/// Whether `If-None-Match` lists `etag` (or `*`).
fn client_has(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|tag| tag.trim().trim_start_matches("W/"))
        .any(|tag| tag == "*" || tag == etag)
}

/// `Content-Disposition` value with an ASCII fallback name and an RFC 5987
/// `filename*` parameter.
fn content_disposition_value(disposition: Disposition, filename: &str) -> String {
    let ascii_name: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_name.is_empty() {
        "download".to_string()
    } else {
        ascii_name
    };

    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => String::from(b as char),
            b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~' => {
                String::from(b as char)
            }
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!(
        "{}; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}",
        disposition.as_str()
    )
}

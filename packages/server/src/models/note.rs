use serde::{Deserialize, Serialize};

use crate::models::attachment::AttachmentResponse;
use crate::repository::{Note, NotePatch, Revision};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateNoteRequest {
    #[schema(example = "Draft")]
    pub title: String,
    /// Notebook ID the note belongs to.
    #[schema(example = "0f8c2a6e1d3b4c5a9e7f6d5c4b3a2918")]
    pub notebook: String,
    /// Optional initial body.
    #[serde(default)]
    pub body: Option<String>,
}

/// Merge-patch body: absent fields are left unchanged.
///
/// Other note fields (`id`, `history`, ...) may be sent back as received
/// and are ignored.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl From<UpdateNoteRequest> for NotePatch {
    fn from(req: UpdateNoteRequest) -> Self {
        Self {
            title: req.title,
            body: req.body,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NoteListQuery {
    /// Restrict to one notebook. Takes precedence over `query`.
    pub notebook: Option<String>,
    /// Full-text query.
    pub query: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PdfQuery {
    /// Any non-empty value asks for a download instead of inline display.
    pub dl: Option<String>,
}

/// One body version. `version` is empty for the creation entry.
#[derive(Serialize, utoipa::ToSchema)]
pub struct HistoryEntry {
    /// Unix milliseconds.
    pub updated_at: i64,
    #[schema(example = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")]
    pub version: String,
}

impl From<Revision> for HistoryEntry {
    fn from(rev: Revision) -> Self {
        Self {
            updated_at: rev.updated_at,
            version: rev.version.map(|h| h.to_hex()).unwrap_or_default(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NoteResponse {
    #[schema(example = "6f1d0c3e9b7a4f25a8e4c1d2b3a49f10")]
    pub id: String,
    #[schema(example = "Draft")]
    pub title: String,
    #[schema(example = "hello")]
    pub body: String,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds of the latest body version.
    pub updated_at: i64,
    /// Body versions, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Notebook ID.
    pub notebook: String,
    /// Empty when the note has no attachment.
    pub attachment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentResponse>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id.to_string(),
            title: note.title,
            body: note.body,
            created_at: note.created_at,
            updated_at: note.updated_at,
            history: note.history.into_iter().map(HistoryEntry::from).collect(),
            notebook: note.notebook_id.to_string(),
            attachment_id: note
                .attachment_id
                .map(|a| a.to_string())
                .unwrap_or_default(),
            attachment: note.attachment.map(AttachmentResponse::from),
        }
    }
}

/// A historical body version.
#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionResponse {
    pub body: String,
}

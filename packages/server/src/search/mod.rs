//! Secondary full-text index: the client seam ([`SearchIndex`]), its two
//! implementations, and the synchronizer that mirrors committed note state
//! into it.

mod elastic;
mod memory;
mod outbox;
mod sync;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repository::{EntityId, Note};

pub use elastic::ElasticIndex;
pub use memory::MemoryIndex;
pub use outbox::run_outbox_retrier;
pub use sync::{IndexSync, OutboxReport, ReindexReport, SyncError};

/// Document stored in the index for one note, with blobs resolved to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDocument {
    pub id: String,
    pub title: String,
    pub body: String,
    pub notebook: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_content: Option<String>,
}

impl NoteDocument {
    pub fn from_note(note: &Note, attachment_content: Option<String>) -> Self {
        Self {
            id: note.id.to_string(),
            title: note.title.clone(),
            body: note.body.clone(),
            notebook: note.notebook_id.to_string(),
            created_at: note.created_at,
            updated_at: note.updated_at,
            attachment_id: note.attachment_id.map(|a| a.to_string()),
            attachment_content,
        }
    }
}

/// Partial document update; absent fields are left as indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.updated_at.is_none()
    }
}

/// Structured note query, translated by each index into its own language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFilter {
    MatchAll,
    /// Free-text query string.
    Text(String),
    /// Exact match on the owning notebook.
    Notebook(EntityId),
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("search index unreachable: {0}")]
    Unavailable(String),

    #[error("search index rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("document {0} is not indexed")]
    MissingDocument(String),

    #[error("malformed search response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IndexError::Malformed(err.to_string())
        } else {
            IndexError::Unavailable(err.to_string())
        }
    }
}

/// Client for the external document index.
///
/// Every write is idempotent: re-sending the same document is a no-op.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create the index if it does not exist yet.
    async fn ensure_index(&self) -> Result<(), IndexError> {
        Ok(())
    }

    /// Insert or replace the whole document for `id`.
    async fn put_document(&self, id: &str, doc: &NoteDocument) -> Result<(), IndexError>;

    /// Merge `patch` into an existing document.
    async fn patch_document(&self, id: &str, patch: &DocumentPatch) -> Result<(), IndexError>;

    /// Remove every document, leaving an empty index ready for writes.
    async fn drop_all(&self) -> Result<(), IndexError>;

    /// Ids of matching documents, most recently updated first.
    async fn search(&self, filter: &NoteFilter) -> Result<Vec<String>, IndexError>;
}

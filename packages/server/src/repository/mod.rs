//! Entity assembly: composes attribute logs, scalars and blob references
//! into Note, Notebook and Attachment views.

mod attachment;
mod clock;
mod error;
mod id;
mod note;
mod notebook;

use std::sync::Arc;

use common::storage::{BlobStore, ContentHash};

use crate::store::PrimaryStore;

pub use attachment::{Attachment, NewAttachment};
pub use clock::Clock;
pub use error::RepoError;
pub use id::EntityId;
pub use note::{NewNote, Note, NoteHead, NotePatch, Revision};
pub use notebook::{NewNotebook, Notebook};

/// Entity set names.
pub(crate) mod sets {
    pub const NOTES: &str = "notes";
    pub const NOTEBOOKS: &str = "notebooks";
    pub const ATTACHMENTS: &str = "attachments";
}

/// Field names shared by the entity kinds.
pub(crate) mod fields {
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
    pub const CREATED_AT: &str = "created_at";
    pub const NOTEBOOK_ID: &str = "notebook_id";
    pub const ATTACHMENT_ID: &str = "attachment_id";
}

/// Value every log is seeded with at creation time.
pub(crate) const SENTINEL: &str = "";

#[derive(Clone)]
pub struct Repository {
    store: PrimaryStore,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<Clock>,
}

impl Repository {
    pub fn new(store: PrimaryStore, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            clock: Arc::new(Clock::default()),
        }
    }

    pub fn store(&self) -> &PrimaryStore {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Dereference a blob and decode it as text.
    pub async fn blob_text(&self, hash: &ContentHash) -> Result<String, RepoError> {
        let bytes = self.blobs.get(hash).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn parse_timestamp(entity: &EntityId, raw: Option<&String>) -> Result<i64, RepoError> {
    raw.and_then(|v| v.parse().ok())
        .ok_or_else(|| RepoError::Corrupt(format!("entity {entity} has no valid created_at")))
}

use std::collections::HashMap;

use common::storage::ContentHash;
use tracing::{debug, instrument};

use super::{EntityId, RepoError, Repository, fields, parse_timestamp, sets};
use crate::store::Transaction;

mod record {
    pub const CONTENT_REF: &str = "content_ref";
    pub const TEXT_REF: &str = "text_ref";
    pub const KIND: &str = "type";
    pub const FILENAME: &str = "filename";
    pub const SIZE: &str = "size";
}

/// Write-once file attached to a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: EntityId,
    pub content_ref: ContentHash,
    /// Blob holding text extracted from the content, when there was any.
    pub text_ref: Option<ContentHash>,
    /// Type tag, a MIME type such as `application/pdf`.
    pub kind: String,
    pub filename: String,
    pub size: u64,
    pub created_at: i64,
}

pub struct NewAttachment<'a> {
    pub content: &'a [u8],
    pub extracted_text: Option<&'a str>,
    pub filename: String,
    pub kind: String,
}

pub(super) struct UploadedBlobs {
    content_ref: ContentHash,
    text_ref: Option<ContentHash>,
}

impl Repository {
    /// Upload the content (and extracted text) and record the attachment.
    #[instrument(skip(self, input), fields(filename = %input.filename))]
    pub async fn create_attachment(
        &self,
        input: NewAttachment<'_>,
    ) -> Result<Attachment, RepoError> {
        let uploaded = self.upload_attachment_blobs(&input).await?;
        let id = EntityId::generate();
        let now = self.clock.now();

        let mut tx = self.store.begin();
        let attachment = self.stage_attachment(&mut tx, id, now, &input, uploaded);
        self.store.commit(tx).await?;

        debug!(attachment_id = %id, "Attachment created");
        Ok(attachment)
    }

    pub async fn get_attachment(&self, id: EntityId) -> Result<Attachment, RepoError> {
        let key = id.to_string();
        let fields = self.store.record(&key).await?;
        if fields.is_empty() {
            return Err(RepoError::NotFound(format!("Attachment {id}")));
        }
        let created_at = self.store.scalar(&key, super::fields::CREATED_AT).await?;
        attachment_from_record(id, &fields, created_at.as_ref())
    }

    /// Extracted text of an attachment, or `None` if nothing was extracted.
    pub async fn attachment_text(
        &self,
        attachment: &Attachment,
    ) -> Result<Option<String>, RepoError> {
        match &attachment.text_ref {
            Some(hash) => Ok(Some(self.blob_text(hash).await?)),
            None => Ok(None),
        }
    }

    pub(super) async fn upload_attachment_blobs(
        &self,
        input: &NewAttachment<'_>,
    ) -> Result<UploadedBlobs, RepoError> {
        let content_ref = self.blobs.upload_if_absent(input.content).await?;
        let text_ref = match input.extracted_text {
            Some(text) if !text.is_empty() => {
                Some(self.blobs.upload_if_absent(text.as_bytes()).await?)
            }
            _ => None,
        };
        Ok(UploadedBlobs {
            content_ref,
            text_ref,
        })
    }

    pub(super) fn stage_attachment(
        &self,
        tx: &mut Transaction,
        id: EntityId,
        now: i64,
        input: &NewAttachment<'_>,
        uploaded: UploadedBlobs,
    ) -> Attachment {
        let key = id.to_string();
        let size = input.content.len() as u64;

        tx.add_to_set(sets::ATTACHMENTS, key.as_str(), now)
            .set_scalar(key.as_str(), fields::CREATED_AT, now.to_string())
            .set_hash_field(key.as_str(), record::CONTENT_REF, uploaded.content_ref.to_hex())
            .set_hash_field(key.as_str(), record::KIND, input.kind.as_str())
            .set_hash_field(key.as_str(), record::FILENAME, input.filename.as_str())
            .set_hash_field(key.as_str(), record::SIZE, size.to_string());
        if let Some(text_ref) = &uploaded.text_ref {
            tx.set_hash_field(key.as_str(), record::TEXT_REF, text_ref.to_hex());
        }

        Attachment {
            id,
            content_ref: uploaded.content_ref,
            text_ref: uploaded.text_ref,
            kind: input.kind.clone(),
            filename: input.filename.clone(),
            size,
            created_at: now,
        }
    }
}

fn attachment_from_record(
    id: EntityId,
    fields: &HashMap<String, String>,
    created_at: Option<&String>,
) -> Result<Attachment, RepoError> {
    let hash_field = |name: &str| -> Result<Option<ContentHash>, RepoError> {
        fields
            .get(name)
            .map(|v| ContentHash::from_hex(v))
            .transpose()
            .map_err(|e| RepoError::Corrupt(format!("attachment {id} {name}: {e}")))
    };

    let content_ref = hash_field(record::CONTENT_REF)?
        .ok_or_else(|| RepoError::Corrupt(format!("attachment {id} has no content")))?;

    Ok(Attachment {
        id,
        content_ref,
        text_ref: hash_field(record::TEXT_REF)?,
        kind: fields.get(record::KIND).cloned().unwrap_or_default(),
        filename: fields.get(record::FILENAME).cloned().unwrap_or_default(),
        size: fields
            .get(record::SIZE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        created_at: parse_timestamp(&id, created_at)?,
    })
}

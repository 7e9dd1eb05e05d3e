use serde::Serialize;

use crate::repository::Attachment;

/// Response DTO for an attachment record.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AttachmentResponse {
    /// Attachment ID.
    #[schema(example = "b9e1a3f0c4d24b7a9e5f1c2d3e4f5a6b")]
    pub id: String,
    /// SHA-256 hash of the stored file.
    #[serde(rename = "ref")]
    #[schema(example = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")]
    pub content_ref: String,
    /// SHA-256 hash of the extracted text, when any was extracted.
    #[serde(rename = "content_ref", skip_serializing_if = "Option::is_none")]
    pub text_ref: Option<String>,
    /// MIME type of the file.
    #[serde(rename = "type")]
    #[schema(example = "application/pdf")]
    pub kind: String,
    #[schema(example = "report.pdf")]
    pub filename: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl From<Attachment> for AttachmentResponse {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id.to_string(),
            content_ref: attachment.content_ref.to_hex(),
            text_ref: attachment.text_ref.map(|h| h.to_hex()),
            kind: attachment.kind,
            filename: attachment.filename,
            size: attachment.size,
            created_at: attachment.created_at,
        }
    }
}

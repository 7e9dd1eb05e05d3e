use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::retry::calculate_backoff;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::{DocumentPatch, IndexError, NoteDocument, NoteFilter, SearchIndex};
use crate::config::OutboxConfig;
use crate::entity::index_outbox;
use crate::repository::{EntityId, Note, NotePatch, RepoError, Repository};

/// Outcome of a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ReindexReport {
    /// Notes written to the index.
    pub indexed: u64,
    /// Indexed notes whose body or attachment text could not be resolved.
    pub degraded: u64,
    /// Notes left out of the index.
    pub failed: u64,
}

/// Outcome of one outbox pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxReport {
    pub delivered: u64,
    pub retried: u64,
    /// Entries dropped because their note no longer resolves.
    pub discarded: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("outbox unavailable: {0}")]
    Outbox(#[from] DbErr),
}

/// Keeps the search index consistent with committed note state.
///
/// The primary store is authoritative. Index writes happen after commit;
/// when one fails the note id is parked in the `index_outbox` table and a
/// later pass re-sends the full document.
pub struct IndexSync {
    index: Arc<dyn SearchIndex>,
    db: DatabaseConnection,
    outbox: OutboxConfig,
}

#[derive(Clone, Copy)]
enum Operation {
    Create,
    Update,
    Reindex,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Reindex => "reindex",
        }
    }
}

/// Ids per `IN (...)` clause when resolving outbox rows.
const RESOLVE_CHUNK: usize = 500;

impl IndexSync {
    pub fn new(index: Arc<dyn SearchIndex>, db: DatabaseConnection, outbox: OutboxConfig) -> Self {
        Self { index, db, outbox }
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    pub fn outbox_config(&self) -> &OutboxConfig {
        &self.outbox
    }

    /// Write the full document of a freshly created note.
    pub async fn index_create(
        &self,
        note: &Note,
        attachment_text: Option<String>,
    ) -> Result<(), IndexError> {
        let doc = NoteDocument::from_note(note, attachment_text);
        self.index.put_document(&doc.id, &doc).await
    }

    /// Patch only the fields present in `patch`, taking values from the
    /// committed `note`.
    pub async fn index_update(&self, note: &Note, patch: &NotePatch) -> Result<(), IndexError> {
        let doc_patch = DocumentPatch {
            title: patch.title.as_ref().map(|_| note.title.clone()),
            body: patch.body.as_ref().map(|_| note.body.clone()),
            updated_at: patch.body.as_ref().map(|_| note.updated_at),
        };
        if doc_patch.is_empty() {
            return Ok(());
        }
        self.index
            .patch_document(&note.id.to_string(), &doc_patch)
            .await
    }

    /// Best-effort [`Self::index_create`]; failures go to the outbox.
    pub async fn publish_created(&self, note: &Note, attachment_text: Option<String>) {
        if let Err(e) = self.index_create(note, attachment_text).await {
            warn!(note_id = %note.id, error = %e, "Index write failed after commit");
            self.enqueue(note.id, Operation::Create, e.to_string()).await;
        }
    }

    /// Best-effort [`Self::index_update`]; failures go to the outbox.
    pub async fn publish_updated(&self, note: &Note, patch: &NotePatch) {
        if let Err(e) = self.index_update(note, patch).await {
            warn!(note_id = %note.id, error = %e, "Index update failed after commit");
            self.enqueue(note.id, Operation::Update, e.to_string()).await;
        }
    }

    /// Matching note ids, most recently updated first. Ids the index holds
    /// in an unexpected shape are skipped.
    pub async fn query(&self, filter: &NoteFilter) -> Result<Vec<EntityId>, IndexError> {
        let raw = self.index.search(filter).await?;
        Ok(raw
            .into_iter()
            .filter_map(|id| match EntityId::parse(&id) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(document_id = %id, "Ignoring index hit with malformed id");
                    None
                }
            })
            .collect())
    }

    pub async fn drop_all(&self) -> Result<(), IndexError> {
        self.index.drop_all().await
    }

    /// Rebuild the index from the primary store.
    ///
    /// Notes that cannot be assembled or written are counted, skipped and
    /// parked in the outbox. Outbox entries older than the rebuild are
    /// resolved only for notes the rebuild actually wrote.
    #[instrument(skip_all)]
    pub async fn reindex_all(&self, repo: &Repository) -> Result<ReindexReport, SyncError> {
        let started = Utc::now();
        self.index.drop_all().await?;
        let ids = repo.note_ids().await?;

        let mut report = ReindexReport::default();
        let mut written = Vec::with_capacity(ids.len());
        for id in ids {
            let (doc, degraded) = match self.resolve_document(repo, id).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(note_id = %id, error = %e, "Skipping unreadable note");
                    report.failed += 1;
                    self.enqueue(id, Operation::Reindex, e.to_string()).await;
                    continue;
                }
            };
            match self.index.put_document(&doc.id, &doc).await {
                Ok(()) => {
                    report.indexed += 1;
                    if degraded {
                        report.degraded += 1;
                    }
                    written.push(doc.id);
                }
                Err(e) => {
                    warn!(note_id = %id, error = %e, "Failed to index note");
                    report.failed += 1;
                    self.enqueue(id, Operation::Reindex, e.to_string()).await;
                }
            }
        }

        if let Err(e) = self.resolve_rebuilt(&written, started).await {
            error!(error = %e, "Failed to clear outbox after reindex");
        }

        info!(
            indexed = report.indexed,
            degraded = report.degraded,
            failed = report.failed,
            "Reindex finished"
        );
        Ok(report)
    }

    /// Assemble the index document for one note. Blob failures blank the
    /// affected text and flag the document as degraded instead of failing.
    pub async fn resolve_document(
        &self,
        repo: &Repository,
        id: EntityId,
    ) -> Result<(NoteDocument, bool), RepoError> {
        let head = repo.note_head(id).await?;
        let mut degraded = false;

        let body = match &head.body_ref {
            Some(hash) => match repo.blob_text(hash).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(note_id = %id, %hash, error = %e, "Body blob unreadable");
                    degraded = true;
                    String::new()
                }
            },
            None => String::new(),
        };

        let attachment_content = match head.attachment_id {
            Some(attachment_id) => match self.attachment_text(repo, attachment_id).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(note_id = %id, %attachment_id, error = %e, "Attachment text unreadable");
                    degraded = true;
                    None
                }
            },
            None => None,
        };

        let doc = NoteDocument {
            id: head.id.to_string(),
            title: head.title,
            body,
            notebook: head.notebook_id.to_string(),
            created_at: head.created_at,
            updated_at: head.updated_at,
            attachment_id: head.attachment_id.map(|a| a.to_string()),
            attachment_content,
        };
        Ok((doc, degraded))
    }

    async fn attachment_text(
        &self,
        repo: &Repository,
        attachment_id: EntityId,
    ) -> Result<Option<String>, RepoError> {
        let attachment = repo.get_attachment(attachment_id).await?;
        repo.attachment_text(&attachment).await
    }

    async fn enqueue(&self, note_id: EntityId, operation: Operation, error_message: String) {
        let now = Utc::now();
        let entry = index_outbox::ActiveModel {
            entity_id: Set(note_id.to_string()),
            operation: Set(operation.as_str().to_owned()),
            error_message: Set(error_message),
            attempts: Set(0),
            created_at: Set(now),
            next_attempt_at: Set(now),
            resolved: Set(false),
            resolved_at: Set(None),
            ..Default::default()
        };
        if let Err(e) = entry.insert(&self.db).await {
            error!(%note_id, error = %e, "Failed to record pending index write; reindex required");
        }
    }

    /// Number of unresolved outbox entries.
    pub async fn pending(&self) -> Result<u64, DbErr> {
        index_outbox::Entity::find()
            .filter(index_outbox::Column::Resolved.eq(false))
            .count(&self.db)
            .await
    }

    /// Re-send the documents of due outbox entries.
    ///
    /// Entries for the same note are delivered together. Entries that
    /// reached `max_attempts` stay unresolved until the next reindex.
    pub async fn drain_outbox(&self, repo: &Repository) -> Result<OutboxReport, SyncError> {
        let now = Utc::now();
        let due = index_outbox::Entity::find()
            .filter(index_outbox::Column::Resolved.eq(false))
            .filter(index_outbox::Column::NextAttemptAt.lte(now))
            .filter(index_outbox::Column::Attempts.lt(self.outbox.max_attempts))
            .order_by_asc(index_outbox::Column::Id)
            .limit(self.outbox.batch_size)
            .all(&self.db)
            .await?;

        let mut grouped: Vec<(String, Vec<index_outbox::Model>)> = Vec::new();
        for entry in due {
            match grouped.iter_mut().find(|(id, _)| *id == entry.entity_id) {
                Some((_, entries)) => entries.push(entry),
                None => grouped.push((entry.entity_id.clone(), vec![entry])),
            }
        }

        let mut report = OutboxReport::default();
        for (raw_id, entries) in grouped {
            let Ok(id) = EntityId::parse(&raw_id) else {
                warn!(entity_id = %raw_id, "Discarding outbox entry with malformed id");
                self.resolve_entity(&raw_id).await?;
                report.discarded += 1;
                continue;
            };

            let result = match self.resolve_document(repo, id).await {
                Ok((doc, _)) => self
                    .index
                    .put_document(&doc.id, &doc)
                    .await
                    .map_err(SyncError::from),
                Err(RepoError::NotFound(_)) => {
                    warn!(note_id = %id, "Discarding outbox entry for unknown note");
                    self.resolve_entity(&raw_id).await?;
                    report.discarded += 1;
                    continue;
                }
                Err(e) => Err(SyncError::from(e)),
            };

            match result {
                Ok(()) => {
                    self.resolve_entity(&raw_id).await?;
                    debug!(note_id = %id, "Pending index write delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    for entry in entries {
                        self.schedule_retry(entry, &e).await?;
                    }
                    report.retried += 1;
                }
            }
        }

        Ok(report)
    }

    async fn schedule_retry(&self, entry: index_outbox::Model, err: &SyncError) -> Result<(), DbErr> {
        let attempts = entry.attempts + 1;
        let delay = calculate_backoff(
            attempts as u32,
            self.outbox.base_backoff_ms,
            self.outbox.max_backoff_ms,
        );
        let next_attempt_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

        if attempts >= self.outbox.max_attempts {
            warn!(
                note_id = %entry.entity_id,
                attempts,
                "Index write exhausted its retries; reindex required"
            );
        }

        let mut active: index_outbox::ActiveModel = entry.into();
        active.attempts = Set(attempts);
        active.next_attempt_at = Set(next_attempt_at);
        active.error_message = Set(err.to_string());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn resolve_entity(&self, entity_id: &str) -> Result<(), DbErr> {
        index_outbox::Entity::update_many()
            .col_expr(index_outbox::Column::Resolved, Expr::value(true))
            .col_expr(index_outbox::Column::ResolvedAt, Expr::value(Utc::now()))
            .filter(index_outbox::Column::EntityId.eq(entity_id))
            .filter(index_outbox::Column::Resolved.eq(false))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn resolve_rebuilt(&self, ids: &[String], cutoff: DateTime<Utc>) -> Result<(), DbErr> {
        for chunk in ids.chunks(RESOLVE_CHUNK) {
            index_outbox::Entity::update_many()
                .col_expr(index_outbox::Column::Resolved, Expr::value(true))
                .col_expr(index_outbox::Column::ResolvedAt, Expr::value(Utc::now()))
                .filter(index_outbox::Column::EntityId.is_in(chunk.iter().cloned()))
                .filter(index_outbox::Column::Resolved.eq(false))
                .filter(index_outbox::Column::CreatedAt.lt(cutoff))
                .exec(&self.db)
                .await?;
        }
        Ok(())
    }
}

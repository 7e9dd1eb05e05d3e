use common::storage::ContentHash;
use tracing::{debug, instrument};

use super::attachment::{Attachment, NewAttachment};
use super::{EntityId, RepoError, Repository, SENTINEL, fields, parse_timestamp, sets};
use crate::store::{Entry, Transaction};

/// Fully assembled note: live body text, linked attachment and body history.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: EntityId,
    pub title: String,
    pub body: String,
    /// Hash of the current body blob; `None` while the body is the sentinel.
    pub body_ref: Option<ContentHash>,
    pub notebook_id: EntityId,
    pub created_at: i64,
    /// Timestamp of the latest body entry.
    pub updated_at: i64,
    pub attachment_id: Option<EntityId>,
    pub attachment: Option<Attachment>,
    /// Body versions, oldest first, starting with the creation sentinel.
    pub history: Vec<Revision>,
}

/// One body version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub updated_at: i64,
    pub version: Option<ContentHash>,
}

/// Note state without any blob dereferenced.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteHead {
    pub id: EntityId,
    pub title: String,
    pub body_ref: Option<ContentHash>,
    pub notebook_id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub attachment_id: Option<EntityId>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub notebook_id: EntityId,
    /// Initial body; empty or absent leaves only the sentinel.
    pub body: Option<String>,
    pub attachment_id: Option<EntityId>,
}

/// Merge-patch: only present fields are appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl NotePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}

impl Repository {
    /// Create a note; every log and scalar is written in one transaction.
    #[instrument(skip(self, input), fields(notebook_id = %input.notebook_id))]
    pub async fn create_note(&self, input: NewNote) -> Result<Note, RepoError> {
        self.require_notebook(&input.notebook_id).await?;

        let body_ref = self.upload_body(input.body.as_deref()).await?;
        let id = EntityId::generate();
        let now = self.clock.now();

        let mut tx = self.store.begin();
        stage_note(&mut tx, id, now, &input, body_ref.as_ref());
        self.store.commit(tx).await?;

        debug!(note_id = %id, "Note created");

        Ok(Note {
            id,
            title: input.title,
            body: if body_ref.is_some() {
                input.body.unwrap_or_default()
            } else {
                String::new()
            },
            body_ref,
            notebook_id: input.notebook_id,
            created_at: now,
            updated_at: now,
            attachment_id: input.attachment_id,
            attachment: None,
            history: initial_history(now, body_ref),
        })
    }

    /// Create an attachment and the note pointing at it in one transaction.
    #[instrument(skip(self, attachment, title), fields(filename = %attachment.filename))]
    pub async fn import_file(
        &self,
        notebook_id: EntityId,
        title: String,
        attachment: NewAttachment<'_>,
    ) -> Result<Note, RepoError> {
        self.require_notebook(&notebook_id).await?;

        let uploaded = self.upload_attachment_blobs(&attachment).await?;
        let attachment_id = EntityId::generate();
        let note_id = EntityId::generate();
        let now = self.clock.now();

        let input = NewNote {
            title,
            notebook_id,
            body: None,
            attachment_id: Some(attachment_id),
        };

        let mut tx = self.store.begin();
        let attachment = self.stage_attachment(&mut tx, attachment_id, now, &attachment, uploaded);
        stage_note(&mut tx, note_id, now, &input, None);
        self.store.commit(tx).await?;

        debug!(%note_id, %attachment_id, "File imported");

        Ok(Note {
            id: note_id,
            title: input.title,
            body: String::new(),
            body_ref: None,
            notebook_id,
            created_at: now,
            updated_at: now,
            attachment_id: Some(attachment_id),
            attachment: Some(attachment),
            history: initial_history(now, None),
        })
    }

    /// Append a new entry to each log present in `patch`.
    ///
    /// The current note is read before anything is staged, so every
    /// failure happens while nothing is durable. After the commit the
    /// returned note is assembled from values already in hand.
    #[instrument(skip(self, patch), fields(note_id = %id))]
    pub async fn update_note(&self, id: EntityId, patch: &NotePatch) -> Result<Note, RepoError> {
        // Membership of the notes set; a notebook id also has a title log.
        let mut note = self.get_note(id).await?;

        if patch.is_empty() {
            return Ok(note);
        }

        // Upload before staging: the log must only ever reference a blob
        // that already exists.
        let body_ref = match patch.body.as_deref() {
            Some(body) => Some(self.blobs.upload_if_absent(body.as_bytes()).await?),
            None => None,
        };

        let key = id.to_string();
        let now = self.clock.now();
        let mut tx = self.store.begin();
        if let Some(title) = &patch.title {
            tx.append_log(key.as_str(), fields::TITLE, now, title.as_str());
        }
        if let Some(hash) = &body_ref {
            tx.append_log(key.as_str(), fields::BODY, now, hash.to_hex());
        }
        self.store.commit(tx).await?;

        if let Some(title) = &patch.title {
            note.title.clone_from(title);
        }
        if let (Some(hash), Some(body)) = (body_ref, &patch.body) {
            note.body.clone_from(body);
            note.body_ref = Some(hash);
            note.updated_at = now;
            note.history.push(Revision {
                updated_at: now,
                version: Some(hash),
            });
        }
        Ok(note)
    }

    #[instrument(skip(self), fields(note_id = %id))]
    pub async fn get_note(&self, id: EntityId) -> Result<Note, RepoError> {
        let head = self.note_head(id).await?;

        let body = match &head.body_ref {
            Some(hash) => self.blob_text(hash).await?,
            None => String::new(),
        };

        let attachment = match head.attachment_id {
            Some(attachment_id) => Some(self.get_attachment(attachment_id).await?),
            None => None,
        };

        let history = self
            .store
            .history(&id.to_string(), fields::BODY)
            .await?
            .into_iter()
            .map(revision_from_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Note {
            id: head.id,
            title: head.title,
            body,
            body_ref: head.body_ref,
            notebook_id: head.notebook_id,
            created_at: head.created_at,
            updated_at: head.updated_at,
            attachment_id: head.attachment_id,
            attachment,
            history,
        })
    }

    /// Read a note's scalars and latest log entries without touching blobs.
    pub async fn note_head(&self, id: EntityId) -> Result<NoteHead, RepoError> {
        let key = id.to_string();
        if !self.store.is_member(sets::NOTES, &key).await? {
            return Err(RepoError::NotFound(format!("Note {id}")));
        }

        let scalars = self.store.scalars(&key).await?;
        let created_at = parse_timestamp(&id, scalars.get(fields::CREATED_AT))?;
        let notebook_id = scalars
            .get(fields::NOTEBOOK_ID)
            .and_then(|v| EntityId::parse(v).ok())
            .ok_or_else(|| RepoError::Corrupt(format!("note {id} has no notebook")))?;
        let attachment_id = match scalars.get(fields::ATTACHMENT_ID).map(String::as_str) {
            None | Some("") => None,
            Some(raw) => Some(EntityId::parse(raw).map_err(|_| {
                RepoError::Corrupt(format!("note {id} has a malformed attachment id"))
            })?),
        };

        let title = self
            .store
            .latest(&key, fields::TITLE)
            .await?
            .ok_or_else(|| RepoError::Corrupt(format!("note {id} has no title log")))?
            .value;

        let (updated_at, body_value) = self
            .store
            .latest_with_timestamp(&key, fields::BODY)
            .await?
            .ok_or_else(|| RepoError::Corrupt(format!("note {id} has no body log")))?;

        Ok(NoteHead {
            id,
            title,
            body_ref: parse_body_ref(&body_value)?,
            notebook_id,
            created_at,
            updated_at,
            attachment_id,
        })
    }

    /// Every created note, oldest first.
    pub async fn note_ids(&self) -> Result<Vec<EntityId>, RepoError> {
        self.member_ids(sets::NOTES).await
    }

    /// Text of a historical body version.
    pub async fn body_version(&self, hash: &ContentHash) -> Result<String, RepoError> {
        self.blob_text(hash).await
    }

    pub(super) async fn member_ids(&self, set_name: &str) -> Result<Vec<EntityId>, RepoError> {
        self.store
            .members(set_name)
            .await?
            .iter()
            .map(|raw| {
                EntityId::parse(raw)
                    .map_err(|_| RepoError::Corrupt(format!("malformed id '{raw}' in {set_name}")))
            })
            .collect()
    }

    async fn upload_body(&self, body: Option<&str>) -> Result<Option<ContentHash>, RepoError> {
        match body {
            Some(text) if !text.is_empty() => {
                Ok(Some(self.blobs.upload_if_absent(text.as_bytes()).await?))
            }
            _ => Ok(None),
        }
    }

    async fn require_notebook(&self, notebook_id: &EntityId) -> Result<(), RepoError> {
        if self
            .store
            .is_member(sets::NOTEBOOKS, &notebook_id.to_string())
            .await?
        {
            Ok(())
        } else {
            Err(RepoError::Validation(format!(
                "Notebook {notebook_id} does not exist"
            )))
        }
    }
}

fn stage_note(
    tx: &mut Transaction,
    id: EntityId,
    now: i64,
    input: &NewNote,
    body_ref: Option<&ContentHash>,
) {
    let key = id.to_string();
    let attachment_id = input
        .attachment_id
        .map(|a| a.to_string())
        .unwrap_or_default();

    tx.add_to_set(sets::NOTES, key.as_str(), now)
        .set_scalar(key.as_str(), fields::CREATED_AT, now.to_string())
        .set_scalar(key.as_str(), fields::NOTEBOOK_ID, input.notebook_id.to_string())
        .set_scalar(key.as_str(), fields::ATTACHMENT_ID, attachment_id)
        .append_log(key.as_str(), fields::TITLE, now, SENTINEL)
        .append_log(key.as_str(), fields::TITLE, now, input.title.as_str())
        .append_log(key.as_str(), fields::BODY, now, SENTINEL);

    if let Some(hash) = body_ref {
        tx.append_log(key.as_str(), fields::BODY, now, hash.to_hex());
    }
}

fn initial_history(now: i64, body_ref: Option<ContentHash>) -> Vec<Revision> {
    let mut history = vec![Revision {
        updated_at: now,
        version: None,
    }];
    if body_ref.is_some() {
        history.push(Revision {
            updated_at: now,
            version: body_ref,
        });
    }
    history
}

fn parse_body_ref(value: &str) -> Result<Option<ContentHash>, RepoError> {
    if value == SENTINEL {
        return Ok(None);
    }
    ContentHash::from_hex(value)
        .map(Some)
        .map_err(|e| RepoError::Corrupt(format!("body log holds a bad hash: {e}")))
}

fn revision_from_entry(entry: Entry) -> Result<Revision, RepoError> {
    Ok(Revision {
        updated_at: entry.timestamp,
        version: parse_body_ref(&entry.value)?,
    })
}

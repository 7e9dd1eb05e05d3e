use tracing::{debug, instrument};

use super::{EntityId, RepoError, Repository, SENTINEL, fields, parse_timestamp, sets};

/// A notebook's name lives in its title log, like a note's title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notebook {
    pub id: EntityId,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewNotebook {
    pub name: String,
}

impl Repository {
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_notebook(&self, input: NewNotebook) -> Result<Notebook, RepoError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(RepoError::Validation("Notebook name must not be empty".into()));
        }

        let id = EntityId::generate();
        let key = id.to_string();
        let now = self.clock.now();

        let mut tx = self.store.begin();
        tx.add_to_set(sets::NOTEBOOKS, key.as_str(), now)
            .set_scalar(key.as_str(), fields::CREATED_AT, now.to_string())
            .append_log(key.as_str(), fields::TITLE, now, SENTINEL)
            .append_log(key.as_str(), fields::TITLE, now, name.as_str());
        self.store.commit(tx).await?;

        debug!(notebook_id = %id, "Notebook created");

        Ok(Notebook {
            id,
            name,
            created_at: now,
        })
    }

    pub async fn get_notebook(&self, id: EntityId) -> Result<Notebook, RepoError> {
        let key = id.to_string();
        if !self.store.is_member(sets::NOTEBOOKS, &key).await? {
            return Err(RepoError::NotFound(format!("Notebook {id}")));
        }

        let created_at = self.store.scalar(&key, fields::CREATED_AT).await?;
        let name = self
            .store
            .latest(&key, fields::TITLE)
            .await?
            .ok_or_else(|| RepoError::Corrupt(format!("notebook {id} has no title log")))?
            .value;

        Ok(Notebook {
            id,
            name,
            created_at: parse_timestamp(&id, created_at.as_ref())?,
        })
    }

    /// Every notebook, oldest first.
    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>, RepoError> {
        let mut notebooks = Vec::new();
        for id in self.member_ids(sets::NOTEBOOKS).await? {
            notebooks.push(self.get_notebook(id).await?);
        }
        Ok(notebooks)
    }
}

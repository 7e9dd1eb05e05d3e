use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::{PrimaryStore, StoreError};
use crate::entity::attribute_log;

/// One versioned value of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: i64,
    pub value: String,
}

impl From<attribute_log::Model> for Entry {
    fn from(row: attribute_log::Model) -> Self {
        Self {
            timestamp: row.timestamp,
            value: row.value,
        }
    }
}

impl PrimaryStore {
    /// Append one entry as its own transaction.
    ///
    /// Multi-field writes must stage their appends on a shared
    /// [`Transaction`](super::Transaction) instead.
    pub async fn append(
        &self,
        entity_id: &str,
        field: &str,
        timestamp: i64,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin();
        tx.append_log(entity_id, field, timestamp, value);
        self.commit(tx).await
    }

    /// Last entry of a log, or `None` if the log was never created.
    pub async fn latest(&self, entity_id: &str, field: &str) -> Result<Option<Entry>, StoreError> {
        let row = attribute_log::Entity::find()
            .filter(attribute_log::Column::EntityId.eq(entity_id))
            .filter(attribute_log::Column::Field.eq(field))
            .order_by_desc(attribute_log::Column::Id)
            .one(self.connection())
            .await?;
        Ok(row.map(Entry::from))
    }

    /// Latest value paired with the timestamp it was written at.
    pub async fn latest_with_timestamp(
        &self,
        entity_id: &str,
        field: &str,
    ) -> Result<Option<(i64, String)>, StoreError> {
        Ok(self
            .latest(entity_id, field)
            .await?
            .map(|e| (e.timestamp, e.value)))
    }

    /// Snapshot of the whole log, oldest first.
    pub async fn history(&self, entity_id: &str, field: &str) -> Result<Vec<Entry>, StoreError> {
        let rows = attribute_log::Entity::find()
            .filter(attribute_log::Column::EntityId.eq(entity_id))
            .filter(attribute_log::Column::Field.eq(field))
            .order_by_asc(attribute_log::Column::Id)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }
}

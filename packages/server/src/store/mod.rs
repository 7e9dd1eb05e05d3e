//! Primary store: entity sets, scalars, write-once records and attribute
//! logs, all living in the relational backing store.
//!
//! Writes are only possible through a [`Transaction`] handed to
//! [`PrimaryStore::commit`], which applies every staged operation or none.

mod error;
mod log;
mod transaction;

use std::collections::HashMap;

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::{debug, warn};

use crate::entity::{attribute_log, entity_scalar, entity_set, record_field};

pub use error::StoreError;
pub use log::Entry;
pub use transaction::{Op, Transaction};

/// Handle to the backing store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PrimaryStore {
    db: DatabaseConnection,
}

impl PrimaryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Start staging a new unit of work.
    pub fn begin(&self) -> Transaction {
        Transaction::default()
    }

    /// Apply every staged operation atomically.
    ///
    /// If any operation is rejected the database transaction is rolled back
    /// and [`StoreError::CommitFailed`] is returned; nothing is observable.
    pub async fn commit(&self, tx: Transaction) -> Result<(), StoreError> {
        if tx.is_empty() {
            return Ok(());
        }

        let ops = tx.into_ops();
        let op_count = ops.len();
        let txn = self.db.begin().await?;

        for op in ops {
            if let Err(e) = apply(&txn, op).await {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed operation also failed");
                }
                return Err(StoreError::CommitFailed(e.to_string()));
            }
        }

        txn.commit()
            .await
            .map_err(|e| StoreError::CommitFailed(e.to_string()))?;

        debug!(ops = op_count, "Transaction committed");
        Ok(())
    }

    pub async fn scalar(&self, entity_id: &str, name: &str) -> Result<Option<String>, StoreError> {
        let row = entity_scalar::Entity::find_by_id((entity_id.to_owned(), name.to_owned()))
            .one(&self.db)
            .await?;
        Ok(row.map(|r| r.value))
    }

    /// All scalars of one entity, keyed by name.
    pub async fn scalars(&self, entity_id: &str) -> Result<HashMap<String, String>, StoreError> {
        let rows = entity_scalar::Entity::find()
            .filter(entity_scalar::Column::EntityId.eq(entity_id))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|r| (r.name, r.value)).collect())
    }

    /// All fields of a record. An unknown record yields an empty map.
    pub async fn record(&self, record_id: &str) -> Result<HashMap<String, String>, StoreError> {
        let rows = record_field::Entity::find()
            .filter(record_field::Column::RecordId.eq(record_id))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|r| (r.field, r.value)).collect())
    }

    pub async fn is_member(&self, set_name: &str, member: &str) -> Result<bool, StoreError> {
        let row = entity_set::Entity::find_by_id((set_name.to_owned(), member.to_owned()))
            .one(&self.db)
            .await?;
        Ok(row.is_some())
    }

    /// Members of a set, oldest first.
    pub async fn members(&self, set_name: &str) -> Result<Vec<String>, StoreError> {
        let rows = entity_set::Entity::find()
            .filter(entity_set::Column::SetName.eq(set_name))
            .order_by_asc(entity_set::Column::AddedAt)
            .order_by_asc(entity_set::Column::Member)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|r| r.member).collect())
    }
}

async fn apply<C: ConnectionTrait>(conn: &C, op: Op) -> Result<(), DbErr> {
    match op {
        Op::SetScalar {
            entity_id,
            name,
            value,
        } => {
            let model = entity_scalar::ActiveModel {
                entity_id: Set(entity_id),
                name: Set(name),
                value: Set(value),
            };
            entity_scalar::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        entity_scalar::Column::EntityId,
                        entity_scalar::Column::Name,
                    ])
                    .update_column(entity_scalar::Column::Value)
                    .to_owned(),
                )
                .exec_without_returning(conn)
                .await?;
        }
        Op::AppendLog {
            entity_id,
            field,
            timestamp,
            value,
        } => {
            let model = attribute_log::ActiveModel {
                entity_id: Set(entity_id),
                field: Set(field),
                timestamp: Set(timestamp),
                value: Set(value),
                ..Default::default()
            };
            attribute_log::Entity::insert(model)
                .exec_without_returning(conn)
                .await?;
        }
        Op::AddToSet {
            set_name,
            member,
            added_at,
        } => {
            // Plain insert: a second add of the same member fails the
            // whole transaction.
            let model = entity_set::ActiveModel {
                set_name: Set(set_name),
                member: Set(member),
                added_at: Set(added_at),
            };
            entity_set::Entity::insert(model)
                .exec_without_returning(conn)
                .await?;
        }
        Op::SetHashField {
            record_id,
            field,
            value,
        } => {
            let model = record_field::ActiveModel {
                record_id: Set(record_id),
                field: Set(field),
                value: Set(value),
            };
            record_field::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        record_field::Column::RecordId,
                        record_field::Column::Field,
                    ])
                    .update_column(record_field::Column::Value)
                    .to_owned(),
                )
                .exec_without_returning(conn)
                .await?;
        }
    }
    Ok(())
}

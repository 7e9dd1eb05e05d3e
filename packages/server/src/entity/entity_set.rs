use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership of an id in a named entity set ("notes", "notebooks", ...).
///
/// A row is only ever written inside the transaction that creates the
/// entity, so membership implies the entity's seed writes are visible.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_set")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub set_name: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub member: String,

    /// Unix milliseconds at which the member was added.
    pub added_at: i64,
}

impl ActiveModelBehavior for ActiveModel {}

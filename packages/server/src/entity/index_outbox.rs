use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Search-index work that failed after its primary-store commit succeeded.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "index_outbox")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub entity_id: String,

    /// "create", "update" or "reindex"; replay always re-sends the full document.
    pub operation: String,

    #[sea_orm(column_type = "Text")]
    pub error_message: String,

    pub attempts: i32,

    pub created_at: DateTimeUtc,

    pub next_attempt_at: DateTimeUtc,

    #[sea_orm(default_value = false, indexed)]
    pub resolved: bool,

    pub resolved_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}

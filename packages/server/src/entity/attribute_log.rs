use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One entry of an append-only attribute log.
///
/// Rows are only inserted, never updated. `id` is assigned at insert time and
/// defines log order; `timestamp` is informational and may tie.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attribute_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub entity_id: String,

    pub field: String,

    /// Unix milliseconds supplied by the writer.
    pub timestamp: i64,

    #[sea_orm(column_type = "Text")]
    pub value: String,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One field of a write-once record, read back as a whole map.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "record_field")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub record_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub field: String,

    #[sea_orm(column_type = "Text")]
    pub value: String,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-valued, unversioned entity field (e.g. `created_at`, `notebook_id`).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_scalar")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entity_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub value: String,
}

impl ActiveModelBehavior for ActiveModel {}

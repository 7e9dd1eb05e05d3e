use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr};
use tracing::{info, warn};

use crate::entity::{attribute_log, index_outbox};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    sync_schema(&db).await?;

    Ok(db)
}

/// Create or migrate every table declared under `entity`.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.get_schema_registry("blobpad::entity::*").sync(db).await
}

/// Composite indexes the entity definitions cannot express.
///
/// Only created on PostgreSQL; other backends fall back to the
/// single-column indexes from schema sync.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    if db.get_database_backend() != DbBackend::Postgres {
        return Ok(());
    }

    // Latest entry and history of one field:
    // SELECT ... FROM attribute_log WHERE entity_id = ? AND field = ? ORDER BY id
    let log_lookup = Index::create()
        .if_not_exists()
        .name("idx_attribute_log_entity_field_id")
        .table(attribute_log::Entity)
        .col(attribute_log::Column::EntityId)
        .col(attribute_log::Column::Field)
        .col(attribute_log::Column::Id)
        .to_string(PostgresQueryBuilder);

    // Due outbox entries:
    // SELECT ... FROM index_outbox WHERE resolved = false AND next_attempt_at <= ?
    let outbox_due = Index::create()
        .if_not_exists()
        .name("idx_index_outbox_resolved_next_attempt")
        .table(index_outbox::Entity)
        .col(index_outbox::Column::Resolved)
        .col(index_outbox::Column::NextAttemptAt)
        .to_string(PostgresQueryBuilder);

    for (name, stmt) in [
        ("idx_attribute_log_entity_field_id", log_lookup),
        ("idx_index_outbox_resolved_next_attempt", outbox_due),
    ] {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}

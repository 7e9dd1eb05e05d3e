use std::sync::Arc;

use anyhow::Context;
use common::storage::filesystem::FilesystemBlobStore;
use tracing::{Level, info, warn};

use blobpad::config::{AppConfig, SearchBackend};
use blobpad::extract::CommandExtractor;
use blobpad::repository::Repository;
use blobpad::search::{ElasticIndex, IndexSync, MemoryIndex, SearchIndex, run_outbox_retrier};
use blobpad::state::AppState;
use blobpad::store::PrimaryStore;
use blobpad::{build_router, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    database::ensure_indexes(&db).await?;

    let blobs = FilesystemBlobStore::new(
        config.storage.blob_dir.clone(),
        config.storage.max_blob_size,
    )
    .await
    .context("Failed to open blob store")?;

    let index: Arc<dyn SearchIndex> = match config.search.backend {
        SearchBackend::Elasticsearch => Arc::new(ElasticIndex::new(&config.search)?),
        SearchBackend::Memory => {
            warn!("Using the in-memory search index; run /_reindex after every restart");
            Arc::new(MemoryIndex::new())
        }
    };
    if let Err(e) = index.ensure_index().await {
        warn!(error = %e, "Search index not ready; writes will be queued for retry");
    }

    let repo = Repository::new(PrimaryStore::new(db.clone()), Arc::new(blobs));
    let indexer = Arc::new(IndexSync::new(index, db, config.outbox.clone()));

    tokio::spawn(run_outbox_retrier(indexer.clone(), repo.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        extractor: Arc::new(CommandExtractor::new(&config.extractor)),
        repo,
        indexer,
        config,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

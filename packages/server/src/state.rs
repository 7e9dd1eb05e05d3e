use std::sync::Arc;

use crate::config::AppConfig;
use crate::extract::TextExtractor;
use crate::repository::Repository;
use crate::search::IndexSync;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repo: Repository,
    pub indexer: Arc<IndexSync>,
    pub extractor: Arc<dyn TextExtractor>,
}

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::search::ReindexReport;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/_reindex",
    tag = "Admin",
    operation_id = "reindex",
    summary = "Rebuild the search index",
    description = "Drops the search index and re-indexes every note from the primary store. \
        Notes that cannot be read or written are counted in `failed` and skipped.",
    responses(
        (status = 200, description = "Rebuild finished", body = ReindexReport),
        (status = 503, description = "Index or store unavailable (INDEX_UNAVAILABLE, STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexReport>, AppError> {
    let report = state.indexer.reindex_all(&state.repo).await?;
    Ok(Json(report))
}

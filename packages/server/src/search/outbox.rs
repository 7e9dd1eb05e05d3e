use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::IndexSync;
use crate::repository::Repository;

/// Periodically re-send index writes parked in the outbox.
pub async fn run_outbox_retrier(sync: Arc<IndexSync>, repo: Repository) {
    let config = sync.outbox_config().clone();
    let scan_interval = Duration::from_secs(config.scan_interval_secs);

    info!(
        scan_interval_secs = config.scan_interval_secs,
        max_attempts = config.max_attempts,
        "Starting index outbox retrier"
    );

    let mut interval = tokio::time::interval(scan_interval);

    loop {
        interval.tick().await;

        match sync.drain_outbox(&repo).await {
            Ok(report) if report.delivered + report.retried + report.discarded > 0 => {
                info!(
                    delivered = report.delivered,
                    retried = report.retried,
                    discarded = report.discarded,
                    "Outbox pass finished"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Outbox pass failed"),
        }
    }
}

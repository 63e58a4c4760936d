//! Periodic cleanup of the update outbox.
//!
//! Deletes updates acknowledged before the retention window and every
//! update past its TTL. Runs on a fixed interval using
//! `tokio::time::interval`.

use std::time::Duration;

use chrono::Utc;
use dispatch_engine::UpdateLedger;
use tokio_util::sync::CancellationToken;

/// Run the reaper loop until `cancel` is triggered.
pub async fn run(ledger: UpdateLedger, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Update reaper started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Update reaper stopping");
                break;
            }
            _ = interval.tick() => {
                match ledger.reap(Utc::now()).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Update reaper: purged stale updates");
                    }
                    Ok(_) => tracing::debug!("Update reaper: nothing to purge"),
                    Err(e) => tracing::error!(error = %e, "Update reaper: cleanup failed"),
                }
            }
        }
    }
}

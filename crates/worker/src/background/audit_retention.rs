//! Periodic purge of eligibility snapshots belonging to generations closed
//! longer ago than the audit retention window. Attribution rows and the
//! response log are kept.

use std::time::Duration;

use chrono::Utc;
use dispatch_engine::UpdateLedger;
use tokio_util::sync::CancellationToken;

/// Run the retention loop until `cancel` is triggered.
pub async fn run(ledger: UpdateLedger, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Audit retention job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Audit retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match ledger.purge_closed_snapshots(Utc::now()).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Audit retention: purged eligibility snapshots");
                    }
                    Ok(_) => tracing::debug!("Audit retention: nothing to purge"),
                    Err(e) => tracing::error!(error = %e, "Audit retention: purge failed"),
                }
            }
        }
    }
}

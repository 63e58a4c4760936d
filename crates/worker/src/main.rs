use std::sync::Arc;
use std::time::Duration;

use dispatch_core::config::DispatchConfig;
use dispatch_engine::DispatchEngine;
use dispatch_events::{EventBus, EventPersistence, ForwarderConfig, SignalForwarder, WebhookDelivery};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_worker::background::{audit_retention, update_reaper};
use dispatch_worker::config::WorkerConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatch_worker=debug,dispatch_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env()?;
    let dispatch_config = DispatchConfig::from_env()?;
    let reaper_every = Duration::from_secs(dispatch_config.reaper_interval_secs);

    // --- Database ---
    let pool = dispatch_db::create_pool(&config.database_url).await?;
    dispatch_db::health_check(&pool).await?;
    dispatch_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    // --- Event services ---
    let event_bus = Arc::new(EventBus::default());
    let cancel = CancellationToken::new();
    let events_cancel = CancellationToken::new();

    let persistence_handle = tokio::spawn(EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
        events_cancel.clone(),
    ));
    let forwarder = SignalForwarder::new(ForwarderConfig::from_env(), WebhookDelivery::new()?);
    let forwarder_handle =
        tokio::spawn(forwarder.run(event_bus.subscribe(), events_cancel.clone()));

    // --- Engine jobs ---
    let engine = DispatchEngine::new(pool, dispatch_config, Arc::clone(&event_bus))?;

    let scheduler = engine.scheduler();
    let scheduler_cancel = cancel.clone();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    let reaper_handle = tokio::spawn(update_reaper::run(
        engine.ledger(),
        reaper_every,
        cancel.clone(),
    ));
    let retention_handle = tokio::spawn(audit_retention::run(
        engine.ledger(),
        reaper_every,
        cancel.clone(),
    ));
    tracing::info!("Worker started (scheduler, update reaper, audit retention, event services)");

    shutdown_signal().await;

    // Stop the jobs first so their last signals still reach the event services.
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    cancel.cancel();
    let _ = tokio::time::timeout(drain, async {
        let _ = scheduler_handle.await;
        let _ = reaper_handle.await;
        let _ = retention_handle.await;
    })
    .await;
    tracing::info!("Engine jobs stopped");

    drop(engine);
    drop(event_bus);
    let drained = tokio::time::timeout(drain, async {
        let _ = persistence_handle.await;
        let _ = forwarder_handle.await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Event services did not drain in time, cancelling");
        events_cancel.cancel();
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dispatch_core::config::DispatchConfig;
use dispatch_engine::DispatchEngine;
use dispatch_events::{EventBus, EventPersistence, ForwarderConfig, SignalForwarder, WebhookDelivery};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_api::config::ServerConfig;
use dispatch_api::router::build_app_router;
use dispatch_api::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dispatch_api=debug,dispatch_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    let dispatch_config = DispatchConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = dispatch_db::create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    dispatch_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    dispatch_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let cancel = CancellationToken::new();

    let persistence_handle = tokio::spawn(EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
        cancel.clone(),
    ));

    let forwarder = SignalForwarder::new(ForwarderConfig::from_env(), WebhookDelivery::new()?);
    let forwarder_handle = tokio::spawn(forwarder.run(event_bus.subscribe(), cancel.clone()));
    tracing::info!("Event services started (persistence, forwarder)");

    // --- Engine ---
    let engine = DispatchEngine::new(pool.clone(), dispatch_config, Arc::clone(&event_bus))?;

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        engine,
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining event services");

    // Dropping the last sender closes the bus; subscribers drain what is
    // buffered and exit. The token stops whatever is still running after
    // the drain timeout.
    drop(event_bus);
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let drained = tokio::time::timeout(drain, async {
        let _ = persistence_handle.await;
        let _ = forwarder_handle.await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Event services did not drain in time, cancelling");
        cancel.cancel();
    }
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM (on Unix) to initiate graceful shutdown.
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

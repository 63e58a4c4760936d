use std::sync::Arc;

use dispatch_engine::DispatchEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: dispatch_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Orchestrator, arbitrator, scheduler and ledger over one context.
    pub engine: DispatchEngine,
    /// Outbound signal hub the engine publishes on after commit.
    pub event_bus: Arc<dispatch_events::EventBus>,
}

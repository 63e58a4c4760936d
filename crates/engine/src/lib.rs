//! The dispatch engine: matches a confirmed booking to exactly one
//! professional through broadcast-and-first-accept-wins.
//!
//! Components, each a thin handle over a shared [`EngineContext`]:
//!
//! - [`BroadcastOrchestrator`]: mints attribution generations and runs
//!   eligibility rounds.
//! - [`AcceptanceArbitrator`]: resolves concurrent accept attempts with a
//!   single conditional update; records declines and completions.
//! - [`ExpiryScheduler`]: time-driven re-broadcast/expiry plus the
//!   cancellation-after-acceptance path.
//! - [`UpdateLedger`]: per-recipient outbox polling, acknowledgment and
//!   retention.
//!
//! Every state transition commits together with its outbox rows in one
//! transaction. Outbound signals are published on the [`EventBus`] only
//! after commit and never affect state.

use std::sync::Arc;

use dispatch_core::config::DispatchConfig;
use dispatch_core::eligibility::EligibilityPolicy;
use dispatch_core::error::CoreError;
use dispatch_db::DbPool;
use dispatch_events::EventBus;

pub mod arbitrator;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod scheduler;
mod strikes;

pub use arbitrator::{AcceptOutcome, AcceptanceArbitrator, AcceptResult};
pub use error::{EngineError, EngineResult};
pub use ledger::{PollRequest, UpdateLedger};
pub use orchestrator::{BroadcastOrchestrator, BroadcastOutcome};
pub use scheduler::{CancellationOutcome, ExpiryScheduler, ScanReport};

/// Shared handles every component works against.
#[derive(Clone)]
pub struct EngineContext {
    pub pool: DbPool,
    pub config: Arc<DispatchConfig>,
    pub policy: Arc<EligibilityPolicy>,
    pub bus: Arc<EventBus>,
}

/// Bundle of the engine components over one context.
#[derive(Clone)]
pub struct DispatchEngine {
    ctx: EngineContext,
}

impl DispatchEngine {
    /// Build an engine, validating the configuration and deriving the
    /// eligibility policy from it.
    pub fn new(pool: DbPool, config: DispatchConfig, bus: Arc<EventBus>) -> Result<Self, CoreError> {
        config.validate()?;
        let policy = config.eligibility_policy()?;
        Ok(Self {
            ctx: EngineContext {
                pool,
                config: Arc::new(config),
                policy: Arc::new(policy),
                bus,
            },
        })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.ctx.config
    }

    pub fn orchestrator(&self) -> BroadcastOrchestrator {
        BroadcastOrchestrator::new(self.ctx.clone())
    }

    pub fn arbitrator(&self) -> AcceptanceArbitrator {
        AcceptanceArbitrator::new(self.ctx.clone())
    }

    pub fn scheduler(&self) -> ExpiryScheduler {
        ExpiryScheduler::new(self.ctx.clone())
    }

    pub fn ledger(&self) -> UpdateLedger {
        UpdateLedger::new(self.ctx.clone())
    }
}

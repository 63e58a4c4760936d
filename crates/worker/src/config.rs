use dispatch_core::error::CoreError;

/// Worker process configuration loaded from environment variables.
///
/// Dispatch tunables come from `DispatchConfig`; this only holds what the
/// process itself needs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// How long background tasks get to stop after a shutdown signal
    /// (`SHUTDOWN_TIMEOUT_SECS`, default `30`).
    pub shutdown_timeout_secs: u64,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("DATABASE_URL must be set".into()))?;

        let shutdown_timeout_secs = match lookup("SHUTDOWN_TIMEOUT_SECS") {
            None => 30,
            Some(raw) => raw.trim().parse().map_err(|_| {
                CoreError::Validation(format!(
                    "SHUTDOWN_TIMEOUT_SECS has an invalid value '{raw}'"
                ))
            })?,
        };

        Ok(Self {
            database_url,
            shutdown_timeout_secs,
        })
    }
}

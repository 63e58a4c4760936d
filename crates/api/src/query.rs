//! Shared query parameter types for API handlers.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `?older_than=` for the stale-update cleanup endpoint.
#[derive(Debug, Deserialize)]
pub struct OlderThanParams {
    pub older_than: Option<DateTime<Utc>>,
}

//! Dispatch tuning shared by the API server and the background worker.

use std::str::FromStr;

use crate::eligibility::{EligibilityCondition, EligibilityPolicy};
use crate::error::CoreError;

/// Longest span any duration setting may cover (ten years).
///
/// Keeps `now + duration` arithmetic in range for every timestamp the engine
/// computes from configuration.
pub const MAX_DURATION_SECS: i64 = 10 * 365 * 86_400;

/// Dispatch engine configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
///
/// | Env Var                               | Default |
/// |---------------------------------------|---------|
/// | `DISPATCH_INITIAL_RADIUS_KM`          | `20`    |
/// | `DISPATCH_RADIUS_GROWTH_FACTOR`       | `1.5`   |
/// | `DISPATCH_MAX_RADIUS_KM`              | `100`   |
/// | `DISPATCH_MAX_ATTEMPTS`               | `3`     |
/// | `DISPATCH_RESPONSE_TIMEOUT_SECS`      | `900`   |
/// | `DISPATCH_EMPTY_POOL_RETRY_SECS`      | `60`    |
/// | `DISPATCH_SCAN_INTERVAL_SECS`         | `30`    |
/// | `DISPATCH_SCAN_BATCH_SIZE`            | `100`   |
/// | `DISPATCH_CANCEL_BLACKLIST_HOURS`     | `72`    |
/// | `DISPATCH_NO_RESPONSE_STRIKE_LIMIT`   | `3`     |
/// | `DISPATCH_NO_RESPONSE_WINDOW_HOURS`   | `168`   |
/// | `DISPATCH_NO_RESPONSE_BLACKLIST_HOURS`| `24`    |
/// | `DISPATCH_UPDATE_TTL_SECS`            | `86400` |
/// | `DISPATCH_UPDATE_RETENTION_HOURS`     | `24`    |
/// | `DISPATCH_AUDIT_RETENTION_DAYS`       | `90`    |
/// | `DISPATCH_REAPER_INTERVAL_SECS`       | `3600`  |
/// | `ELIGIBILITY_ENFORCE_SERVICE_AREA`    | `true`  |
/// | `ELIGIBILITY_MIN_RATING`              | unset   |
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub initial_radius_km: f64,
    pub radius_growth_factor: f64,
    pub max_radius_km: f64,
    pub max_attempts: i32,
    pub response_timeout_secs: i64,
    pub empty_pool_retry_secs: i64,
    pub scan_interval_secs: u64,
    pub scan_batch_size: i64,
    pub cancel_blacklist_hours: i64,
    pub no_response_strike_limit: i64,
    pub no_response_window_hours: i64,
    pub no_response_blacklist_hours: i64,
    pub update_ttl_secs: i64,
    pub update_retention_hours: i64,
    pub audit_retention_days: i64,
    pub reaper_interval_secs: u64,
    pub enforce_service_area: bool,
    pub min_rating: Option<f64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            initial_radius_km: 20.0,
            radius_growth_factor: 1.5,
            max_radius_km: 100.0,
            max_attempts: 3,
            response_timeout_secs: 900,
            empty_pool_retry_secs: 60,
            scan_interval_secs: 30,
            scan_batch_size: 100,
            cancel_blacklist_hours: 72,
            no_response_strike_limit: 3,
            no_response_window_hours: 168,
            no_response_blacklist_hours: 24,
            update_ttl_secs: 86_400,
            update_retention_hours: 24,
            audit_retention_days: 90,
            reaper_interval_secs: 3600,
            enforce_service_area: true,
            min_rating: None,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, falling back to
    /// defaults for missing keys. The result is validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let config = Self {
            initial_radius_km: parse(&lookup, "DISPATCH_INITIAL_RADIUS_KM", d.initial_radius_km)?,
            radius_growth_factor: parse(
                &lookup,
                "DISPATCH_RADIUS_GROWTH_FACTOR",
                d.radius_growth_factor,
            )?,
            max_radius_km: parse(&lookup, "DISPATCH_MAX_RADIUS_KM", d.max_radius_km)?,
            max_attempts: parse(&lookup, "DISPATCH_MAX_ATTEMPTS", d.max_attempts)?,
            response_timeout_secs: parse(
                &lookup,
                "DISPATCH_RESPONSE_TIMEOUT_SECS",
                d.response_timeout_secs,
            )?,
            empty_pool_retry_secs: parse(
                &lookup,
                "DISPATCH_EMPTY_POOL_RETRY_SECS",
                d.empty_pool_retry_secs,
            )?,
            scan_interval_secs: parse(&lookup, "DISPATCH_SCAN_INTERVAL_SECS", d.scan_interval_secs)?,
            scan_batch_size: parse(&lookup, "DISPATCH_SCAN_BATCH_SIZE", d.scan_batch_size)?,
            cancel_blacklist_hours: parse(
                &lookup,
                "DISPATCH_CANCEL_BLACKLIST_HOURS",
                d.cancel_blacklist_hours,
            )?,
            no_response_strike_limit: parse(
                &lookup,
                "DISPATCH_NO_RESPONSE_STRIKE_LIMIT",
                d.no_response_strike_limit,
            )?,
            no_response_window_hours: parse(
                &lookup,
                "DISPATCH_NO_RESPONSE_WINDOW_HOURS",
                d.no_response_window_hours,
            )?,
            no_response_blacklist_hours: parse(
                &lookup,
                "DISPATCH_NO_RESPONSE_BLACKLIST_HOURS",
                d.no_response_blacklist_hours,
            )?,
            update_ttl_secs: parse(&lookup, "DISPATCH_UPDATE_TTL_SECS", d.update_ttl_secs)?,
            update_retention_hours: parse(
                &lookup,
                "DISPATCH_UPDATE_RETENTION_HOURS",
                d.update_retention_hours,
            )?,
            audit_retention_days: parse(
                &lookup,
                "DISPATCH_AUDIT_RETENTION_DAYS",
                d.audit_retention_days,
            )?,
            reaper_interval_secs: parse(
                &lookup,
                "DISPATCH_REAPER_INTERVAL_SECS",
                d.reaper_interval_secs,
            )?,
            enforce_service_area: parse(
                &lookup,
                "ELIGIBILITY_ENFORCE_SERVICE_AREA",
                d.enforce_service_area,
            )?,
            min_rating: match lookup("ELIGIBILITY_MIN_RATING") {
                Some(raw) if !raw.trim().is_empty() => {
                    Some(parse_value::<f64>("ELIGIBILITY_MIN_RATING", &raw)?)
                }
                _ => None,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would break the re-broadcast or retention loops.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |msg: String| Err(CoreError::Validation(msg));

        if !(self.initial_radius_km.is_finite() && self.initial_radius_km > 0.0) {
            return invalid(format!(
                "DISPATCH_INITIAL_RADIUS_KM must be positive, got {}",
                self.initial_radius_km
            ));
        }
        if !(self.radius_growth_factor.is_finite() && self.radius_growth_factor > 1.0) {
            return invalid(format!(
                "DISPATCH_RADIUS_GROWTH_FACTOR must be greater than 1, got {}",
                self.radius_growth_factor
            ));
        }
        if !self.max_radius_km.is_finite() || self.max_radius_km < self.initial_radius_km {
            return invalid(format!(
                "DISPATCH_MAX_RADIUS_KM ({}) must be at least DISPATCH_INITIAL_RADIUS_KM ({})",
                self.max_radius_km, self.initial_radius_km
            ));
        }
        if self.max_attempts < 1 {
            return invalid("DISPATCH_MAX_ATTEMPTS must be at least 1".into());
        }

        let counts = [
            ("DISPATCH_SCAN_BATCH_SIZE", self.scan_batch_size),
            ("DISPATCH_NO_RESPONSE_STRIKE_LIMIT", self.no_response_strike_limit),
        ];
        for (name, value) in counts {
            if value <= 0 {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }

        // (name, value, seconds per unit)
        let durations = [
            ("DISPATCH_RESPONSE_TIMEOUT_SECS", self.response_timeout_secs, 1),
            ("DISPATCH_EMPTY_POOL_RETRY_SECS", self.empty_pool_retry_secs, 1),
            ("DISPATCH_CANCEL_BLACKLIST_HOURS", self.cancel_blacklist_hours, 3600),
            ("DISPATCH_NO_RESPONSE_WINDOW_HOURS", self.no_response_window_hours, 3600),
            ("DISPATCH_NO_RESPONSE_BLACKLIST_HOURS", self.no_response_blacklist_hours, 3600),
            ("DISPATCH_UPDATE_TTL_SECS", self.update_ttl_secs, 1),
            ("DISPATCH_UPDATE_RETENTION_HOURS", self.update_retention_hours, 3600),
            ("DISPATCH_AUDIT_RETENTION_DAYS", self.audit_retention_days, 86_400),
            (
                "DISPATCH_SCAN_INTERVAL_SECS",
                i64::try_from(self.scan_interval_secs).unwrap_or(i64::MAX),
                1,
            ),
            (
                "DISPATCH_REAPER_INTERVAL_SECS",
                i64::try_from(self.reaper_interval_secs).unwrap_or(i64::MAX),
                1,
            ),
        ];
        for (name, value, unit_secs) in durations {
            if value <= 0 {
                return invalid(format!("{name} must be positive, got {value}"));
            }
            if value > MAX_DURATION_SECS / unit_secs {
                return invalid(format!(
                    "{name} must be at most {}, got {value}",
                    MAX_DURATION_SECS / unit_secs
                ));
            }
        }

        self.eligibility_policy().map(|_| ())
    }

    /// Eligibility policy implied by the `ELIGIBILITY_*` settings.
    pub fn eligibility_policy(&self) -> Result<EligibilityPolicy, CoreError> {
        let mut conditions = crate::eligibility::MANDATORY_CONDITIONS.to_vec();
        if self.enforce_service_area {
            conditions.push(EligibilityCondition::WithinServiceArea);
        }
        if let Some(min_rating) = self.min_rating {
            conditions.push(EligibilityCondition::MinimumRating { min_rating });
        }
        EligibilityPolicy::new(conditions)
    }

    pub fn response_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.response_timeout_secs)
    }

    pub fn empty_pool_retry(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.empty_pool_retry_secs)
    }

    pub fn update_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.update_ttl_secs)
    }

    pub fn update_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.update_retention_hours)
    }

    pub fn audit_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.audit_retention_days)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("{key} has an invalid value '{raw}'")))
}

//! Engine configuration loaded from environment variables.

use std::time::Duration;

use chrono_tz::Tz;

use crate::channels::twilio::DEFAULT_API_BASE;
use crate::timezone::FALLBACK_TIMEZONE;

const DEFAULT_CONFIRMATION_SWEEP_SECS: u64 = 3600;
const DEFAULT_PENDING_SWEEP_SECS: u64 = 300;
const DEFAULT_LOG_CLEANUP_SWEEP_SECS: u64 = 86_400;
const DEFAULT_LOG_RETENTION_DAYS: i64 = 90;
/// Upper bound on `LOG_RETENTION_DAYS`, about a century.
const MAX_LOG_RETENTION_DAYS: i64 = 36_500;

/// Notification engine configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Base URL of the Twilio-compatible messaging API.
    pub twilio_api_base: String,
    /// Timezone for projects that do not configure one.
    pub default_timezone: Tz,
    /// Per-request timeout for provider calls; `None` keeps client defaults.
    pub provider_timeout: Option<Duration>,
    pub confirmation_sweep_interval: Duration,
    pub pending_sweep_interval: Duration,
    pub log_cleanup_interval: Duration,
    /// Age after which logs are eligible for cleanup.
    pub log_retention_days: i64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            twilio_api_base: DEFAULT_API_BASE.to_string(),
            default_timezone: FALLBACK_TIMEZONE,
            provider_timeout: None,
            confirmation_sweep_interval: Duration::from_secs(DEFAULT_CONFIRMATION_SWEEP_SECS),
            pending_sweep_interval: Duration::from_secs(DEFAULT_PENDING_SWEEP_SECS),
            log_cleanup_interval: Duration::from_secs(DEFAULT_LOG_CLEANUP_SWEEP_SECS),
            log_retention_days: DEFAULT_LOG_RETENTION_DAYS,
        }
    }
}

impl NotifyConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `TWILIO_API_BASE`         | `https://api.twilio.com` |
    /// | `DEFAULT_TIMEZONE`        | `America/Sao_Paulo`      |
    /// | `PROVIDER_TIMEOUT_SECS`   | unset (client default)   |
    /// | `CONFIRMATION_SWEEP_SECS` | `3600`                   |
    /// | `PENDING_SWEEP_SECS`      | `300`                    |
    /// | `LOG_CLEANUP_SWEEP_SECS`  | `86400`                  |
    /// | `LOG_RETENTION_DAYS`      | `90`                     |
    ///
    /// Unparseable values are ignored with a warning, as are zero sweep
    /// intervals and retention periods outside `1..=36500` days.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_timezone = match std::env::var("DEFAULT_TIMEZONE") {
            Ok(name) => name.parse::<Tz>().unwrap_or_else(|_| {
                tracing::warn!(timezone = %name, "Invalid DEFAULT_TIMEZONE, using fallback");
                defaults.default_timezone
            }),
            Err(_) => defaults.default_timezone,
        };

        Self {
            twilio_api_base: std::env::var("TWILIO_API_BASE")
                .unwrap_or(defaults.twilio_api_base),
            default_timezone,
            provider_timeout: env_parse::<u64>("PROVIDER_TIMEOUT_SECS").map(Duration::from_secs),
            confirmation_sweep_interval: sweep_interval(
                "CONFIRMATION_SWEEP_SECS",
                env_parse("CONFIRMATION_SWEEP_SECS"),
                defaults.confirmation_sweep_interval,
            ),
            pending_sweep_interval: sweep_interval(
                "PENDING_SWEEP_SECS",
                env_parse("PENDING_SWEEP_SECS"),
                defaults.pending_sweep_interval,
            ),
            log_cleanup_interval: sweep_interval(
                "LOG_CLEANUP_SWEEP_SECS",
                env_parse("LOG_CLEANUP_SWEEP_SECS"),
                defaults.log_cleanup_interval,
            ),
            log_retention_days: retention_days(
                env_parse("LOG_RETENTION_DAYS"),
                defaults.log_retention_days,
            ),
        }
    }
}

/// `tokio::time::interval` rejects a zero period.
fn sweep_interval(var: &str, secs: Option<u64>, default: Duration) -> Duration {
    match secs {
        Some(0) => {
            tracing::warn!(
                var,
                default_secs = default.as_secs(),
                "Sweep interval must be positive, using default"
            );
            default
        }
        Some(secs) => Duration::from_secs(secs),
        None => default,
    }
}

fn retention_days(days: Option<i64>, default: i64) -> i64 {
    match days {
        Some(days) if (1..=MAX_LOG_RETENTION_DAYS).contains(&days) => days,
        Some(days) => {
            tracing::warn!(
                var = "LOG_RETENTION_DAYS",
                value = days,
                max = MAX_LOG_RETENTION_DAYS,
                default,
                "Log retention out of range, using default"
            );
            default
        }
        None => default,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Default number of log rows returned by the log listing.
pub const DEFAULT_LOG_LIMIT: i64 = 50;

/// Upper bound on the log listing page size.
pub const MAX_LOG_LIMIT: i64 = 500;

/// `?limit=` for listing endpoints.
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// Clamp an optional limit into `1..=max`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT), 50);
        assert_eq!(clamp_limit(Some(10_000), DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT), 500);
        assert_eq!(clamp_limit(Some(0), DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT), 1);
        assert_eq!(clamp_limit(Some(20), DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT), 20);
    }
}

//! Project timezone resolution.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Used when neither the project nor `DEFAULT_TIMEZONE` names a zone.
pub const FALLBACK_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;

/// Resolve a project's IANA timezone name, falling back to `default` when
/// the name is unset or unknown.
pub fn resolve(project_timezone: Option<&str>, default: Tz) -> Tz {
    match project_timezone.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(timezone = name, "Unknown project timezone, using default");
            default
        }),
    }
}

/// Wall-clock time in `tz` at the instant `now`.
pub fn local_now(now: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    now.with_timezone(&tz).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unset_or_unknown_timezone_falls_back() {
        assert_eq!(resolve(None, FALLBACK_TIMEZONE), FALLBACK_TIMEZONE);
        assert_eq!(resolve(Some("  "), FALLBACK_TIMEZONE), FALLBACK_TIMEZONE);
        assert_eq!(resolve(Some("Mars/Olympus"), FALLBACK_TIMEZONE), FALLBACK_TIMEZONE);
    }

    #[test]
    fn known_timezone_is_parsed() {
        assert_eq!(
            resolve(Some("Europe/Lisbon"), FALLBACK_TIMEZONE),
            chrono_tz::Europe::Lisbon
        );
    }

    #[test]
    fn local_now_applies_offset() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 15, 0, 0).unwrap();
        let local = local_now(now, chrono_tz::America::Sao_Paulo);
        assert_eq!(local.to_string(), "2026-07-01 12:00:00");
    }
}

//! `{{placeholder}}` substitution for notification templates.
//!
//! Rendering is a single left-to-right pass: substituted values are never
//! re-scanned, unknown placeholders are left literally in place, and nothing
//! is escaped. The reserved placeholders [`DATE_PLACEHOLDER`] and
//! [`TIME_PLACEHOLDER`] always render the clock, even when the caller's
//! variable map carries keys with the same names.

use std::collections::HashMap;

use chrono::NaiveDateTime;

/// Reserved placeholder rendered as the current date.
pub const DATE_PLACEHOLDER: &str = "data";

/// Reserved placeholder rendered as the current time of day.
pub const TIME_PLACEHOLDER: &str = "hora";

/// `dd/mm/YYYY`.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// `HH:MM`, 24-hour clock.
pub const TIME_FORMAT: &str = "%H:%M";

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render `template` against `variables` using the server's local clock.
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    render_at(template, variables, chrono::Local::now().naive_local())
}

/// Render `template` against `variables`, using `now` for the reserved
/// date/time placeholders.
pub fn render_at(
    template: &str,
    variables: &HashMap<String, String>,
    now: NaiveDateTime,
) -> String {
    let date = now.format(DATE_FORMAT).to_string();
    let time = now.format(TIME_FORMAT).to_string();

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let Some(end) = after_open.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after_open[..end];
        let value = match key {
            DATE_PLACEHOLDER => Some(date.as_str()),
            TIME_PLACEHOLDER => Some(time.as_str()),
            _ => variables.get(key).map(String::as_str),
        };

        match value {
            Some(value) => {
                out.push_str(value);
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                // Leave the braces and rescan from the key so a nested
                // `{{a {{b}}` still substitutes `{{b}}`.
                out.push_str(OPEN);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(12, 5, 0)
            .unwrap()
    }

    #[test]
    fn substitutes_known_variables() {
        let out = render_at(
            "Olá {{nome}}, mesa {{mesa}} às {{horario}}",
            &vars(&[("nome", "Ana"), ("mesa", "7"), ("horario", "20:00")]),
            noon(),
        );
        assert_eq!(out, "Olá Ana, mesa 7 às 20:00");
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = render_at("{{x}}-{{x}}", &vars(&[("x", "1")]), noon());
        assert_eq!(out, "1-1");
    }

    #[test]
    fn unknown_placeholders_are_left_literal() {
        let out = render_at("Hi {{missing}}!", &vars(&[("name", "Ana")]), noon());
        assert_eq!(out, "Hi {{missing}}!");
    }

    #[test]
    fn template_without_matching_placeholders_is_unchanged() {
        let template = "Plain {{other}} text with { braces } and }} stray";
        let variables = vars(&[("name", "Ana")]);
        let once = render_at(template, &variables, noon());
        assert_eq!(once, template);
        assert_eq!(render_at(&once, &variables, noon()), template);
    }

    #[test]
    fn date_and_time_use_the_clock() {
        let out = render_at("{{data}} {{hora}}", &HashMap::new(), noon());
        assert_eq!(out, "07/03/2026 12:05");
    }

    #[test]
    fn clock_overrides_caller_supplied_date_and_time() {
        let out = render_at(
            "{{data}} {{hora}}",
            &vars(&[("data", "amanhã"), ("hora", "já")]),
            noon(),
        );
        assert_eq!(out, "07/03/2026 12:05");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = render_at(
            "{{a}}",
            &vars(&[("a", "{{b}}"), ("b", "nope")]),
            noon(),
        );
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn nested_open_braces_still_substitute_inner_placeholder() {
        let out = render_at("{{a {{b}}", &vars(&[("b", "x")]), noon());
        assert_eq!(out, "{{a x");
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        let out = render_at("Hello {{name", &vars(&[("name", "Ana")]), noon());
        assert_eq!(out, "Hello {{name");
    }
}

//! RRULE handling for recurring calendar events.
//!
//! Rules are stored normalised (no `RRULE:` prefix, upper-case) and checked by
//! expanding them against the event start before they are persisted.

use chrono::{DateTime, Utc};
use rrule::RRuleSet;

use crate::error::{Error, Result};

/// Strip an optional `RRULE:` prefix, surrounding whitespace, and upper-case the rule.
pub fn normalize_rule(rule: &str) -> String {
    let rule = rule.trim();
    let rule = match rule.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &rule[6..],
        _ => rule,
    };
    rule.trim().to_uppercase()
}

/// Build the iCalendar snippet the rrule crate parses.
fn build_rrule_string(start: DateTime<Utc>, rule: &str) -> String {
    format!(
        "DTSTART:{}\nRRULE:{}",
        start.format("%Y%m%dT%H%M%SZ"),
        rule
    )
}

/// Parse `rule` against `start`, returning the normalised rule.
///
/// The error message is returned to the caller; callers pick the error kind.
pub fn validate_rule(start: DateTime<Utc>, rule: &str) -> std::result::Result<String, String> {
    let rule = normalize_rule(rule);
    if rule.is_empty() {
        return Err("Recurrence rule is empty".to_string());
    }

    let set: RRuleSet = build_rrule_string(start, &rule)
        .parse()
        .map_err(|e| format!("Invalid recurrence rule '{rule}': {e}"))?;

    // A rule whose expansion yields nothing is as useless as an unparsable one
    if set.all(1).dates.is_empty() {
        return Err(format!("Recurrence rule '{rule}' has no occurrence"));
    }

    Ok(rule)
}

/// Validate an optional rule for a new event (invalid → 422).
pub fn check_rule_for_create(
    start: DateTime<Utc>,
    rule: Option<&str>,
) -> Result<Option<String>> {
    rule.map(|r| validate_rule(start, r).map_err(Error::Validation))
        .transpose()
}

/// Validate an optional rule for an edited event (invalid → 400).
pub fn check_rule_for_edit(start: DateTime<Utc>, rule: Option<&str>) -> Result<Option<String>> {
    rule.map(|r| validate_rule(start, r).map_err(Error::BadRequest))
        .transpose()
}

// 🧹 Normalizer - Canonical matching keys from noisy name/email fields
//
// Every function here is total: missing or malformed input degrades to an
// empty string (or None for dates) and never fails the run.

use chrono::{NaiveDate, NaiveDateTime};

// ============================================================================
// EMAIL + NAME
// ============================================================================

/// Lowercase + trim. Missing values become the empty string.
pub fn normalize_email(raw: Option<&str>) -> String {
    raw.map(|s| s.trim().to_lowercase()).unwrap_or_default()
}

/// Trim only. Case is kept for display; matching goes through `name_key`.
pub fn normalize_name(raw: Option<&str>) -> String {
    raw.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Name key: `lowercase(first + last)` keeping only `[a-z]`
///
/// Example:
/// - name_key("Jane", "Doe")        → "janedoe"
/// - name_key("Mary-Jo", "O'Neil")  → "maryjooneil"
/// - name_key("  ", "42")           → ""   (never a valid join key)
pub fn name_key(first: &str, last: &str) -> String {
    first
        .chars()
        .chain(last.chars())
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Split a "Client Name" cell on the first whitespace run
///
/// "Jane Van Doe" → ("Jane", "Van Doe"), "Cher" → ("Cher", "")
pub fn split_client_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

// ============================================================================
// EVENT DATES
// ============================================================================

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a booking start date into an orderable timestamp
///
/// Date-only values resolve to midnight. Unknown formats return None, which
/// the aggregator treats as "counted but not dated".
pub fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

// ============================================================================
// TESTS
// ============================================================================

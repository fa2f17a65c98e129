//! Expiration extraction from raw WHOIS text.
//!
//! WHOIS servers answer in free-form text whose layout differs per registry.
//! The text providers (docker and custom command) only need one fact out of
//! it, so parsing is a line scan for a handful of well-known labels.

use crate::types::ExpirationResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Labels that introduce an expiration date in WHOIS text output.
pub const EXPIRATION_LABELS: [&str; 3] = [
    "Registry Expiry Date:",
    "Expiration Date:",
    "Domain expires:",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%b %d %Y",
    "%B %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
];

/// Scan WHOIS text for the first parseable expiration line.
///
/// Lines are visited in the order the provider emitted them. A line carrying
/// one of [`EXPIRATION_LABELS`] whose value is not a date is skipped, and the
/// scan moves on. No matching line yields `Unknown`.
pub fn parse_expiration(raw: &str) -> ExpirationResult {
    for line in raw.lines() {
        if !EXPIRATION_LABELS.iter().any(|label| line.contains(label)) {
            continue;
        }

        let Some((_, value)) = line.split_once(':') else {
            continue;
        };

        match parse_date(value) {
            Some(date) => return ExpirationResult::Known(date),
            None => {
                tracing::debug!(line = line.trim(), "skipping unparseable expiration line");
            }
        }
    }

    ExpirationResult::Unknown
}

/// Parse a WHOIS date value, independent of the host locale.
///
/// Accepts RFC 3339 timestamps, the common ISO-like layouts and the
/// `15-jan-2030` style several ccTLD registries use. Trailing time zone
/// words (`UTC`, `GMT`, ...) are tolerated. Only the calendar day is kept.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(date) = parse_date_exact(value) {
        return Some(date);
    }

    // "2030-01-15 00:00:00 UTC", "15-Jan-2030 12:00:00 GMT", "(YYYY-MM-DD)"...
    let tokens: Vec<&str> = value.split_whitespace().collect();
    for take in (1..tokens.len()).rev() {
        let candidate = tokens[..take].join(" ");
        if let Some(date) = parse_date_exact(&candidate) {
            return Some(date);
        }
    }

    None
}

fn parse_date_exact(value: &str) -> Option<NaiveDate> {
    let value = value.trim_end_matches('.');

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }

    if let Ok(timestamp) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(timestamp.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp.date());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    None
}

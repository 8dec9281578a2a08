//! Episode date resolution.
//!
//! Dates come from two places of very different quality: the `airedAt` field
//! in structured data (ISO-8601-ish, sometimes missing subseconds or the
//! time component entirely) and, failing that, an ordinal date baked into
//! the episode URL slug (`...-28th-october-2025`). Everything is normalized
//! to UTC. The current-time placeholder for episodes where both fail lives
//! with the caller so the imprecision is logged where it happens.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Day-ordinal + month-name + year, as embedded in episode slugs.
static ORDINAL_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})(?:st|nd|rd|th)-([a-z]+)-(\d{4})").unwrap());

/// Parse an `airedAt` value, tolerant of the site's format drift.
pub fn parse_aired_at(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Naive variants: trailing Z without offset semantics, missing
    // subseconds, missing time component.
    for format in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()));
    }

    None
}

/// Parse an ordinal date pattern out of an episode URL or slug.
///
/// Impossible dates (e.g. `30th-february-2025`) are rejected rather than
/// clamped.
pub fn parse_ordinal_date(text: &str) -> Option<DateTime<Utc>> {
    let captures = ORDINAL_DATE_RE.captures(text)?;
    let day: u32 = captures.get(1)?.as_str().parse().ok()?;
    let month = month_number(captures.get(2)?.as_str())?;
    let year: i32 = captures.get(3)?.as_str().parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()))
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

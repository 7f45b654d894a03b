// src/temporal.rs
//! Temporal normalization: loose date parsing, canonical timezone conversion,
//! and the recency window test.
//!
//! Sources publish dates in whatever shape they like (RFC 2822 in RSS,
//! RFC 3339 in Atom, `March 3, 2025` or `3/3/2025` on HTML listing pages).
//! Everything funnels through [`parse_loose`] and is compared in
//! [`CANONICAL_TZ`] (US Eastern).

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

/// Home-market timezone of the vertical. All window tests and rendered dates use it.
pub const CANONICAL_TZ: Tz = chrono_tz::America::New_York;

/// Wall-clock time in the canonical timezone.
pub fn now_canonical() -> DateTime<Tz> {
    Utc::now().with_timezone(&CANONICAL_TZ)
}

/// Convert any aware timestamp into the canonical timezone.
pub fn to_canonical(dt: &DateTime<FixedOffset>) -> DateTime<Tz> {
    dt.with_timezone(&CANONICAL_TZ)
}

/// `now - window_days`, or `None` when that is outside chrono's range.
pub fn window_start(now: &DateTime<Tz>, window_days: i64) -> Option<DateTime<Tz>> {
    Duration::try_days(window_days).and_then(|d| now.checked_sub_signed(d))
}

/// `true` iff `ts >= now - window_days`.
///
/// Timestamps in the future are not rejected: a clock-skewed or misparsed
/// date counts as recent. A window reaching past the representable range
/// admits everything.
pub fn is_within_window(ts: &DateTime<Tz>, window_days: i64, now: &DateTime<Tz>) -> bool {
    match window_start(now, window_days) {
        Some(start) => *ts >= start,
        None => true,
    }
}

/// Parse an arbitrary date/time string. Returns `None` on anything it can't read.
///
/// Timestamps without an offset are assumed to be UTC.
pub fn parse_loose(text: &str) -> Option<DateTime<FixedOffset>> {
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }

    // Machine formats first; they carry their own offset.
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    // Human formats. A wall-clock time is read as UTC; a bare date is midnight UTC.
    let cleaned = clean_human(raw);
    for fmt in HUMAN_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    let date_only = RE_TIME_TAIL.replace(&cleaned, "");
    let date_only = date_only.trim_end_matches(['.', ',']);
    if let Some(date) = parse_slash_date(date_only) {
        return Some(midnight_utc(date));
    }
    for fmt in HUMAN_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_only, fmt) {
            return Some(midnight_utc(date));
        }
    }
    None
}

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// chrono's %b/%B accept both abbreviated and full month names when parsing.
const HUMAN_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y/%m/%d",
];

const HUMAN_DATETIME_FORMATS: &[&str] = &[
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M%p",
    "%B %d %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M%p",
    "%m/%d/%Y %H:%M",
];

fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_hms_opt(0, 0, 0)
        .map(|n| n.and_utc().fixed_offset())
        .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.fixed_offset())
}

static RE_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)[a-z]*\.?,?\s+")
        .expect("weekday regex")
});
static RE_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal regex"));
static RE_SEPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsept\b").expect("sept regex"));
static RE_MONTH_DOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([a-z]{3,4})\.\s").expect("month dot regex"));
static RE_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i),?\s+at\s+(\d)").expect("at regex"));
static RE_MERIDIEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([ap])\.m\.?").expect("meridiem regex"));
// `, 4:15 pm ET`, `10:00:00`, `at 9am` left over after the datetime formats gave up
static RE_TIME_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i),?\s+\d{1,2}(?::\d{2}){0,2}\s*(?:[ap]m)?(?:\s+[a-z]{1,4})?$")
        .expect("time tail regex")
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));
static RE_SLASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").expect("slash date regex")
});

/// Strip weekday prefixes, ordinal suffixes, abbreviation dots and the
/// `at` before a time so the strftime formats above have a chance.
fn clean_human(raw: &str) -> String {
    let s = RE_WS.replace_all(raw, " ");
    let s = RE_WEEKDAY.replace(&s, "");
    let s = RE_MERIDIEM.replace_all(&s, "${1}m");
    let s = RE_AT.replace(&s, " $1");
    let s = RE_ORDINAL.replace_all(&s, "$1");
    let s = RE_SEPT.replace_all(&s, "Sep");
    let s = RE_MONTH_DOT.replace_all(&s, "$1 ");
    s.trim().trim_end_matches(['.', ',']).to_string()
}

/// `M/D/YYYY` or `M/D/YY` (US order). Two-digit years land in 20YY.
fn parse_slash_date(s: &str) -> Option<NaiveDate> {
    let caps = RE_SLASH.captures(s)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year_raw = &caps[3];
    let mut year: i32 = year_raw.parse().ok()?;
    if year_raw.len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

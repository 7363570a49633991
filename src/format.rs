// src/format.rs
//! Number and date rendering used by every message formatter.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::ParseError;
use crate::feed::types::Strike;

/// Options further out than this many days also show the year.
pub const SHORT_EXPIRY_MAX_DTE: i64 = 365;

/// `1234.5` -> `1,234.50`
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Whole quantities print without decimals, fractional share counts as-is.
pub fn format_quantity(q: f64) -> String {
    if q.fract() == 0.0 {
        format!("{q:.0}")
    } else {
        format!("{q}")
    }
}

/// `$95/$90`; null legs are dropped.
pub fn format_strikes(legs: &[Option<&Strike>]) -> String {
    legs.iter()
        .flatten()
        .map(|s| format!("${s}"))
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse the API's ISO-ish timestamps, ignoring any time zone.
pub fn parse_loose_datetime(s: &str) -> Result<NaiveDateTime, ParseError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ParseError::Date(s.to_string()))
}

/// Whole days from `now` until `expiry`, floored like a calendar countdown.
pub fn days_to_expiry(expiry: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (expiry - now).num_seconds().div_euclid(86_400)
}

/// `MM/DD` for expiries within a year, `MM/DD/YY` beyond that.
pub fn pretty_expiry(date: &str, now: NaiveDateTime) -> Result<String, ParseError> {
    let expiry = parse_loose_datetime(date)?;
    let fmt = if days_to_expiry(expiry, now) <= SHORT_EXPIRY_MAX_DTE {
        "%m/%d"
    } else {
        "%m/%d/%y"
    };
    Ok(expiry.format(fmt).to_string())
}

//! Review timestamp resolution.
//!
//! Listing pages show review dates as relative phrases ("2 weeks ago",
//! "il y a 3 mois") rather than absolute timestamps. Phrases are resolved
//! against the wall-clock run time at day granularity using fixed unit
//! approximations: week = 7 days, month = 30 days, year = 365 days. These
//! approximations are intentional: downstream consumers compensate for the
//! skew, so they must not be "corrected" to calendar arithmetic.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

static WEEK_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)weeks?|semaines?").unwrap());
static MONTH_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)months?|mois").unwrap());
static YEAR_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\byears?\b|\bans?\b").unwrap());
static DAY_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)days?|jours?").unwrap());
static TODAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)today|aujourd").unwrap());

/// Resolve a relative date phrase to an ISO-8601 date string.
///
/// Units are checked in week, month, year, day order; the first unit word
/// present wins. A phrase with a unit word but no digit, or with no
/// recognized unit at all, resolves to the run date.
pub fn resolve_review_date(raw: &str, run_time: DateTime<Utc>) -> String {
    resolve_to_date(raw, run_time).format("%Y-%m-%d").to_string()
}

fn resolve_to_date(raw: &str, run_time: DateTime<Utc>) -> DateTime<Utc> {
    let text = raw.trim();
    if text.is_empty() {
        return run_time;
    }

    if TODAY.is_match(text) {
        return run_time;
    }

    let count = FIRST_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<i64>().ok());

    let days = if WEEK_UNIT.is_match(text) {
        count.map(|n| n * 7)
    } else if MONTH_UNIT.is_match(text) {
        count.map(|n| n * 30)
    } else if YEAR_UNIT.is_match(text) {
        count.map(|n| n * 365)
    } else if DAY_UNIT.is_match(text) {
        count
    } else {
        None
    };

    match days {
        Some(d) => run_time - Duration::days(d),
        None => run_time,
    }
}

//! Month/year derivation for the calendar header and the in-view rollover
//! rule.

use std::sync::LazyLock;

use regex::Regex;

/// Localized month names as the portal renders them, lowercase.
const ROMANIAN_MONTHS: [&str; 12] = [
    "ianuarie",
    "februarie",
    "martie",
    "aprilie",
    "mai",
    "iunie",
    "iulie",
    "august",
    "septembrie",
    "octombrie",
    "noiembrie",
    "decembrie",
];

/// Fallback table for the widget's unlocalized default.
const ENGLISH_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// Parse "<Month name> <year>" header text into (month, year).
///
/// Month names are matched case-insensitively against the fixed tables; the
/// year is the first four-digit 20xx token. Returns `None` when either part
/// is missing, in which case the caller falls back to the real-world
/// current month/year.
pub fn parse_header(text: &str) -> Option<(u32, i32)> {
    let lower = text.to_lowercase();
    let month = ROMANIAN_MONTHS
        .iter()
        .position(|m| lower.contains(m))
        .or_else(|| ENGLISH_MONTHS.iter().position(|m| lower.contains(m)))?
        as u32
        + 1;
    let year: i32 = YEAR_RE.captures(&lower)?.get(1)?.as_str().parse().ok()?;
    Some((month, year))
}

/// Next month, wrapping the year at December → January.
pub fn advance(month: u32, year: i32) -> (u32, i32) {
    if month >= 12 { (1, year + 1) } else { (month + 1, year) }
}

/// Whether scanning from a cell with day `prev_day` to one with day `day`
/// crossed a month boundary inside a single header reading.
pub fn crosses_rollover(prev_day: u32, day: u32) -> bool {
    day <= 10 && prev_day > 20
}

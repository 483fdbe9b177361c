//! Deterministic cross-check of the model's `total_experience_years`.
//!
//! Counting rules:
//! - a closed range counts both endpoint months (`01/2023 - 12/2023` is 12 months);
//! - an open range ("Present", "Ongoing", "Till date", "Currently pursuing")
//!   counts the months elapsed from its start up to the reference month;
//! - a bare year starts in January and ends in December;
//! - all ranges are summed, overlaps included, and the total is rounded to
//!   2 decimals.
//!
//! The two range kinds are asymmetric: the reference month itself
//! is not counted, so `01/2025 - 06/2025` is 0.5 years while `01/2025 - Present`
//! at June 2025 is 0.42.

use crate::domain::model::ReferenceMonth;
use regex::Regex;
use std::sync::LazyLock;

const DATE: &str = r"(?:(?:0?[1-9]|1[0-2])[/.\-](?:19|20)\d{2}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(?:19|20)\d{2}|(?:19|20)\d{2})";
const OPEN: &str = r"currently\s+pursuing|currently|current|present|ongoing|today|now";

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<start>{DATE})\s*(?:-|–|—|to|until|till)\s*(?:(?P<end>{DATE})|(?P<open>{OPEN}))\b"
    ))
    .expect("range pattern is valid")
});

static TILL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:till|to)\s+date\b").expect("pattern is valid"));

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<month>\d{1,2})[/.\-](?P<year>\d{4})$").expect("pattern is valid")
});

static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<month>[a-z]{3})[a-z]*\.?,?\s+(?P<year>\d{4})$").expect("pattern is valid")
});

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn month_index(year: i64, month: i64) -> i64 {
    year * 12 + month - 1
}

/// Month index of a date token; `is_end` decides where a bare year lands.
fn parse_date(token: &str, is_end: bool) -> Option<i64> {
    let token = token.trim();

    if let Some(caps) = NUMERIC.captures(token) {
        let month: i64 = caps["month"].parse().ok()?;
        let year: i64 = caps["year"].parse().ok()?;
        return (1..=12).contains(&month).then(|| month_index(year, month));
    }

    if let Some(caps) = NAMED.captures(token) {
        let name = caps["month"].to_lowercase();
        let month = MONTHS.iter().position(|m| *m == name)? as i64 + 1;
        let year: i64 = caps["year"].parse().ok()?;
        return Some(month_index(year, month));
    }

    let year: i64 = token.parse().ok()?;
    Some(month_index(year, if is_end { 12 } else { 1 }))
}

/// Months covered by every date range found in `entry`.
fn months_in_entry(entry: &str, reference: ReferenceMonth) -> Option<i64> {
    let entry = TILL_DATE.replace_all(entry, "- present");
    let mut total = None;

    for caps in RANGE.captures_iter(&entry) {
        let Some(start) = caps.name("start").and_then(|m| parse_date(m.as_str(), false)) else {
            continue;
        };

        let months = if caps.name("open").is_some() {
            reference.month_index() - start
        } else {
            match caps.name("end").and_then(|m| parse_date(m.as_str(), true)) {
                Some(end) => end - start + 1,
                None => continue,
            }
        };

        if months >= 0 {
            *total.get_or_insert(0) += months;
        }
    }

    total
}

/// Sum of all ranges in `entries`, in years, or `None` when no range is found.
pub fn estimate_experience_years(entries: &[String], reference: ReferenceMonth) -> Option<f64> {
    let months = entries
        .iter()
        .filter_map(|entry| months_in_entry(entry, reference))
        .reduce(|a, b| a + b)?;

    Some((months as f64 / 12.0 * 100.0).round() / 100.0)
}

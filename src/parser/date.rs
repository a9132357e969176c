use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

static DAY_MONTH_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})\s+(\w{3})\s+(\d{4})").unwrap());
static WEEKDAY_PREFIXED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\w{3},\s+(\d{1,2})\s+(\w{3})\s+(\d{4})").unwrap());

/// Month abbreviations, English block first, Italian block second.
/// Lookups scan from the end of the table, so the later-defined Italian
/// block wins if a spelling ever appears in both blocks.
const MONTHS: &[(&str, u32)] = &[
    // English
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
    // Italian
    ("gen", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("mag", 5),
    ("giu", 6),
    ("lug", 7),
    ("ago", 8),
    ("set", 9),
    ("ott", 10),
    ("nov", 11),
    ("dic", 12),
];

/// Pull a calendar date out of a loosely-formatted string.
///
/// Tries the known shapes in priority order: a bare `15 Feb 2026`, then the
/// mail-header form `Wed, 15 Feb 2026 14:30:00 +0000` (time and offset
/// ignored). Unrecognized month names default to January; anything that
/// fails to parse falls back to today. Never fails.
pub fn parse(raw: &str) -> NaiveDate {
    let attempts = [
        DAY_MONTH_YEAR_RE.captures(raw),
        WEEKDAY_PREFIXED_RE.captures(raw),
    ];
    for caps in attempts.into_iter().flatten() {
        let (Ok(day), Ok(year)) = (caps[1].parse::<u32>(), caps[3].parse::<i32>()) else {
            continue;
        };
        let month = month_number(&caps[2]);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return date;
        }
    }
    Local::now().date_naive()
}

/// Display form used on the dashboard: `15 Feb 2026`.
pub fn display(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// Canonical form kept alongside the display date: `2026-02-15`.
pub fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn month_number(abbrev: &str) -> u32 {
    let key = abbrev.to_lowercase();
    MONTHS
        .iter()
        .rev()
        .find(|(name, _)| *name == key)
        .map(|(_, number)| *number)
        .unwrap_or(1)
}

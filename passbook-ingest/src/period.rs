//! Statement period dates.
//!
//! Period wording varies too much to normalize safely, so these helpers only
//! return dates when both ends read cleanly under a known format.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

const PERIOD_DATE_FORMATS: [&str; 4] = ["%d %b %Y", "%d %B %Y", "%d/%m/%Y", "%Y-%m-%d"];

static RANGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(.+?)\s+(?:-|–|to)\s+(.+?)\s*$").ok());

static FILE_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{2}\s\w{3}\s\d{4})\s-\s(\d{2}\s\w{3}\s\d{4})\.(?:pdf|txt|csv)$").ok()
});

fn parse_period_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    PERIOD_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Read `(start, end)` from period text such as `01 Jan 2024 - 31 Jan 2024`
/// or `01/01/2024 to 31/01/2024`. `None` unless both dates parse and
/// `start <= end`.
pub fn parse_period_dates(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    let caps = RANGE.as_ref()?.captures(text)?;
    let start = parse_period_date(&caps[1])?;
    let end = parse_period_date(&caps[2])?;
    (start <= end).then_some((start, end))
}

/// Statement files are commonly named `01 Jan 2024 - 31 Jan 2024.pdf`; the
/// extracted text or table keeps the same stem.
pub fn period_from_file_name(name: &str) -> Option<(NaiveDate, NaiveDate)> {
    let caps = FILE_NAME.as_ref()?.captures(name.trim())?;
    let start = NaiveDate::parse_from_str(&caps[1], "%d %b %Y").ok()?;
    let end = NaiveDate::parse_from_str(&caps[2], "%d %b %Y").ok()?;
    Some((start, end))
}

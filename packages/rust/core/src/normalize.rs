//! Raw row → [`PublicationRecord`] normalization.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use pubsync_shared::{PublicationRecord, RawRow, YEAR_SENTINEL};

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("year regex is valid"));

/// Normalize one raw row. Rows without a title are dropped.
pub fn normalize(raw: RawRow) -> Option<PublicationRecord> {
    let title = clean(raw.title)?;

    Some(PublicationRecord {
        title,
        authors: clean(raw.authors).unwrap_or_default(),
        venue: clean(raw.venue).unwrap_or_default(),
        year: normalize_year(raw.year.as_deref()),
        url: clean(raw.url),
        citations: raw.citations.as_deref().and_then(parse_count),
    })
}

/// Normalize a batch, preserving listing order.
pub fn normalize_all(rows: Vec<RawRow>) -> Vec<PublicationRecord> {
    let total = rows.len();
    let records: Vec<_> = rows.into_iter().filter_map(normalize).collect();

    if records.len() < total {
        debug!(dropped = total - records.len(), "rows without a title dropped");
    }

    records
}

/// Four ASCII digits pass through; anything else becomes the sentinel.
pub fn normalize_year(year: Option<&str>) -> String {
    match year.map(str::trim) {
        Some(y) if YEAR_RE.is_match(y) => y.to_string(),
        _ => YEAR_SENTINEL.to_string(),
    }
}

/// Whether `year` is already in normalized form: four ASCII digits or the sentinel.
pub fn is_valid_year(year: &str) -> bool {
    year == YEAR_SENTINEL || YEAR_RE.is_match(year)
}

/// Trimmed, non-empty text.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the digits of a count cell ("1,204", "17*"); `None` when there are none.
fn parse_count(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

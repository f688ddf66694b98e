//! Core domain types for publication syncing.

use serde::{Deserialize, Serialize};

/// Placeholder stored in [`PublicationRecord::year`] when no usable year exists.
pub const YEAR_SENTINEL: &str = "N/A";

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// The researcher whose publications are collected.
///
/// The interactive strategy addresses the profile by `id`; the query client
/// looks the author up by `display_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// URL-embeddable profile identifier.
    pub id: String,
    /// Free-text author display name.
    pub display_name: String,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

// ---------------------------------------------------------------------------
// RawRow
// ---------------------------------------------------------------------------

/// Unnormalized field tuple as produced by a fetch strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub venue: Option<String>,
    pub year: Option<String>,
    pub url: Option<String>,
    pub citations: Option<String>,
}

// ---------------------------------------------------------------------------
// PublicationRecord
// ---------------------------------------------------------------------------

/// A normalized publication, ready for ranking and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Never empty.
    pub title: String,
    /// Free-form, comma/semicolon separated author list. Empty when unknown.
    pub authors: String,
    /// Empty when unknown.
    pub venue: String,
    /// Four ASCII digits, or [`YEAR_SENTINEL`].
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<u32>,
}

impl PublicationRecord {
    /// Numeric view of the year; the sentinel (or anything non-numeric) reads as 0.
    pub fn sort_year(&self) -> u32 {
        self.year.parse().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: &str) -> PublicationRecord {
        PublicationRecord {
            title: "Edge offloading for drones".into(),
            authors: "S Baidya, M Levorato".into(),
            venue: "IEEE INFOCOM".into(),
            year: year.into(),
            url: None,
            citations: Some(12),
        }
    }

    #[test]
    fn sort_year_reads_numeric_years() {
        assert_eq!(record("2023").sort_year(), 2023);
        assert_eq!(record(YEAR_SENTINEL).sort_year(), 0);
    }

    #[test]
    fn record_serialization_skips_absent_fields() {
        let mut rec = record("2021");
        rec.citations = None;
        let json = serde_json::to_string(&rec).expect("serialize");
        assert!(!json.contains("url"));
        assert!(!json.contains("citations"));

        let parsed: PublicationRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, rec);
    }

    #[test]
    fn profile_display() {
        let profile = Profile {
            id: "UY1UAKUAAAAJ".into(),
            display_name: "Sabur Baidya".into(),
        };
        assert_eq!(profile.to_string(), "Sabur Baidya (UY1UAKUAAAAJ)");
    }
}

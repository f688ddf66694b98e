//! JSON record sets for offline `fetch` / `apply` runs.

use std::path::Path;

use pubsync_shared::{PubSyncError, PublicationRecord, Result};

use crate::normalize::is_valid_year;

/// Serialize records as pretty-printed JSON.
pub fn records_to_json(records: &[PublicationRecord]) -> Result<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| PubSyncError::validation(format!("failed to serialize records: {e}")))
}

/// Read a record set previously written by [`write_records`].
///
/// The file is expected to be normalized already: a record with an empty
/// title, or a year that is neither four digits nor `N/A`, rejects the whole
/// set rather than being repaired.
pub fn read_records(path: &Path) -> Result<Vec<PublicationRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| PubSyncError::io(path, e))?;
    let records: Vec<PublicationRecord> = serde_json::from_str(&content).map_err(|e| {
        PubSyncError::validation(format!("invalid record file {}: {e}", path.display()))
    })?;

    if let Some(index) = records.iter().position(|r| r.title.trim().is_empty()) {
        return Err(PubSyncError::validation(format!(
            "record {index} in {} has an empty title",
            path.display()
        )));
    }

    if let Some((index, record)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| !is_valid_year(&r.year))
    {
        return Err(PubSyncError::validation(format!(
            "record {index} in {} has an invalid year '{}'",
            path.display(),
            record.year
        )));
    }

    Ok(records)
}

/// Write records to `path` as JSON.
pub fn write_records(path: &Path, records: &[PublicationRecord]) -> Result<()> {
    let json = records_to_json(records)?;
    crate::pipeline::write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pubsync-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn written_records_read_back() {
        let dir = temp_dir();
        let path = dir.join("records.json");
        let records = vec![PublicationRecord {
            title: "Edge offloading".into(),
            authors: "S. Baidya".into(),
            venue: String::new(),
            year: "N/A".into(),
            url: None,
            citations: Some(4),
        }];

        write_records(&path, &records).unwrap();
        assert_eq!(read_records(&path).unwrap(), records);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_bad_files() {
        let dir = temp_dir();

        let garbage = dir.join("garbage.json");
        std::fs::write(&garbage, "{not json").unwrap();
        assert!(matches!(
            read_records(&garbage).unwrap_err(),
            PubSyncError::Validation { .. }
        ));

        let untitled = dir.join("untitled.json");
        std::fs::write(
            &untitled,
            r#"[{"title": " ", "authors": "", "venue": "", "year": "2020"}]"#,
        )
        .unwrap();
        assert!(read_records(&untitled).unwrap_err().to_string().contains("record 0"));

        let odd_year = dir.join("odd-year.json");
        std::fs::write(
            &odd_year,
            r#"[{"title": "Odd", "authors": "", "venue": "V", "year": "Spring 2020"}]"#,
        )
        .unwrap();
        let err = read_records(&odd_year).unwrap_err();
        assert!(matches!(err, PubSyncError::Validation { .. }));
        assert!(err.to_string().contains("Spring 2020"));

        let blank_year = dir.join("blank-year.json");
        std::fs::write(
            &blank_year,
            r#"[{"title": "Fine", "authors": "", "venue": "", "year": "2021"},
                {"title": "Blank", "authors": "", "venue": "", "year": ""}]"#,
        )
        .unwrap();
        let err = read_records(&blank_year).unwrap_err();
        assert!(matches!(err, PubSyncError::Validation { .. }));
        assert!(err.to_string().contains("record 1"));

        assert!(matches!(
            read_records(&dir.join("missing.json")).unwrap_err(),
            PubSyncError::Io { .. }
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}

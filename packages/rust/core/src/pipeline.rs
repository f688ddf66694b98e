//! End-to-end `update` pipeline: fetch → normalize → rank → render → reconcile.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use pubsync_fetcher::FetcherChain;
use pubsync_shared::{
    DocumentLayout, DocumentTarget, Profile, PubSyncError, PublicationRecord, RawRow, Result,
};

use crate::normalize::normalize_all;
use crate::rank::rank;
use crate::reconcile::{ReconcileRule, reconcile};
use crate::render::render_entries;

/// Options for a sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Render and reconcile but leave every file untouched.
    pub dry_run: bool,
}

/// What happened to one destination document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// The list was replaced and the file rewritten.
    Updated { entries: usize },
    /// Dry run: the list would have been replaced.
    Unchanged { entries: usize },
    /// Anchor heading or list missing; the file was not touched.
    Aborted { reason: String },
    /// Reading or writing the file failed.
    Failed { reason: String },
}

/// Per-document result of a run.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub layout: DocumentLayout,
    pub outcome: DocumentOutcome,
}

impl DocumentReport {
    /// Aborted and failed documents both count against the run.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.outcome,
            DocumentOutcome::Aborted { .. } | DocumentOutcome::Failed { .. }
        )
    }
}

/// Result of the `sync` pipeline.
#[derive(Debug)]
pub struct SyncReport {
    /// Strategy that produced the listing (`"records"` for offline applies).
    pub strategy: String,
    /// Ranked records, newest first.
    pub records: Vec<PublicationRecord>,
    /// One report per configured document, in configuration order.
    pub documents: Vec<DocumentReport>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl SyncReport {
    /// Whether any document was aborted or failed.
    pub fn has_failures(&self) -> bool {
        self.documents.iter().any(DocumentReport::is_failure)
    }

    pub fn failed_documents(&self) -> usize {
        self.documents.iter().filter(|d| d.is_failure()).count()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each destination document is processed.
    fn document_done(&self, report: &DocumentReport);
    /// Called when the pipeline completes.
    fn done(&self, report: &SyncReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_done(&self, _report: &DocumentReport) {}
    fn done(&self, _report: &SyncReport) {}
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Normalize raw rows and rank them newest first.
pub fn prepare_records(rows: Vec<RawRow>) -> Vec<PublicationRecord> {
    rank(normalize_all(rows))
}

/// Reconcile one document against `records`.
///
/// Returns the number of entries written. The file is rewritten through a
/// sibling temp file and a rename, so a failed write leaves the original
/// intact. With `dry_run` nothing is written.
#[instrument(skip(records), fields(path = %target.path.display(), layout = %target.layout))]
pub fn update_document(
    target: &DocumentTarget,
    records: &[PublicationRecord],
    dry_run: bool,
) -> Result<usize> {
    let selected = match target.effective_limit() {
        Some(limit) => &records[..records.len().min(limit)],
        None => records,
    };

    let original = std::fs::read_to_string(&target.path)
        .map_err(|e| PubSyncError::io(&target.path, e))?;

    let rule = ReconcileRule::for_target(target);
    let entries = render_entries(target.layout, selected);
    let updated = reconcile(&original, &rule, &entries)?;

    if dry_run {
        info!(entries = selected.len(), "dry run, document not written");
    } else {
        write_atomic(&target.path, &updated)?;
        info!(entries = selected.len(), "document updated");
    }

    Ok(selected.len())
}

/// Write `content` to a hidden sibling temp file, then rename it over `path`.
///
/// An existing symlink is followed so the link itself survives, and the
/// existing file's permissions are carried over to the replacement.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let target = match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(PubSyncError::io(path, e)),
    };
    let file_name = target
        .file_name()
        .ok_or_else(|| PubSyncError::validation(format!("not a file path: {}", path.display())))?;
    let temp = target.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| PubSyncError::io(&temp, e))?;

    let result = std::fs::metadata(&target)
        .ok()
        .map_or(Ok(()), |meta| std::fs::set_permissions(&temp, meta.permissions()))
        .and_then(|()| std::fs::rename(&temp, &target));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp);
        return Err(PubSyncError::io(&target, e));
    }

    Ok(())
}

/// Reconcile every document, converting failures into per-document outcomes.
pub fn apply_documents(
    documents: &[DocumentTarget],
    records: &[PublicationRecord],
    options: &SyncOptions,
    progress: &dyn ProgressReporter,
) -> Vec<DocumentReport> {
    let mut reports = Vec::with_capacity(documents.len());

    for target in documents {
        progress.phase(&format!("Updating {}", target.path.display()));

        let outcome = match update_document(target, records, options.dry_run) {
            Ok(entries) if options.dry_run => DocumentOutcome::Unchanged { entries },
            Ok(entries) => DocumentOutcome::Updated { entries },
            Err(e @ PubSyncError::AnchorNotFound { .. }) => {
                warn!(path = %target.path.display(), error = %e, "document update aborted");
                DocumentOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                warn!(path = %target.path.display(), error = %e, "document update failed");
                DocumentOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let report = DocumentReport {
            path: target.path.clone(),
            layout: target.layout,
            outcome,
        };
        progress.document_done(&report);
        reports.push(report);
    }

    reports
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Fetch the listing through `chain` and return ranked records with the
/// name of the strategy that produced them.
pub async fn fetch_records(
    chain: &FetcherChain,
    profile: &Profile,
) -> Result<(String, Vec<PublicationRecord>)> {
    let outcome = chain.fetch(profile).await?;
    let records = prepare_records(outcome.rows);

    if records.is_empty() {
        return Err(PubSyncError::fetch(
            outcome.strategy,
            "listing contained no usable rows",
        ));
    }

    Ok((outcome.strategy, records))
}

/// Run the full pipeline.
///
/// 1. Fetch through the strategy chain
/// 2. Normalize and rank
/// 3. Reconcile each document
///
/// Only total fetch failure is returned as an error; in that case no
/// document is touched. Per-document problems land in the report.
#[instrument(skip_all, fields(profile = %profile, documents = documents.len()))]
pub async fn sync(
    chain: &FetcherChain,
    profile: &Profile,
    documents: &[DocumentTarget],
    options: &SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<SyncReport> {
    let start = Instant::now();

    progress.phase("Fetching publications");
    let (strategy, records) = fetch_records(chain, profile).await?;
    info!(%strategy, records = records.len(), "publications ranked");

    let documents = apply_documents(documents, &records, options, progress);

    let report = SyncReport {
        strategy,
        records,
        documents,
        elapsed: start.elapsed(),
    };
    progress.done(&report);

    info!(
        strategy = %report.strategy,
        records = report.records.len(),
        failed = report.failed_documents(),
        elapsed_ms = report.elapsed.as_millis(),
        "sync complete"
    );

    Ok(report)
}

/// Reconcile documents from an already ranked record set (no network).
#[instrument(skip_all, fields(records = records.len(), documents = documents.len()))]
pub fn apply_records(
    records: Vec<PublicationRecord>,
    documents: &[DocumentTarget],
    options: &SyncOptions,
    progress: &dyn ProgressReporter,
) -> SyncReport {
    let start = Instant::now();
    let records = rank(records);
    let documents = apply_documents(documents, &records, options, progress);

    let report = SyncReport {
        strategy: "records".to_string(),
        records,
        documents,
        elapsed: start.elapsed(),
    };
    progress.done(&report);
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pubsync_fetcher::FetchStrategy;

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pubsync-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn copy_fixture(dir: &Path, name: &str) -> PathBuf {
        let source = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/html")
            .join(name);
        let target = dir.join(name);
        std::fs::copy(&source, &target).unwrap();
        target
    }

    fn target(path: PathBuf, layout: DocumentLayout) -> DocumentTarget {
        DocumentTarget {
            path,
            layout,
            limit: None,
            anchor_style: None,
        }
    }

    fn raw(title: &str, year: &str) -> RawRow {
        RawRow {
            title: Some(title.into()),
            authors: Some("S. Baidya".into()),
            venue: Some("IEEE".into()),
            year: Some(year.into()),
            ..RawRow::default()
        }
    }

    struct Fixed(Vec<RawRow>);

    #[async_trait]
    impl FetchStrategy for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _profile: &Profile) -> Result<Vec<RawRow>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Recording {
        documents: Mutex<Vec<DocumentOutcome>>,
    }

    impl ProgressReporter for Recording {
        fn phase(&self, _name: &str) {}
        fn document_done(&self, report: &DocumentReport) {
            self.documents.lock().unwrap().push(report.outcome.clone());
        }
        fn done(&self, _report: &SyncReport) {}
    }

    fn profile() -> Profile {
        Profile {
            id: "UY1UAKUAAAAJ".into(),
            display_name: "Sabur Baidya".into(),
        }
    }

    fn chain(rows: Vec<RawRow>) -> FetcherChain {
        FetcherChain::new(vec![Box::new(Fixed(rows))])
    }

    #[test]
    fn prepare_drops_untitled_and_ranks() {
        let records = prepare_records(vec![
            raw("old", "2012"),
            raw("", "2030"),
            raw("unknown", "soon"),
            raw("new", "2023"),
        ]);
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "old", "unknown"]);
    }

    #[test]
    fn untitled_row_is_dropped_and_rest_ranked_newest_first() {
        let records = prepare_records(vec![
            raw("B", "2020"),
            raw("A", "2023"),
            raw("", "2021"),
            raw("C", "N/A"),
        ]);

        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        let years: Vec<_> = records.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(years, vec!["2023", "2020", "N/A"]);
    }

    #[tokio::test]
    async fn sync_updates_both_layouts() {
        let dir = temp_dir();
        let documents = vec![
            target(copy_fixture(&dir, "publication.html"), DocumentLayout::Proceedings),
            target(copy_fixture(&dir, "aimslab.html"), DocumentLayout::Highlights),
        ];
        let rows = (2015..2020).map(|y| raw(&format!("Paper {y}"), &y.to_string())).collect();

        let report = sync(
            &chain(rows),
            &profile(),
            &documents,
            &SyncOptions::default(),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.strategy, "fixed");
        assert_eq!(report.records[0].title, "Paper 2019");
        assert!(!report.has_failures());
        assert_eq!(report.documents[0].outcome, DocumentOutcome::Updated { entries: 5 });
        assert_eq!(report.documents[1].outcome, DocumentOutcome::Updated { entries: 3 });

        let highlights = std::fs::read_to_string(&documents[1].path).unwrap();
        assert!(highlights.contains("Paper 2019"));
        assert!(highlights.contains("Paper 2017"));
        assert!(!highlights.contains("Paper 2016"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn aborted_document_is_byte_identical_and_others_proceed() {
        let dir = temp_dir();
        let missing_anchor = copy_fixture(&dir, "no-anchor.html");
        let before = std::fs::read(&missing_anchor).unwrap();
        let documents = vec![
            target(missing_anchor.clone(), DocumentLayout::Proceedings),
            target(copy_fixture(&dir, "publication.html"), DocumentLayout::Proceedings),
            target(dir.join("does-not-exist.html"), DocumentLayout::Proceedings),
        ];
        let progress = Recording::default();

        let report = sync(
            &chain(vec![raw("Only", "2021")]),
            &profile(),
            &documents,
            &SyncOptions::default(),
            &progress,
        )
        .await
        .unwrap();

        assert!(report.has_failures());
        assert_eq!(report.failed_documents(), 2);
        assert!(matches!(report.documents[0].outcome, DocumentOutcome::Aborted { .. }));
        assert_eq!(report.documents[1].outcome, DocumentOutcome::Updated { entries: 1 });
        assert!(matches!(report.documents[2].outcome, DocumentOutcome::Failed { .. }));
        assert_eq!(progress.documents.lock().unwrap().len(), 3);

        assert_eq!(std::fs::read(&missing_anchor).unwrap(), before);
        assert!(!dir.join(".no-anchor.html.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn second_run_leaves_document_unchanged() {
        let dir = temp_dir();
        let documents = vec![target(
            copy_fixture(&dir, "publication.html"),
            DocumentLayout::Proceedings,
        )];
        let rows = vec![raw("B", "2020"), raw("A", "2022"), raw("C", "N/A")];

        sync(&chain(rows.clone()), &profile(), &documents, &SyncOptions::default(), &SilentProgress)
            .await
            .unwrap();
        let first = std::fs::read(&documents[0].path).unwrap();

        sync(&chain(rows), &profile(), &documents, &SyncOptions::default(), &SilentProgress)
            .await
            .unwrap();
        let second = std::fs::read(&documents[0].path).unwrap();

        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn total_fetch_failure_touches_nothing() {
        let dir = temp_dir();
        let path = copy_fixture(&dir, "publication.html");
        let before = std::fs::read(&path).unwrap();
        let documents = vec![target(path.clone(), DocumentLayout::Proceedings)];

        let err = sync(&chain(Vec::new()), &profile(), &documents, &SyncOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, PubSyncError::Fetch { .. }));

        let err = sync(
            &chain(vec![raw("   ", "2020")]),
            &profile(),
            &documents,
            &SyncOptions::default(),
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no usable rows"));

        assert_eq!(std::fs::read(&path).unwrap(), before);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn dry_run_does_not_write() {
        let dir = temp_dir();
        let path = copy_fixture(&dir, "publication.html");
        let before = std::fs::read(&path).unwrap();
        let documents = vec![target(path.clone(), DocumentLayout::Proceedings)];

        let records = prepare_records(vec![raw("A", "2020")]);
        let report = apply_records(
            records,
            &documents,
            &SyncOptions { dry_run: true },
            &SilentProgress,
        );

        assert_eq!(report.strategy, "records");
        assert_eq!(report.documents[0].outcome, DocumentOutcome::Unchanged { entries: 1 });
        assert!(!report.has_failures());
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn explicit_limit_caps_entries() {
        let dir = temp_dir();
        let mut doc = target(copy_fixture(&dir, "publication.html"), DocumentLayout::Proceedings);
        doc.limit = Some(2);

        let records = prepare_records((0..6).map(|i| raw(&format!("P{i}"), "2020")).collect());
        assert_eq!(update_document(&doc, &records, false).unwrap(), 2);

        let html = std::fs::read_to_string(&doc.path).unwrap();
        assert!(html.contains("P1"));
        assert!(!html.contains("P2"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = temp_dir();
        let path = dir.join("page.html");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.join(".page.html.tmp").exists());

        let err = write_atomic(&dir.join("missing-dir").join("page.html"), "x").unwrap_err();
        assert!(matches!(err, PubSyncError::Io { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_symlink_and_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir();
        let real = dir.join("real.html");
        let link = dir.join("served.html");
        std::fs::write(&real, "old").unwrap();
        std::fs::set_permissions(&real, std::fs::Permissions::from_mode(0o640)).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        write_atomic(&link, "new").unwrap();

        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&real).unwrap(), "new");
        assert_eq!(
            std::fs::metadata(&real).unwrap().permissions().mode() & 0o777,
            0o640
        );
        assert!(!dir.join(".real.html.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! Core pipeline and domain logic for pubsync.
//!
//! Ties the fetchers to the normalize → rank → render → reconcile stages and
//! writes the results back into the destination documents.

pub mod export;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod reconcile;
pub mod render;

pub use pipeline::{
    DocumentOutcome, DocumentReport, ProgressReporter, SilentProgress, SyncOptions, SyncReport,
    apply_records, fetch_records, prepare_records, sync,
};

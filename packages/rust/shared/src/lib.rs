//! Shared types, error model, and configuration for pubsync.
//!
//! This crate is the foundation depended on by all other pubsync crates.
//! It provides:
//! - [`PubSyncError`]: the unified error type
//! - Domain types ([`RawRow`], [`PublicationRecord`], [`Profile`])
//! - Configuration ([`AppConfig`], [`DocumentTarget`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AUTHOR_NAME_ENV, BrowserConfig, DocumentLayout, DocumentTarget, FetchConfig,
    ProfileConfig, QueryConfig, SCHOLAR_ID_ENV, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_config,
};
pub use error::{PubSyncError, Result};
pub use types::{Profile, PublicationRecord, RawRow, YEAR_SENTINEL};

//! Publication listing fetchers.
//!
//! This crate provides:
//! - [`FetchStrategy`]: the capability `fetch(profile) -> Vec<RawRow>`
//! - [`FetcherChain`]: tries strategies in priority order until one yields rows
//! - [`interactive`]: WebDriver-driven scraping of the profile listing page
//! - [`query`]: Semantic Scholar Graph API author lookup

pub mod interactive;
pub mod query;
pub mod strategy;

pub use interactive::{InteractiveStrategy, ListingSession, RowSnapshot, WebDriverSession};
pub use query::QueryClientStrategy;
pub use strategy::{ChainOutcome, FetchStrategy, FetcherChain};

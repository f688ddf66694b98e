//! Fetch strategy trait and the ordered fallback chain.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use pubsync_shared::{AppConfig, Profile, PubSyncError, RawRow, Result};

use crate::interactive::InteractiveStrategy;
use crate::query::QueryClientStrategy;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A way of retrieving a profile's publication listing.
///
/// Strategies are tried in priority order by [`FetcherChain`]; an error or an
/// empty result hands over to the next strategy.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;

    /// Produce the raw listing rows for `profile`.
    async fn fetch(&self, profile: &Profile) -> Result<Vec<RawRow>>;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Rows produced by the first strategy that returned any.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    /// Name of the strategy that produced the rows.
    pub strategy: String,
    /// Raw rows, in listing order.
    pub rows: Vec<RawRow>,
}

/// Holds fetch strategies in priority order.
pub struct FetcherChain {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl FetcherChain {
    /// Create a chain from explicit strategies (first = highest priority).
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the chain named by `[fetch] strategies`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut strategies: Vec<Box<dyn FetchStrategy>> = Vec::new();

        for name in &config.fetch.strategies {
            match name.as_str() {
                "interactive" => strategies.push(Box::new(InteractiveStrategy::new(
                    config.browser.clone(),
                    config.profile.clone(),
                ))),
                "query" => strategies.push(Box::new(QueryClientStrategy::new(&config.query)?)),
                other => {
                    return Err(PubSyncError::config(format!(
                        "unknown fetch strategy '{other}': expected 'interactive' or 'query'"
                    )));
                }
            }
        }

        if strategies.is_empty() {
            return Err(PubSyncError::config("no fetch strategies configured"));
        }

        Ok(Self { strategies })
    }

    /// Strategy names in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order and return the first non-empty listing.
    ///
    /// Fails with [`PubSyncError::Fetch`] only when every strategy came back
    /// empty or errored.
    #[instrument(skip_all, fields(profile = %profile))]
    pub async fn fetch(&self, profile: &Profile) -> Result<ChainOutcome> {
        for strategy in &self.strategies {
            info!(strategy = strategy.name(), "fetching publication listing");

            match strategy.fetch(profile).await {
                Ok(rows) if !rows.is_empty() => {
                    info!(strategy = strategy.name(), rows = rows.len(), "listing fetched");
                    return Ok(ChainOutcome {
                        strategy: strategy.name().to_string(),
                        rows,
                    });
                }
                Ok(_) => {
                    warn!(strategy = strategy.name(), "strategy returned no rows, falling back");
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "strategy failed, falling back");
                }
            }
        }

        Err(PubSyncError::fetch(
            "all",
            format!(
                "no publications found with any strategy ({})",
                self.names().join(", ")
            ),
        ))
    }
}

//! Interactive strategy: drive a headless browser over the profile listing.
//!
//! The listing shows a first page of rows and a "load more" control. The
//! strategy keeps triggering that control until the row count stops growing
//! (or a trigger cap is hit), then snapshots every visible row. Authors and
//! venue are read by fixed line position inside a row's text.

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use tracing::{debug, info, instrument, warn};

use pubsync_shared::{BrowserConfig, Profile, ProfileConfig, PubSyncError, RawRow, Result};

use crate::strategy::FetchStrategy;

const STRATEGY: &str = "interactive";

/// One publication row in the listing table.
pub const ROW_SELECTOR: &str = "tr.gsc_a_tr";
const TITLE_SELECTOR: &str = ".gsc_a_at";
const YEAR_SELECTOR: &str = ".gsc_a_y";
const CITATIONS_SELECTOR: &str = ".gsc_a_c";
const LOAD_MORE_ID: &str = "gsc_bpf_more";

const HIDE_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";
const TRIGGER_LOAD_MORE_JS: &str = "const btn = document.getElementById('gsc_bpf_more'); \
     btn.scrollIntoView(true); btn.click();";

// ---------------------------------------------------------------------------
// Row snapshots
// ---------------------------------------------------------------------------

/// Text captured from a single listing row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSnapshot {
    /// Title cell text.
    pub title: String,
    /// The row's full multi-line text.
    pub text: String,
    /// Year cell text, if the cell exists.
    pub year: Option<String>,
    /// Citation cell text, if the cell exists.
    pub citations: Option<String>,
}

impl RowSnapshot {
    /// Split the row into raw fields. Line 2 is the author list, line 3 the venue.
    pub fn into_raw_row(self) -> RawRow {
        let lines: Vec<&str> = self.text.lines().map(str::trim).collect();
        let line = |i: usize| lines.get(i).map(|l| (*l).to_string());

        RawRow {
            authors: line(1),
            venue: line(2),
            title: Some(self.title),
            year: self.year,
            url: None,
            citations: self.citations,
        }
    }
}

// ---------------------------------------------------------------------------
// Session trait
// ---------------------------------------------------------------------------

/// The browser operations the harvesting loop needs.
#[async_trait]
pub trait ListingSession: Send + Sync {
    /// Navigate to `url` and wait (at most `timeout`) for the first rows.
    async fn open(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Number of rows currently visible.
    async fn row_count(&self) -> Result<usize>;

    /// Whether the "load more" control is present, visible and enabled.
    async fn load_more_available(&self) -> Result<bool>;

    /// Activate the "load more" control once.
    async fn trigger_load_more(&self) -> Result<()>;

    /// Capture the row at `index` (0-based, listing order).
    async fn snapshot_row(&self, index: usize) -> Result<RowSnapshot>;
}

/// Expand the listing, then extract every row.
///
/// Failure to open the listing is a [`PubSyncError::Fetch`]. Pagination
/// errors stop pagination; a failing row is skipped.
pub async fn harvest<S>(session: &S, url: &str, config: &BrowserConfig) -> Result<Vec<RawRow>>
where
    S: ListingSession + ?Sized,
{
    session
        .open(url, Duration::from_secs(config.page_timeout_secs))
        .await?;

    let triggers = expand_listing(
        session,
        config.load_more_cap,
        Duration::from_millis(config.pace_ms),
    )
    .await;

    let total = session.row_count().await?;
    info!(total, triggers, "listing expanded");

    let row_pace = Duration::from_millis(config.row_pace_ms);
    let mut rows = Vec::with_capacity(total);

    for index in 0..total {
        if index > 0 {
            pause(row_pace).await;
        }

        match session.snapshot_row(index).await {
            Ok(snapshot) => rows.push(snapshot.into_raw_row()),
            Err(e) => {
                let err = PubSyncError::row(index, e.to_string());
                warn!(error = %err, "skipping row");
            }
        }
    }

    debug!(extracted = rows.len(), total, "row extraction finished");
    Ok(rows)
}

/// Trigger "load more" until the row count stops growing. Returns the trigger count.
async fn expand_listing<S>(session: &S, cap: u32, pace: Duration) -> u32
where
    S: ListingSession + ?Sized,
{
    let mut triggers = 0;

    while triggers < cap {
        pause(pace).await;

        match session.load_more_available().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("load-more control unavailable, listing complete");
                break;
            }
            Err(e) => {
                debug!(error = %e, "load-more control not found");
                break;
            }
        }

        let before = match session.row_count().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "could not count rows, stopping pagination");
                break;
            }
        };

        if let Err(e) = session.trigger_load_more().await {
            warn!(error = %e, "load-more trigger failed, stopping pagination");
            break;
        }
        triggers += 1;

        pause(pace).await;

        match session.row_count().await {
            Ok(after) if after > before => {
                debug!(before, after, triggers, "more rows loaded");
            }
            Ok(_) => {
                info!(triggers, "no new rows after load more, assuming all are visible");
                break;
            }
            Err(e) => {
                warn!(error = %e, "could not count rows, stopping pagination");
                break;
            }
        }
    }

    if triggers == cap {
        warn!(cap, "load-more trigger cap reached");
    }

    triggers
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ---------------------------------------------------------------------------
// WebDriver session
// ---------------------------------------------------------------------------

/// A [`ListingSession`] backed by a WebDriver browser session.
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Start a browser session on the configured WebDriver endpoint.
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--window-size=1920,1080".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            format!("--user-agent={}", config.user_agent),
        ];
        if config.headless {
            args.insert(0, "--headless".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({
                "args": args,
                "excludeSwitches": ["enable-automation"],
            }),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| {
                PubSyncError::fetch(
                    STRATEGY,
                    format!("could not start session at {}: {e}", config.webdriver_url),
                )
            })?;

        debug!(webdriver = %config.webdriver_url, "browser session started");
        Ok(Self { client })
    }

    /// End the browser session.
    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| PubSyncError::fetch(STRATEGY, format!("session close failed: {e}")))
    }
}

fn cmd_err(context: &str) -> impl FnOnce(fantoccini::error::CmdError) -> PubSyncError + '_ {
    move |e| PubSyncError::fetch(STRATEGY, format!("{context}: {e}"))
}

#[async_trait]
impl ListingSession for WebDriverSession {
    async fn open(&self, url: &str, timeout: Duration) -> Result<()> {
        info!(%url, "opening listing page");
        self.client.goto(url).await.map_err(cmd_err("navigation failed"))?;

        if let Err(e) = self.client.execute(HIDE_WEBDRIVER_JS, Vec::new()).await {
            debug!(error = %e, "could not mask webdriver flag");
        }

        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(ROW_SELECTOR))
            .await
            .map_err(cmd_err("timed out waiting for listing rows"))?;

        Ok(())
    }

    async fn row_count(&self) -> Result<usize> {
        let rows = self
            .client
            .find_all(Locator::Css(ROW_SELECTOR))
            .await
            .map_err(cmd_err("row lookup failed"))?;
        Ok(rows.len())
    }

    async fn load_more_available(&self) -> Result<bool> {
        let button = self
            .client
            .find(Locator::Id(LOAD_MORE_ID))
            .await
            .map_err(cmd_err("load-more lookup failed"))?;

        let displayed = button
            .is_displayed()
            .await
            .map_err(cmd_err("load-more visibility check failed"))?;
        let enabled = button
            .is_enabled()
            .await
            .map_err(cmd_err("load-more state check failed"))?;

        Ok(displayed && enabled)
    }

    async fn trigger_load_more(&self) -> Result<()> {
        self.client
            .execute(TRIGGER_LOAD_MORE_JS, Vec::new())
            .await
            .map_err(cmd_err("load-more click failed"))?;
        Ok(())
    }

    async fn snapshot_row(&self, index: usize) -> Result<RowSnapshot> {
        let rows = self
            .client
            .find_all(Locator::Css(ROW_SELECTOR))
            .await
            .map_err(cmd_err("row lookup failed"))?;
        let row = rows
            .get(index)
            .ok_or_else(|| PubSyncError::row(index, "row disappeared from listing"))?;

        let title = row
            .find(Locator::Css(TITLE_SELECTOR))
            .await
            .map_err(|e| PubSyncError::row(index, format!("no title cell: {e}")))?
            .text()
            .await
            .map_err(|e| PubSyncError::row(index, format!("title unreadable: {e}")))?;

        let text = row
            .text()
            .await
            .map_err(|e| PubSyncError::row(index, format!("row text unreadable: {e}")))?;

        let year = match row.find(Locator::Css(YEAR_SELECTOR)).await {
            Ok(cell) => cell.text().await.ok(),
            Err(_) => None,
        };
        let citations = match row.find(Locator::Css(CITATIONS_SELECTOR)).await {
            Ok(cell) => cell.text().await.ok(),
            Err(_) => None,
        };

        Ok(RowSnapshot {
            title: title.trim().to_string(),
            text,
            year,
            citations,
        })
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Scrapes the profile listing page through a WebDriver browser.
pub struct InteractiveStrategy {
    browser: BrowserConfig,
    profile: ProfileConfig,
}

impl InteractiveStrategy {
    pub fn new(browser: BrowserConfig, profile: ProfileConfig) -> Self {
        Self { browser, profile }
    }
}

#[async_trait]
impl FetchStrategy for InteractiveStrategy {
    fn name(&self) -> &str {
        STRATEGY
    }

    #[instrument(skip_all, fields(profile = %profile.id))]
    async fn fetch(&self, profile: &Profile) -> Result<Vec<RawRow>> {
        let url = self
            .profile
            .listing_url_for(&profile.id)
            .map_err(|e| PubSyncError::fetch(STRATEGY, e.to_string()))?;
        let session = WebDriverSession::connect(&self.browser).await?;

        let result = harvest(&session, url.as_str(), &self.browser).await;

        // The session is released whether or not harvesting succeeded.
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close browser session");
        }

        result
    }
}

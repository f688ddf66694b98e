//! Application configuration for pubsync.
//!
//! Config is looked up at `--config PATH`, then `./pubsync.toml`, then
//! `~/.pubsync/pubsync.toml`; missing files fall back to defaults.
//! Environment variables override file values, CLI flags override both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PubSyncError, Result};
use crate::types::Profile;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pubsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pubsync";

/// Environment variable overriding `[profile] id`.
pub const SCHOLAR_ID_ENV: &str = "SCHOLAR_ID";

/// Environment variable overriding `[profile] display_name`.
pub const AUTHOR_NAME_ENV: &str = "PUBSYNC_AUTHOR_NAME";

// ---------------------------------------------------------------------------
// Config structs (matching pubsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Whose publications to collect.
    #[serde(default)]
    pub profile: ProfileConfig,

    /// Strategy ordering.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Interactive (WebDriver) strategy settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Query-client strategy settings.
    #[serde(default)]
    pub query: QueryConfig,

    /// Destination documents, processed in order.
    #[serde(default = "default_documents")]
    pub documents: Vec<DocumentTarget>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: ProfileConfig::default(),
            fetch: FetchConfig::default(),
            browser: BrowserConfig::default(),
            query: QueryConfig::default(),
            documents: default_documents(),
        }
    }
}

/// `[profile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profile identifier embedded in the listing URL.
    #[serde(default = "default_profile_id")]
    pub id: String,

    /// Author display name for the query-client lookup.
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Listing URL template; `{id}` is replaced with the profile id.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            id: default_profile_id(),
            display_name: default_display_name(),
            listing_url: default_listing_url(),
        }
    }
}

impl ProfileConfig {
    /// The listing page URL for `id`. The id is percent-encoded before it is
    /// substituted into the template.
    pub fn listing_url_for(&self, id: &str) -> Result<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        let raw = self.listing_url.replace("{id}", &encoded);
        Url::parse(&raw)
            .map_err(|e| PubSyncError::config(format!("invalid listing URL '{raw}': {e}")))
    }
}

fn default_profile_id() -> String {
    "UY1UAKUAAAAJ".into()
}
fn default_display_name() -> String {
    "Sabur Baidya".into()
}
fn default_listing_url() -> String {
    "https://scholar.google.com/citations?user={id}&hl=en".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Strategy names in fallback order (`interactive`, `query`).
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }
}

fn default_strategies() -> Vec<String> {
    vec!["interactive".into(), "query".into()]
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver, geckodriver, selenium).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Seconds to wait for the first listing rows to appear.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Maximum number of "load more" triggers per session.
    #[serde(default = "default_load_more_cap")]
    pub load_more_cap: u32,

    /// Fixed delay around each "load more" trigger.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,

    /// Fixed delay between successive row extractions.
    #[serde(default = "default_row_pace_ms")]
    pub row_pace_ms: u64,

    /// User-Agent presented by the browser.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            page_timeout_secs: default_page_timeout(),
            load_more_cap: default_load_more_cap(),
            pace_ms: default_pace_ms(),
            row_pace_ms: default_row_pace_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_true() -> bool {
    true
}
fn default_page_timeout() -> u64 {
    15
}
fn default_load_more_cap() -> u32 {
    50
}
fn default_pace_ms() -> u64 {
    2000
}
fn default_row_pace_ms() -> u64 {
    250
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .into()
}

/// `[query]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Base URL of the Semantic Scholar Graph API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name of the env var holding an optional API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Fixed delay between successive metadata requests.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,

    /// HTTP request timeout.
    #[serde(default = "default_query_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on papers listed for the author.
    #[serde(default = "default_max_papers")]
    pub max_papers: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            pace_ms: default_pace_ms(),
            timeout_secs: default_query_timeout(),
            max_papers: default_max_papers(),
        }
    }
}

impl QueryConfig {
    /// The API key, if its env var is set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

fn default_api_base() -> String {
    "https://api.semanticscholar.org/graph/v1".into()
}
fn default_api_key_env() -> String {
    "SEMANTIC_SCHOLAR_API_KEY".into()
}
fn default_query_timeout() -> u64 {
    30
}
fn default_max_papers() -> u32 {
    500
}

/// How a destination document lays out its publication section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentLayout {
    /// "Journals & Conference Proceedings" ordered list.
    Proceedings,
    /// Abbreviated "recent highlights" unordered list.
    Highlights,
}

impl std::fmt::Display for DocumentLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proceedings => f.write_str("proceedings"),
            Self::Highlights => f.write_str("highlights"),
        }
    }
}

/// `[[documents]]` entry: one HTML file to rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTarget {
    /// Path to the HTML file, relative to the working directory.
    pub path: PathBuf,
    /// Section structure expected in the file.
    pub layout: DocumentLayout,
    /// Maximum number of entries to render (highlights default to 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Style-attribute signature identifying the highlights heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_style: Option<String>,
}

impl DocumentTarget {
    /// Entry cap for this document, if any.
    pub fn effective_limit(&self) -> Option<usize> {
        match (self.limit, self.layout) {
            (Some(limit), _) => Some(limit),
            (None, DocumentLayout::Highlights) => Some(3),
            (None, DocumentLayout::Proceedings) => None,
        }
    }
}

fn default_documents() -> Vec<DocumentTarget> {
    vec![
        DocumentTarget {
            path: PathBuf::from("publication.html"),
            layout: DocumentLayout::Proceedings,
            limit: None,
            anchor_style: None,
        },
        DocumentTarget {
            path: PathBuf::from("aimslab.html"),
            layout: DocumentLayout::Highlights,
            limit: Some(3),
            anchor_style: None,
        },
    ]
}

impl AppConfig {
    /// The profile to fetch, after overrides.
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.profile.id.clone(),
            display_name: self.profile.display_name.clone(),
        }
    }

    /// Apply `SCHOLAR_ID` / `PUBSYNC_AUTHOR_NAME` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup(SCHOLAR_ID_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%id, "profile id overridden from environment");
            self.profile.id = id.trim().to_string();
        }
        if let Some(name) = lookup(AUTHOR_NAME_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%name, "author name overridden from environment");
            self.profile.display_name = name.trim().to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pubsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PubSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.pubsync/pubsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the user config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PubSyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PubSyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Resolve the effective config: explicit path, then `./pubsync.toml`, then the
/// user config, with environment overrides applied last.
pub fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut config = match explicit {
        Some(path) => load_config_from(path)?,
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                load_config_from(&local)?
            } else {
                load_config()?
            }
        }
    };

    config.apply_env_overrides();

    if config.documents.is_empty() {
        return Err(PubSyncError::config("no [[documents]] configured"));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PubSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PubSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PubSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

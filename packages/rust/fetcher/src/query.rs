//! Query-client strategy backed by the Semantic Scholar Graph API.
//!
//! Looks the author up by display name, takes the first match, lists the
//! author's papers and then requests full metadata for each paper, pausing a
//! fixed delay between metadata requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use pubsync_shared::{Profile, PubSyncError, QueryConfig, RawRow, Result};

use crate::strategy::FetchStrategy;

const STRATEGY: &str = "query";

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("pubsync/", env!("CARGO_PKG_VERSION"));

/// Fields requested for each paper's full metadata.
const PAPER_FIELDS: &str = "title,authors,venue,year,url,citationCount,openAccessPdf";

/// Largest page the paper listing endpoint serves.
const PAGE_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// API response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    /// Offset of the following page; absent on the last page.
    #[serde(default)]
    next: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorHit {
    author_id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperRef {
    paper_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperDetail {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<PaperAuthor>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    citation_count: Option<u32>,
    #[serde(default)]
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct PaperAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

impl PaperDetail {
    fn into_raw_row(self) -> RawRow {
        let authors: Vec<String> = self.authors.into_iter().filter_map(|a| a.name).collect();
        let url = self
            .open_access_pdf
            .and_then(|pdf| pdf.url)
            .filter(|u| !u.is_empty())
            .or(self.url);

        RawRow {
            title: self.title,
            authors: (!authors.is_empty()).then(|| authors.join(", ")),
            venue: self.venue,
            year: self.year.map(|y| y.to_string()),
            url,
            citations: self.citation_count.map(|c| c.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Fetches a profile's publications through a structured metadata API.
pub struct QueryClientStrategy {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    pace: Duration,
    max_papers: u32,
}

impl QueryClientStrategy {
    /// Build the client from `[query]` settings.
    pub fn new(config: &QueryConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PubSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            pace: Duration::from_millis(config.pace_ms),
            max_papers: config.max_papers,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.api_base);
        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PubSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PubSyncError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| PubSyncError::Network(format!("{url}: invalid response body: {e}")))
    }

    async fn find_author(&self, name: &str) -> Result<Option<AuthorHit>> {
        let page: Page<AuthorHit> = self
            .get_json(
                "/author/search",
                &[
                    ("query", name.to_string()),
                    ("fields", "name".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(page.data.into_iter().next())
    }

    /// Follow the listing's `next` offsets until it ends or `max_papers` is reached.
    async fn list_papers(&self, author_id: &str) -> Result<Vec<PaperRef>> {
        let path = format!("/author/{author_id}/papers");
        let max = self.max_papers as usize;
        let mut papers = Vec::new();
        let mut offset = 0;

        loop {
            let remaining = max - papers.len();
            let page: Page<PaperRef> = self
                .get_json(
                    &path,
                    &[
                        ("fields", "paperId".to_string()),
                        ("offset", offset.to_string()),
                        ("limit", remaining.min(PAGE_LIMIT).to_string()),
                    ],
                )
                .await?;

            let fetched = page.data.len();
            papers.extend(page.data);

            match page.next {
                Some(next) if fetched > 0 && papers.len() < max => offset = next,
                Some(_) if papers.len() >= max => {
                    warn!(max_papers = max, "paper listing truncated at the configured cap");
                    break;
                }
                _ => break,
            }
        }

        papers.truncate(max);
        Ok(papers)
    }

    async fn paper_detail(&self, paper_id: &str) -> Result<PaperDetail> {
        self.get_json(
            &format!("/paper/{paper_id}"),
            &[("fields", PAPER_FIELDS.to_string())],
        )
        .await
    }
}

#[async_trait]
impl FetchStrategy for QueryClientStrategy {
    fn name(&self) -> &str {
        STRATEGY
    }

    #[instrument(skip_all, fields(author = %profile.display_name))]
    async fn fetch(&self, profile: &Profile) -> Result<Vec<RawRow>> {
        let author = self
            .find_author(&profile.display_name)
            .await
            .map_err(|e| PubSyncError::fetch(STRATEGY, format!("author lookup failed: {e}")))?;

        let Some(author) = author else {
            info!("no matching author found");
            return Ok(Vec::new());
        };

        info!(
            author_id = %author.author_id,
            name = author.name.as_deref().unwrap_or(""),
            "author matched"
        );

        let papers = self
            .list_papers(&author.author_id)
            .await
            .map_err(|e| PubSyncError::fetch(STRATEGY, format!("paper listing failed: {e}")))?;

        let total = papers.len();
        let mut rows = Vec::with_capacity(total);

        for (index, paper) in papers.iter().enumerate() {
            if index > 0 && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }

            match self.paper_detail(&paper.paper_id).await {
                Ok(detail) => {
                    debug!(index, total, paper_id = %paper.paper_id, "paper metadata fetched");
                    rows.push(detail.into_raw_row());
                }
                Err(e) => {
                    let err = PubSyncError::row(index, e.to_string());
                    warn!(paper_id = %paper.paper_id, error = %err, "skipping paper");
                }
            }
        }

        Ok(rows)
    }
}

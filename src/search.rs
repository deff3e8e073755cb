//! News search API client.
//!
//! The module uses a trait-based design so the harvester can be driven by a
//! stub in tests:
//! - [`NewsSearch`]: one paginated search request
//! - [`NaverSearchClient`]: the HTTP implementation against the Naver Open API
//!
//! The client never retries on its own. Every failure is returned as a
//! [`SearchError`] and the caller decides how to recover.

use crate::config::Credentials;
use crate::models::SearchResponse;
use clap::ValueEnum;
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Naver news search endpoint.
pub const NAVER_NEWS_URL: &str = "https://openapi.naver.com/v1/search/news.json";

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: usize = 100;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Result ordering supported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Date,
    /// Relevance.
    Sim,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Date => "date",
            SortOrder::Sim => "sim",
        }
    }
}

/// Parameters of a single page request.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Page size (`display`), at most [`MAX_PAGE_SIZE`].
    pub display: usize,
    /// 1-based offset of the first result.
    pub start: usize,
    pub sort: SortOrder,
}

/// A failed search call. Always safe to retry.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search API returned HTTP {status}")]
    Status { status: u16 },
}

/// Trait for issuing one page request against a news search API.
pub trait NewsSearch {
    async fn search(&self, request: &SearchRequest<'_>) -> Result<SearchResponse, SearchError>;
}

/// HTTP client for the Naver news search API.
#[derive(Debug, Clone)]
pub struct NaverSearchClient {
    http: Client,
    endpoint: String,
    credentials: Credentials,
}

impl NaverSearchClient {
    /// Build a client for the public Naver news endpoint.
    ///
    /// # Arguments
    ///
    /// * `credentials` - Client id and secret sent as request headers
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Transport`] if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self, SearchError> {
        Self::with_endpoint(credentials, NAVER_NEWS_URL)
    }

    /// Build a client against a different endpoint (e.g. a local mock).
    pub fn with_endpoint(credentials: Credentials, endpoint: &str) -> Result<Self, SearchError> {
        let http = Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            credentials,
        })
    }
}

impl NewsSearch for NaverSearchClient {
    #[instrument(level = "info", skip_all, fields(query = %request.query, start = request.start, display = request.display))]
    async fn search(&self, request: &SearchRequest<'_>) -> Result<SearchResponse, SearchError> {
        let t0 = Instant::now();
        let display = request.display.to_string();
        let start = request.start.to_string();

        let resp = self
            .http
            .get(&self.endpoint)
            .header("X-Naver-Client-Id", &self.credentials.client_id)
            .header("X-Naver-Client-Secret", &self.credentials.client_secret)
            .query(&[
                ("query", request.query),
                ("display", display.as_str()),
                ("start", start.as_str()),
                ("sort", request.sort.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Search API returned an error status");
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }

        let page: SearchResponse = resp.json().await?;
        debug!(
            items = page.items.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Search page received"
        );
        Ok(page)
    }
}

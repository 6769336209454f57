// GitHub trending page client - scrapes the HTML listing since there's no API for it
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parse::{parse_trending_page, ParsedPage, TrendingEntry};
use crate::retry::{is_retryable_status, with_retry, RetryConfig, RetryExhausted, Transient};

const GITHUB_WEB_BASE: &str = "https://github.com";

// The listing renders differently (or not at all) for obvious bots
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Listing periods the trending page understands
pub const SUPPORTED_SINCE: [&str; 3] = ["daily", "weekly", "monthly"];

/// A single failed attempt at getting the listing
#[derive(Error, Debug)]
pub enum TrendingError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Trending page returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Trending page looked malformed: {0}")]
    MalformedPage(String),

    #[error("Invalid trending request: {0}")]
    InvalidRequest(String),
}

impl Transient for TrendingError {
    fn is_transient(&self) -> bool {
        match self {
            TrendingError::NetworkError(e) => !e.is_builder(),
            TrendingError::Status(status) => is_retryable_status(*status),
            TrendingError::MalformedPage(_) => true,
            TrendingError::InvalidRequest(_) => false,
        }
    }
}

/// The fetch gave up - either out of attempts or hit something not worth retrying
#[derive(Error, Debug)]
#[error("Failed to fetch trending listing after {attempts} attempt(s): {source}")]
pub struct FetchError {
    pub attempts: u32,
    #[source]
    pub source: TrendingError,
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        self.source.is_transient()
    }
}

impl From<RetryExhausted<TrendingError>> for FetchError {
    fn from(exhausted: RetryExhausted<TrendingError>) -> Self {
        Self {
            attempts: exhausted.attempts,
            source: exhausted.error,
        }
    }
}

pub struct TrendingClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl TrendingClient {
    pub fn new() -> Result<Self, TrendingError> {
        Self::with_base_url(GITHUB_WEB_BASE.to_string())
    }

    /// Point the client somewhere else (mirrors, mock servers in tests)
    pub fn with_base_url(base_url: String) -> Result<Self, TrendingError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(BROWSER_USER_AGENT),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Swap in a custom retry policy
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Build `<base>/trending[/<language>]?since=<period>`
    pub fn listing_url(&self, since: &str, language: Option<&str>) -> Result<String, TrendingError> {
        if !SUPPORTED_SINCE.contains(&since) {
            return Err(TrendingError::InvalidRequest(format!(
                "unsupported period '{}'",
                since
            )));
        }

        let mut url = format!("{}/trending", self.base_url);

        if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
            if lang.contains('/') {
                return Err(TrendingError::InvalidRequest(format!(
                    "language '{}' contains a path separator",
                    lang
                )));
            }
            url.push('/');
            url.push_str(&urlencoding::encode(&lang.to_lowercase()));
        }

        url.push_str("?since=");
        url.push_str(since);
        Ok(url)
    }

    /// Fetch and parse one listing variant, truncated to `limit` distinct entries
    ///
    /// Identities compare case-insensitively; the first occurrence wins.
    ///
    /// Transient failures (network, 5xx/429/408, empty or unrecognisable
    /// pages) go through the retry policy; anything else fails right away.
    pub async fn fetch_listing(
        &self,
        since: &str,
        language: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TrendingEntry>, FetchError> {
        let url = self
            .listing_url(since, language)
            .map_err(|source| FetchError { attempts: 0, source })?;

        info!("Fetching trending listing: {}", url);

        let entries = with_retry(&self.retry_config, || self.fetch_once(&url)).await?;

        // Duplicates go first so they can't eat into the limit
        let mut seen = HashSet::new();
        let mut entries: Vec<TrendingEntry> = entries
            .into_iter()
            .filter(|entry| {
                let fresh = seen.insert(entry.full_name().to_lowercase());
                if !fresh {
                    debug!("Skipping duplicate listing entry {}", entry.full_name());
                }
                fresh
            })
            .collect();
        entries.truncate(limit);
        debug!("Trending listing yielded {} entries", entries.len());
        Ok(entries)
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<TrendingEntry>, TrendingError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendingError::Status(status));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(TrendingError::MalformedPage("empty body".into()));
        }

        match parse_trending_page(&body) {
            ParsedPage::Entries(entries) => Ok(entries),
            ParsedPage::NothingTrending => {
                warn!("Trending page reports nothing trending for {}", url);
                Ok(Vec::new())
            }
            ParsedPage::Unrecognized => Err(TrendingError::MalformedPage(
                "no trending entries or empty-state marker found".into(),
            )),
        }
    }
}

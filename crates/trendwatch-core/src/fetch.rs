// Fetch stage - trending listing in, ordered candidates out
use tracing::info;
use trendwatch_api::{RetryConfig, TrendingClient, TrendingError};

use crate::config::Config;
use crate::models::{Candidate, TrendingPeriod};
use crate::{Error, Result};

/// Wraps the trending client and maps raw entries onto candidates
pub struct TrendingFetcher {
    client: TrendingClient,
}

impl TrendingFetcher {
    pub fn new(client: TrendingClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = TrendingClient::with_base_url(config.trending.base_url.clone())
            .map_err(|e: TrendingError| {
                Error::ConfigError(format!("HTTP client setup failed: {}", e))
            })?
            .with_retry_config(RetryConfig::from(&config.retry));
        Ok(Self::new(client))
    }

    /// Candidates in the listing's display order, at most `limit` of them
    ///
    /// An empty `language` means all languages. Repeated identities keep their
    /// first position and don't count toward `limit`.
    pub async fn fetch(
        &self,
        period: TrendingPeriod,
        language: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let language = Some(language.trim()).filter(|l| !l.is_empty());

        let entries = self
            .client
            .fetch_listing(period.as_since(), language, limit)
            .await?;

        let candidates: Vec<Candidate> = entries.into_iter().map(Candidate::from).collect();

        info!(
            "Fetched {} candidates ({}, {})",
            candidates.len(),
            period.display_name(),
            language.unwrap_or("all languages")
        );
        Ok(candidates)
    }
}

// One pipeline run: fetch -> enrich -> classify -> rank
use chrono::{NaiveDate, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use trendwatch_store::NoveltyStore;

use crate::config::Config;
use crate::enrich::EnrichmentCoordinator;
use crate::fetch::TrendingFetcher;
use crate::models::{Candidate, Novelty, TrendingPeriod, TrendingReport};
use crate::providers::GitHubMetadataSource;
use crate::rank::{rank, RankingWeights};
use crate::{Error, Result};

/// What to fetch this time - CLI flags can override the config file
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub period: TrendingPeriod,
    /// Empty means all languages
    pub language: String,
    pub limit: usize,
    /// Classify against history without recording anything
    pub dry_run: bool,
}

impl RunRequest {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            period: config.trending.period()?,
            language: config.trending.language.clone(),
            limit: config.trending.limit,
            dry_run: false,
        })
    }

    fn language_filter(&self) -> Option<String> {
        Some(self.language.trim())
            .filter(|l| !l.is_empty())
            .map(String::from)
    }
}

/// Knobs that stay fixed for the life of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub lookback_days: u32,
    pub concurrency: usize,
    pub weights: RankingWeights,
    /// Wall clock allowed for fetch + enrichment together
    pub budget: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            lookback_days: config.novelty.lookback_days,
            concurrency: config.enrichment.concurrency,
            weights: config.ranking,
            budget: Duration::from_secs(config.run.budget_secs),
        }
    }
}

pub struct Pipeline {
    fetcher: TrendingFetcher,
    coordinator: EnrichmentCoordinator,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        fetcher: TrendingFetcher,
        coordinator: EnrichmentCoordinator,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            coordinator,
            settings,
        }
    }

    /// Wire everything up from a validated config
    ///
    /// The metadata source is picked here, once. No token means enrichment is off.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = TrendingFetcher::from_config(config)?;
        let coordinator = match GitHubMetadataSource::from_config(&config.enrichment)? {
            Some(source) => EnrichmentCoordinator::new(source, config.enrichment.timeout()),
            None => EnrichmentCoordinator::disabled(),
        };

        Ok(Self::new(fetcher, coordinator, PipelineSettings::from(config)))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the whole thing once for `today`
    ///
    /// An empty listing gives an empty report, not an error. Fetch, storage
    /// and budget failures abort before anything is written for `today`.
    pub async fn run(
        &self,
        store: &NoveltyStore,
        request: &RunRequest,
        today: NaiveDate,
    ) -> Result<TrendingReport> {
        let deadline = Instant::now() + self.settings.budget;
        let language = request.language_filter();

        info!(
            "Starting run for {} ({}, limit {}{})",
            today,
            request.period,
            request.limit,
            if request.dry_run { ", dry run" } else { "" }
        );

        let candidates = tokio::time::timeout_at(
            deadline,
            self.fetcher
                .fetch(request.period, &request.language, request.limit),
        )
        .await
        .map_err(|_| self.budget_exceeded("fetch"))??;

        if candidates.is_empty() {
            info!("Listing was empty; nothing to classify");
            return Ok(TrendingReport {
                generated_at: Utc::now(),
                period: request.period,
                language,
                total_fetched: 0,
                new_count: 0,
                entries: Vec::new(),
            });
        }

        let candidates = tokio::time::timeout_at(
            deadline,
            self.coordinator
                .enrich(candidates, self.settings.concurrency),
        )
        .await
        .map_err(|_| self.budget_exceeded("enrichment"))?;

        let total_fetched = candidates.len();
        let classified = self
            .classify(store, candidates, today, request.dry_run)
            .await?;
        let new_count = classified.iter().filter(|(_, n)| n.is_new()).count();

        let entries = rank(classified, &self.settings.weights);
        info!(
            "Run complete: {} candidates, {} new",
            total_fetched, new_count
        );

        Ok(TrendingReport {
            generated_at: Utc::now(),
            period: request.period,
            language,
            total_fetched,
            new_count,
            entries,
        })
    }

    /// SQLite work runs on the blocking pool; the session lives and dies there
    async fn classify(
        &self,
        store: &NoveltyStore,
        candidates: Vec<Candidate>,
        today: NaiveDate,
        dry_run: bool,
    ) -> Result<Vec<(Candidate, Novelty)>> {
        let store = store.clone();
        let lookback = self.settings.lookback_days;

        tokio::task::spawn_blocking(move || {
            classify_blocking(&store, candidates, today, lookback, dry_run)
        })
        .await
        .map_err(|e| Error::TaskFailed(format!("novelty classification: {}", e)))?
    }

    fn budget_exceeded(&self, stage: &'static str) -> Error {
        Error::BudgetExceeded {
            stage,
            budget: self.settings.budget,
        }
    }
}

/// Session is scoped to this call; it's released on every exit path
fn classify_blocking(
    store: &NoveltyStore,
    candidates: Vec<Candidate>,
    today: NaiveDate,
    lookback: u32,
    dry_run: bool,
) -> Result<Vec<(Candidate, Novelty)>> {
    let session = store.session()?;

    let verdicts = if dry_run {
        debug!("Dry run: reading history without recording");
        candidates
            .iter()
            .map(|c| session.peek(&c.id.full_name(), today, lookback))
            .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        let names: Vec<String> = candidates.iter().map(|c| c.id.full_name()).collect();
        session.classify_batch(&names, today, lookback)?
    };

    Ok(candidates.into_iter().zip(verdicts).collect())
}

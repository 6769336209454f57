use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use trendwatch_api::RetryConfig;

use crate::models::TrendingPeriod;
use crate::rank::RankingWeights;
use crate::{Error, Result};

/// Main configuration structure
///
/// This gets loaded from config file, env vars, and CLI args.
/// Priority: CLI > Env > File > Defaults (like a sensible person would do)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub trending: TrendingConfig,
    #[serde(default)]
    pub novelty: NoveltyConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub ranking: RankingWeights,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from an explicit path; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)
                .map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Environment beats the file for secrets
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                self.enrichment.token = Some(token);
            }
        }
    }

    /// Save config to disk
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::ConfigError("Could not find config directory".into()))?
            .join("trendwatch");

        Ok(config_dir.join("config.toml"))
    }

    /// Reject anything the pipeline can't run with. Called before a run starts.
    pub fn validate(&self) -> Result<()> {
        self.trending.period()?;

        if self.trending.limit == 0 {
            return Err(Error::ConfigError("trending.limit must be at least 1".into()));
        }
        if self.enrichment.concurrency == 0 {
            return Err(Error::ConfigError(
                "enrichment.concurrency must be at least 1".into(),
            ));
        }
        if self.enrichment.timeout_secs == 0 {
            return Err(Error::ConfigError(
                "enrichment.timeout_secs must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::ConfigError("retry.max_attempts must be at least 1".into()));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::ConfigError(
                "retry.backoff_multiplier must be >= 1.0".into(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(Error::ConfigError(
                "retry.max_delay_ms must not be below retry.initial_delay_ms".into(),
            ));
        }
        if self.run.budget_secs == 0 {
            return Err(Error::ConfigError("run.budget_secs must be at least 1".into()));
        }

        self.ranking.validate()
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.novelty.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| Error::ConfigError("Could not find data directory".into()))?
                .join("trendwatch")
                .join("history.db")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingConfig {
    /// daily, weekly or monthly
    #[serde(default = "default_period")]
    pub period: String,

    /// Empty means all languages
    #[serde(default)]
    pub language: String,

    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Where the trending page lives
    #[serde(default = "default_trending_url")]
    pub base_url: String,
}

impl TrendingConfig {
    pub fn period(&self) -> Result<TrendingPeriod> {
        self.period.parse()
    }

    pub fn language_filter(&self) -> Option<&str> {
        let lang = self.language.trim();
        if lang.is_empty() {
            None
        } else {
            Some(lang)
        }
    }
}

fn default_period() -> String {
    "daily".to_string()
}

fn default_limit() -> usize {
    25
}

fn default_trending_url() -> String {
    "https://github.com".to_string()
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            language: String::new(),
            limit: default_limit(),
            base_url: default_trending_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoveltyConfig {
    /// A repo seen within this many days is RECURRING
    #[serde(default = "default_lookback")]
    pub lookback_days: u32,

    /// History database; defaults to the platform data dir
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// `trendwatch prune` drops observations older than this
    #[serde(default = "default_retention")]
    pub retention_days: u32,
}

fn default_lookback() -> u32 {
    3
}

fn default_retention() -> u32 {
    90 // a quarter of history is plenty for a 3-day window
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback(),
            db_path: None,
            retention_days: default_retention(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentConfig {
    /// GitHub personal access token
    /// Get one at https://github.com/settings/tokens
    /// No token means no enrichment - the run still works
    #[serde(default)]
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub api_url: String,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-candidate timeout
    #[serde(default = "default_enrich_timeout")]
    pub timeout_secs: u64,
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

fn default_concurrency() -> usize {
    5
}

fn default_enrich_timeout() -> u64 {
    10
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_url(),
            concurrency: default_concurrency(),
            timeout_secs: default_enrich_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_multiplier(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts,
            initial_delay_ms: settings.initial_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            backoff_multiplier: settings.backoff_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Wall-clock budget for fetch + enrichment
    #[serde(default = "default_budget")]
    pub budget_secs: u64,
}

fn default_budget() -> u64 {
    300
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            budget_secs: default_budget(),
        }
    }
}

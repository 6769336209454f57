use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use trendwatch_api::TrendingEntry;

pub use trendwatch_store::Novelty;

/// owner/name pair - compares case-insensitively, displays as scraped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse "owner/name"; anything else is rejected
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Lowercased form used for equality, ordering and storage
    pub fn key(&self) -> String {
        self.full_name().to_lowercase()
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl PartialEq for RepoId {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RepoId {}

impl Hash for RepoId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for RepoId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RepoId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// What happened when we asked the metadata source about a candidate
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    #[default]
    NotAttempted,
    Succeeded,
    Failed,
}

/// One trending entry, before or after enrichment
///
/// Counts default to zero when the listing didn't show them; timestamps only
/// ever come from enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: RepoId,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    /// Stars gained during the listing period
    pub stars_gained: u64,
    pub open_issues: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub enrichment: EnrichmentStatus,
}

impl Candidate {
    pub fn new(id: RepoId) -> Self {
        Self {
            id,
            description: None,
            language: None,
            stars: 0,
            forks: 0,
            stars_gained: 0,
            open_issues: None,
            created_at: None,
            pushed_at: None,
            enrichment: EnrichmentStatus::NotAttempted,
        }
    }

    /// Merge what the metadata source told us
    pub fn apply_metadata(&mut self, meta: RepoMetadata) {
        self.stars = meta.stars;
        self.forks = meta.forks;
        self.open_issues = Some(meta.open_issues);
        self.created_at = meta.created_at;
        self.pushed_at = meta.pushed_at;
        if self.description.is_none() {
            self.description = meta.description;
        }
        if self.language.is_none() {
            self.language = meta.language;
        }
        self.enrichment = EnrichmentStatus::Succeeded;
    }
}

impl From<TrendingEntry> for Candidate {
    fn from(entry: TrendingEntry) -> Self {
        let mut candidate = Self::new(RepoId::new(entry.owner, entry.name));
        candidate.description = entry.description;
        candidate.language = entry.language;
        candidate.stars = entry.stars.unwrap_or(0);
        candidate.forks = entry.forks.unwrap_or(0);
        candidate.stars_gained = entry.stars_gained.unwrap_or(0);
        candidate
    }
}

/// Canonical numbers from the secondary metadata source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RepoMetadata {
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub language: Option<String>,
}

/// Time range for trending repositories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl TrendingPeriod {
    /// Value of the listing's `since` query parameter
    pub fn as_since(&self) -> &'static str {
        match self {
            TrendingPeriod::Daily => "daily",
            TrendingPeriod::Weekly => "weekly",
            TrendingPeriod::Monthly => "monthly",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            TrendingPeriod::Daily => "Today",
            TrendingPeriod::Weekly => "This Week",
            TrendingPeriod::Monthly => "This Month",
        }
    }
}

impl std::str::FromStr for TrendingPeriod {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(TrendingPeriod::Daily),
            "weekly" => Ok(TrendingPeriod::Weekly),
            "monthly" => Ok(TrendingPeriod::Monthly),
            other => Err(crate::Error::ConfigError(format!(
                "Unknown trending period '{}' (expected daily, weekly or monthly)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TrendingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_since())
    }
}

/// A scored candidate with its final position (1-based)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedEntry {
    pub candidate: Candidate,
    pub novelty: Novelty,
    pub novelty_score: f64,
    pub importance_score: f64,
    pub trending_score: f64,
    pub composite_score: f64,
    pub rank: usize,
}

/// Everything one run hands to the summary/notification side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingReport {
    pub generated_at: DateTime<Utc>,
    pub period: TrendingPeriod,
    pub language: Option<String>,
    pub total_fetched: usize,
    pub new_count: usize,
    pub entries: Vec<RankedEntry>,
}

impl TrendingReport {
    /// Only the entries that were classified NEW, still in rank order
    pub fn new_entries(&self) -> impl Iterator<Item = &RankedEntry> {
        self.entries.iter().filter(|e| e.novelty.is_new())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

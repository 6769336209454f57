// Core business logic lives here - the brain of the operation
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod fetch;
pub mod handoff;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod rank;

pub use config::Config;
pub use enrich::{EnrichmentCoordinator, MetadataSource};
pub use error::Error;
pub use export::{ExportFormat, Exporter};
pub use fetch::TrendingFetcher;
pub use handoff::{hand_off, FallbackSummarizer, Notifier, Summarizer};
pub use models::{
    Candidate, EnrichmentStatus, Novelty, RankedEntry, RepoId, RepoMetadata, TrendingPeriod,
    TrendingReport,
};
pub use pipeline::{Pipeline, PipelineSettings, RunRequest};
pub use providers::GitHubMetadataSource;
pub use rank::{rank, RankingWeights};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;
use trendwatch_api::FetchError;
use trendwatch_store::StoreError;

/// All the ways a run can go wrong
///
/// `Fetch`, `NoveltyStore` and `BudgetExceeded` end the run. The metadata
/// variants (`ApiError`, `NotFound`, `RateLimitExceeded`, `AuthError`) only ever
/// describe a single candidate's enrichment and get absorbed by the coordinator.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Novelty store failed: {0}")]
    NoveltyStore(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Run exceeded its {budget:?} budget during {stage}")]
    BudgetExceeded {
        stage: &'static str,
        budget: std::time::Duration,
    },

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Whether this error should stop the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Fetch(_)
                | Error::NoveltyStore(_)
                | Error::ConfigError(_)
                | Error::BudgetExceeded { .. }
                | Error::TaskFailed(_)
        )
    }
}

// Enrichment coordinator - bounded fan-out to the metadata source
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::models::{Candidate, EnrichmentStatus, RepoId, RepoMetadata};
use crate::Result;

/// Trait for metadata sources - makes testing easier and keeps things flexible
///
/// Each backend (GitHub today) implements this. The coordinator only ever
/// sees the trait, so swapping the backend is a config decision.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    async fn repository(&self, id: &RepoId) -> Result<RepoMetadata>;
}

/// Fans candidates out to a metadata source, one task per candidate
///
/// Output count and order always match the input. A candidate whose call
/// fails, times out or panics is marked `Failed` and otherwise left alone.
/// Dropping the `enrich` future cancels every call still queued or in flight.
pub struct EnrichmentCoordinator {
    source: Option<Arc<dyn MetadataSource>>,
    timeout: Duration,
}

impl EnrichmentCoordinator {
    pub fn new(source: Arc<dyn MetadataSource>, timeout: Duration) -> Self {
        Self {
            source: Some(source),
            timeout,
        }
    }

    /// No source configured - every candidate passes through untouched
    pub fn disabled() -> Self {
        Self {
            source: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    pub async fn enrich(&self, mut candidates: Vec<Candidate>, concurrency: usize) -> Vec<Candidate> {
        let Some(source) = self.source.clone() else {
            debug!("Enrichment disabled; passing {} candidates through", candidates.len());
            for candidate in &mut candidates {
                candidate.enrichment = EnrichmentStatus::NotAttempted;
            }
            return candidates;
        };

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        // Dropping the set aborts every worker, so a caller that gives up
        // (run budget) stops queued calls from going out
        let mut workers = JoinSet::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let id = candidate.id.clone();
            let source = Arc::clone(&source);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.timeout;

            workers.spawn(async move {
                // The semaphore is never closed, so acquire can't fail here
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                let outcome = match tokio::time::timeout(timeout, source.repository(&id)).await {
                    Ok(Ok(meta)) => Some(meta),
                    Ok(Err(e)) => {
                        warn!("Enrichment failed for {}: {}", id, e);
                        None
                    }
                    Err(_) => {
                        warn!("Enrichment timed out for {} after {:?}", id, timeout);
                        None
                    }
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<RepoMetadata>> = (0..candidates.len()).map(|_| None).collect();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = outcome,
                // A panicked worker leaves its slot empty, which reads as Failed
                Err(e) => warn!("Enrichment task panicked: {}", e),
            }
        }

        // Write back by index so completion order can't shuffle anything
        let mut succeeded = 0usize;
        for (candidate, outcome) in candidates.iter_mut().zip(outcomes) {
            match outcome {
                Some(meta) => {
                    candidate.apply_metadata(meta);
                    succeeded += 1;
                }
                None => candidate.enrichment = EnrichmentStatus::Failed,
            }
        }

        info!(
            "Enriched {}/{} candidates",
            succeeded,
            candidates.len()
        );
        candidates
    }
}

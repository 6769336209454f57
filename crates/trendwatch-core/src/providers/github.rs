// GitHub metadata source - bridges the API client with the MetadataSource trait
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use trendwatch_api::{GitHubClient, GitHubError, GitHubRepo};

use crate::{
    config::EnrichmentConfig,
    enrich::MetadataSource,
    models::{RepoId, RepoMetadata},
    Error, Result,
};

/// Wrapper around GitHubClient that implements MetadataSource
pub struct GitHubMetadataSource {
    client: GitHubClient,
}

impl GitHubMetadataSource {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    /// Build from config - `None` when no token is configured, which turns
    /// enrichment off instead of burning the anonymous rate limit
    pub fn from_config(config: &EnrichmentConfig) -> Result<Option<Arc<dyn MetadataSource>>> {
        let Some(token) = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            debug!("No GitHub token configured; enrichment disabled");
            return Ok(None);
        };

        let client = GitHubClient::with_base_url(token.to_string(), config.api_url.clone())
            .map_err(|e| Error::ConfigError(format!("GitHub client setup failed: {}", e)))?;
        Ok(Some(Arc::new(Self::new(client))))
    }
}

#[async_trait]
impl MetadataSource for GitHubMetadataSource {
    async fn repository(&self, id: &RepoId) -> Result<RepoMetadata> {
        let repo = self
            .client
            .get_repository(id.owner(), id.name())
            .await
            .map_err(map_error)?;

        Ok(github_to_metadata(repo))
    }
}

fn map_error(err: GitHubError) -> Error {
    match err {
        GitHubError::NotFound(name) => Error::NotFound(name),
        GitHubError::RateLimitExceeded => Error::RateLimitExceeded,
        GitHubError::AuthRequired => Error::AuthError("GitHub rejected the token".into()),
        other => Error::ApiError(other.to_string()),
    }
}

/// Convert GitHub API repo to our internal metadata model
fn github_to_metadata(gh: GitHubRepo) -> RepoMetadata {
    RepoMetadata {
        stars: gh.stargazers_count,
        forks: gh.forks_count,
        open_issues: gh.open_issues_count,
        created_at: gh.created_at,
        pushed_at: gh.pushed_at,
        description: gh.description,
        language: gh.language,
    }
}

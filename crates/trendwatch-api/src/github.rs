// GitHub REST client - just enough of the repos endpoint to enrich trending entries
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl GitHubClient {
    /// The repos endpoint works anonymously, but the rate limit makes that useless
    /// for a batch, so a token is mandatory here.
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// For GitHub Enterprise or a mock server
    pub fn with_base_url(token: String, base_url: String) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("trendwatch/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get a specific repository by owner and name - one attempt, no retries
    pub async fn get_repository(&self, owner: &str, name: &str) -> Result<GitHubRepo> {
        let url = format!(
            "{}/repos/{}/{}",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(name)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound(format!("{}/{}", owner, name)));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GitHubError::AuthRequired);
        }

        // GitHub signals primary rate limits with a 403 and a zeroed counter
        let remaining_zero = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || (status == reqwest::StatusCode::FORBIDDEN && remaining_zero)
        {
            return Err(GitHubError::RateLimitExceeded);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::RequestFailed(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let repo: GitHubRepo = serde_json::from_str(&body)?;
        Ok(repo)
    }
}

/// The subset of `GET /repos/{owner}/{repo}` we care about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_repository_sends_token_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/tokio-rs/tokio"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "full_name": "tokio-rs/tokio",
                "description": "A runtime for writing reliable asynchronous applications",
                "language": "Rust",
                "stargazers_count": 27000,
                "forks_count": 2500,
                "open_issues_count": 300,
                "created_at": "2016-09-09T21:03:41Z",
                "pushed_at": "2025-01-02T03:04:05Z",
                "html_url": "https://github.com/tokio-rs/tokio"
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::with_base_url("secret".into(), server.uri()).unwrap();
        let repo = client.get_repository("tokio-rs", "tokio").await.unwrap();

        assert_eq!(repo.full_name, "tokio-rs/tokio");
        assert_eq!(repo.stargazers_count, 27000);
        assert_eq!(repo.forks_count, 2500);
        assert!(repo.created_at.is_some());
        assert!(repo.pushed_at.is_some());
    }

    #[tokio::test]
    async fn test_not_found_and_rate_limit_are_distinguished() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/gone/away"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/busy/repo"))
            .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"))
            .mount(&server)
            .await;

        let client = GitHubClient::with_base_url("t".into(), server.uri()).unwrap();

        assert!(matches!(
            client.get_repository("gone", "away").await,
            Err(GitHubError::NotFound(_))
        ));
        assert!(matches!(
            client.get_repository("busy", "repo").await,
            Err(GitHubError::RateLimitExceeded)
        ));
        // One attempt each - enrichment never retries
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}

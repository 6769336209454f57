// HTTP clients for the trending listing and the GitHub REST API
pub mod github;
pub mod parse;
pub mod retry;
pub mod trending;

// Re-export common types
pub use github::{GitHubClient, GitHubError, GitHubRepo};
pub use parse::{parse_count, parse_trending_page, ParsedPage, TrendingEntry};
pub use retry::{with_retry, RetryConfig, RetryExhausted, Transient};
pub use trending::{FetchError, TrendingClient, TrendingError, SUPPORTED_SINCE};

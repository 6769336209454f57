// Metadata source implementations
pub mod github;

pub use github::GitHubMetadataSource;

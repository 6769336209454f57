// SQLite-backed observation history
// Remembers which repos showed up on which day so "new" means something

pub mod novelty;

pub use novelty::{repo_key, Novelty, NoveltySession, NoveltyStore, StoreError, StoreStats};

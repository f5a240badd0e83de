mod cache;
pub mod commits;
pub mod contributors;


pub use cache::{CacheManager, CachedValue, DEFAULT_SWEEP_INTERVAL};
pub use commits::{fetch_all_commits, CommitQuery, MAX_PAGES};
pub use contributors::ContributorAnalyzer;

//! # Contributor Statistics Library
//!
//! `contribstats` is a library for measuring contributor growth in GitHub
//! repositories. It answers one question precisely: how many contributors
//! made their first-ever commit to a repository during a given year or
//! month. Every upstream access flows through a self-imposed rate governor
//! and a TTL cache, so repeated analyses stay within GitHub's quota.
//!
//! ## Features
//!
//! - Count first-time contributors per calendar year or month
//! - Baseline/target set difference over full commit history
//! - Rolling-window rate governance with automatic suspension
//! - Two-tier TTL caching of repositories, commit pages, and results
//! - Bounded recovery from quota exhaustion and transient faults
//! - Injectable clock and transport for deterministic tests
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use contribstats::analysis::{CacheManager, ContributorAnalyzer};
//! use contribstats::clock::SystemClock;
//! use contribstats::github::{GitHubClient, HttpTransport, RateLimiter};
//! use contribstats::{Config, Period};
//!
//! # async fn run() -> contribstats::Result<()> {
//! let config = Config::from_env();
//! let clock = Arc::new(SystemClock);
//!
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let limiter = RateLimiter::new(config.requests_per_hour, clock.clone());
//! let client = Arc::new(GitHubClient::new(transport, limiter, clock.clone(), &config));
//! let cache = Arc::new(CacheManager::new(config.cache_ttl, clock.clone()));
//!
//! let analyzer = ContributorAnalyzer::new(client, cache, clock);
//! let result = analyzer.analyze("airbnb", "javascript", Period::yearly(2023)).await?;
//! println!("{} new contributors", result.new_contributors);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod clock;
pub mod config;
pub mod error;
pub mod github;
pub mod types;

// Re-export main types for convenience
pub use analysis::{CacheManager, ContributorAnalyzer};
pub use config::Config;
pub use error::{Error, Result};
pub use types::{AnalysisResult, CacheStats, Period};

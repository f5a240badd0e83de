//! Engine configuration.
//!
//! Everything the engine consumes from the environment lives here so the
//! services can also be built with explicit values in tests.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REQUESTS_PER_HOUR: u32 = 5_000; // self-imposed budget per rolling hour
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400; // 24 hours
pub const DEFAULT_MAX_RETRIES: u32 = 3; // resends per request, both recovery classes
pub const UNAUTHENTICATED_BUDGET: u32 = 60; // what GitHub actually grants without a token

/// Runtime configuration for the analysis engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional bearer credential. Without it GitHub grants only
    /// [`UNAUTHENTICATED_BUDGET`] requests per hour; that is reported at
    /// startup, not enforced here.
    pub token: Option<String>,
    /// Self-imposed request budget per rolling hour.
    pub requests_per_hour: u32,
    /// Default cache TTL for repository and analysis-result entries.
    pub cache_ttl: Duration,
    /// Maximum resends per request before a retryable failure surfaces.
    pub max_retries: u32,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            requests_per_hour: DEFAULT_REQUESTS_PER_HOUR,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Config {
    /// Builds a configuration from the environment, falling back to the
    /// defaults above.
    ///
    /// Recognized variables: `GITHUB_TOKEN`, `REQUESTS_PER_HOUR`,
    /// `CACHE_TTL_SECS`, `MAX_RETRIES`, `GITHUB_API_URL`. Unparsable numeric
    /// values fall back to the default rather than failing startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            requests_per_hour: env_parse("REQUESTS_PER_HOUR", defaults.requests_per_hour),
            cache_ttl: Duration::from_secs(env_parse(
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
            max_retries: env_parse("MAX_RETRIES", defaults.max_retries),
            api_url: std::env::var("GITHUB_API_URL").unwrap_or(defaults.api_url),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

//! Contributor Statistics Tool
//!
//! A command-line front end for the contributor-novelty analyzer.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::runtime::Runtime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use contribstats::analysis::{CacheManager, ContributorAnalyzer, DEFAULT_SWEEP_INTERVAL};
use contribstats::clock::SystemClock;
use contribstats::github::{GitHubClient, HttpTransport, RateLimiter};
use contribstats::{Config, Period};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (org, repo, period) = parse_args()?;
    let config = Config::from_env();

    // Initialize the Tokio runtime
    let rt = Runtime::new().context("failed to start async runtime")?;
    rt.block_on(async {
        let clock = Arc::new(SystemClock);
        let transport = Arc::new(HttpTransport::new(&config)?);
        let limiter = RateLimiter::new(config.requests_per_hour, clock.clone());
        let client = Arc::new(GitHubClient::new(transport, limiter, clock.clone(), &config));

        let cache = Arc::new(CacheManager::new(config.cache_ttl, clock.clone()));
        let _sweeper = Arc::clone(&cache).spawn_sweeper(DEFAULT_SWEEP_INTERVAL);

        let analyzer = ContributorAnalyzer::new(client, cache, clock);
        let result = analyzer.analyze(&org, &repo, period).await?;

        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    })
}

fn parse_args() -> Result<(String, String, Period)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 || args.len() > 4 {
        return Err(anyhow!("usage: contribstats <org> <repo> <year> [month]"));
    }

    let year: i32 = args[2].parse().context("year must be a number")?;
    let period = match args.get(3) {
        Some(raw) => {
            let month: u32 = raw.parse().context("month must be a number")?;
            Period::monthly(year, month)
                .ok_or_else(|| anyhow!("month must be between 1 and 12"))?
        }
        None => Period::yearly(year),
    };

    Ok((args[0].clone(), args[1].clone(), period))
}

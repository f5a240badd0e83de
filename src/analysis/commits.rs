//! Paged commit-history aggregation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::clock::Clock;
use crate::error::Result;
use crate::github::{GitHubClient, PAGE_SIZE};
use crate::types::{rfc3339_utc, Commit};

use super::cache::{CacheManager, CachedValue};

/// Hard cap on pages fetched for one query window.
pub const MAX_PAGES: u32 = 1000;

/// TTL for pages whose window may still receive commits.
const FRESH_PAGE_TTL: Duration = Duration::from_secs(300);

/// TTL for pages covering a fully historical window.
const HISTORICAL_PAGE_TTL: Duration = Duration::from_secs(3600);

/// One commit-history query: a repository plus a closed time window.
#[derive(Debug, Clone)]
pub struct CommitQuery {
    pub org: String,
    pub repo: String,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Fetch every commit in the query window, page by page.
///
/// Pages are fetched strictly sequentially. Aggregation stops at the first
/// short page, or truncates with a warning once [`MAX_PAGES`] pages have
/// been collected. Each page is cached under its own key, and a re-run
/// reuses whatever pages the TTLs still hold.
pub async fn fetch_all_commits(
    client: &GitHubClient,
    cache: &CacheManager,
    clock: &dyn Clock,
    query: &CommitQuery,
) -> Result<Vec<Commit>> {
    let mut commits = Vec::new();
    let mut page = 1u32;

    loop {
        if page > MAX_PAGES {
            warn!(
                org = %query.org,
                repo = %query.repo,
                cap = MAX_PAGES,
                "pagination cap reached, truncating commit history"
            );
            break;
        }

        let key = page_key(query, page);
        let page_commits = match cache.get(&key) {
            Some(CachedValue::CommitPage(cached)) => cached,
            _ => {
                let fetched = client
                    .fetch_commit_page(&query.org, &query.repo, &query.since, &query.until, page)
                    .await?;
                cache.insert_with_ttl(
                    &key,
                    CachedValue::CommitPage(fetched.clone()),
                    page_ttl(&query.since, &clock.now()),
                );
                fetched
            }
        };

        let len = page_commits.len();
        commits.extend(page_commits);
        if len < PAGE_SIZE {
            break;
        }
        page += 1;
    }

    Ok(commits)
}

/// Cache key for one page of one query window.
pub(crate) fn page_key(query: &CommitQuery, page: u32) -> String {
    format!(
        "commits:{}:{}:{}:{}:{}",
        query.org,
        query.repo,
        rfc3339_utc(&query.since),
        rfc3339_utc(&query.until),
        page
    )
}

/// Pages near the present can still change as commits land; keep them on a
/// short leash. Anything older is effectively immutable history.
pub(crate) fn page_ttl(since: &DateTime<Utc>, now: &DateTime<Utc>) -> Duration {
    if *now - *since < chrono::Duration::hours(24) {
        FRESH_PAGE_TTL
    } else {
        HISTORICAL_PAGE_TTL
    }
}

//! Contributor-novelty analysis.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::types::{AnalysisResult, CacheStats, Commit, Period, Repository};

use super::cache::{CacheManager, CachedValue};
use super::commits::{fetch_all_commits, CommitQuery};

/// Counts contributors whose first-ever commit to a repository lands inside
/// a requested period.
///
/// The analyzer owns no global state; it orchestrates the injected client,
/// cache, and clock. Two histories are aggregated per fresh analysis: the
/// baseline (repository creation up to one second before the period) and
/// the target (the period itself). A contributor is new when their login
/// appears in the target but not the baseline, and each login is counted
/// once no matter how many period commits it made.
pub struct ContributorAnalyzer {
    client: Arc<GitHubClient>,
    cache: Arc<CacheManager>,
    clock: Arc<dyn Clock>,
}

impl ContributorAnalyzer {
    pub fn new(
        client: Arc<GitHubClient>,
        cache: Arc<CacheManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            cache,
            clock,
        }
    }

    /// Count first-time contributors to `org/repo` during `period`.
    ///
    /// Results are cached under the period label, so repeating a call
    /// within the TTL costs no upstream requests.
    pub async fn analyze(&self, org: &str, repo: &str, period: Period) -> Result<AnalysisResult> {
        self.analyze_fresh(org, repo, period)
            .await
            .map_err(Error::into_analysis)
    }

    async fn analyze_fresh(
        &self,
        org: &str,
        repo: &str,
        period: Period,
    ) -> Result<AnalysisResult> {
        let key = result_key(org, repo, &period);
        if let Some(CachedValue::Analysis(hit)) = self.cache.get(&key) {
            debug!(key = %key, "analysis served from cache");
            return Ok(hit);
        }

        let repository = self.repository(org, repo).await?;

        // A repository cannot receive contributions before it exists.
        let mut start = period.start();
        let end = period.end();
        if start < repository.created_at {
            start = repository.created_at;
        }

        // Clamping can push start past end when the whole period predates
        // the repository; the answer is then trivially zero.
        if start > end {
            debug!(org, repo, "period ends before the repository was created");
            return Ok(self.finish(&key, org, repo, period, 0));
        }

        let mut contributors = HashSet::new();
        if repository.created_at < start {
            let baseline = CommitQuery {
                org: org.to_string(),
                repo: repo.to_string(),
                since: repository.created_at,
                until: start - chrono::Duration::seconds(1),
            };
            let commits =
                fetch_all_commits(&self.client, &self.cache, self.clock.as_ref(), &baseline)
                    .await?;
            contributors = distinct_logins(&commits);
            debug!(known = contributors.len(), "baseline contributors collected");
        }

        let target = CommitQuery {
            org: org.to_string(),
            repo: repo.to_string(),
            since: start,
            until: end,
        };
        let commits =
            fetch_all_commits(&self.client, &self.cache, self.clock.as_ref(), &target).await?;
        let new_contributors = count_first_appearances(&mut contributors, &commits);

        info!(
            org,
            repo,
            period = %period.cache_label(),
            new_contributors,
            "analysis complete"
        );
        Ok(self.finish(&key, org, repo, period, new_contributors))
    }

    fn finish(
        &self,
        key: &str,
        org: &str,
        repo: &str,
        period: Period,
        new_contributors: usize,
    ) -> AnalysisResult {
        let result = AnalysisResult {
            org: org.to_string(),
            repository: repo.to_string(),
            period,
            new_contributors,
        };
        self.cache.insert(key, CachedValue::Analysis(result.clone()));
        result
    }

    /// Repository metadata, cached under its own key.
    async fn repository(&self, org: &str, repo: &str) -> Result<Repository> {
        let key = repo_key(org, repo);
        if let Some(CachedValue::Repository(hit)) = self.cache.get(&key) {
            return Ok(hit);
        }
        let fetched = self.client.fetch_repository(org, repo).await?;
        self.cache
            .insert(&key, CachedValue::Repository(fetched.clone()));
        Ok(fetched)
    }

    /// Cache counters and key count, for the monitoring surface.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

pub(crate) fn repo_key(org: &str, repo: &str) -> String {
    format!("repo:{}:{}", org, repo)
}

pub(crate) fn result_key(org: &str, repo: &str, period: &Period) -> String {
    format!("contributors:{}:{}:{}", org, repo, period.cache_label())
}

/// Distinct logins present in `commits`. Commits whose author has no
/// platform account contribute nothing.
pub(crate) fn distinct_logins(commits: &[Commit]) -> HashSet<String> {
    commits
        .iter()
        .filter_map(|commit| commit.author_login.clone())
        .collect()
}

/// Count logins making their first appearance relative to `known`, folding
/// each novel login into `known` so later commits by the same author do not
/// count again.
pub(crate) fn count_first_appearances(known: &mut HashSet<String>, commits: &[Commit]) -> usize {
    let mut novel = 0;
    for commit in commits {
        if let Some(login) = &commit.author_login {
            if known.insert(login.clone()) {
                novel += 1;
            }
        }
    }
    novel
}

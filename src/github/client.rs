//! Typed GitHub REST client with rate governance and bounded retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{rfc3339_utc, Commit, Repository};

use super::rate::RateLimiter;
use super::transport::{RawResponse, Transport};

/// Fixed number of commits requested per page.
pub const PAGE_SIZE: usize = 100;

/// Backoff before resending after a transient failure.
const TRANSIENT_BACKOFF: Duration = Duration::from_secs(1);

/// Upstream-quota level below which a warning is emitted.
const LOW_QUOTA_THRESHOLD: u32 = 100;

/// GitHub REST client.
///
/// Every request passes through the shared [`RateLimiter`] before it is
/// dispatched, including resends. Two failure classes are recovered in
/// place while the retry budget lasts: upstream quota exhaustion (403 with
/// zero remaining, waited out until the advertised reset) and transient
/// faults (5xx or connection failures, resent after a short backoff).
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    api_url: String,
    max_retries: u32,
}

impl GitHubClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: RateLimiter,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            transport,
            limiter,
            clock,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        }
    }

    /// Fetch repository metadata.
    pub async fn fetch_repository(&self, org: &str, repo: &str) -> Result<Repository> {
        let url = format!("{}/repos/{}/{}", self.api_url, org, repo);
        let response = self.send(&url).await?;

        match response.status {
            200 => {
                let payload: RepoPayload =
                    serde_json::from_str(&response.body).map_err(|e| Error::RepoFetch {
                        message: format!("invalid repository payload: {}", e),
                    })?;
                Ok(Repository {
                    org: org.to_string(),
                    name: repo.to_string(),
                    created_at: payload.created_at,
                    default_branch: payload.default_branch,
                })
            }
            404 => Err(Error::RepoNotFound {
                org: org.to_string(),
                repo: repo.to_string(),
            }),
            status => Err(Error::RepoFetch {
                message: format!("GitHub responded with status {}", status),
            }),
        }
    }

    /// Fetch one page of commit history inside a closed time window.
    ///
    /// Pages are 1-based. A short or empty page means the history is
    /// exhausted; the caller owns that decision.
    pub async fn fetch_commit_page(
        &self,
        org: &str,
        repo: &str,
        since: &DateTime<Utc>,
        until: &DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<Commit>> {
        let url = format!(
            "{}/repos/{}/{}/commits?since={}&until={}&per_page={}&page={}",
            self.api_url,
            org,
            repo,
            rfc3339_utc(since),
            rfc3339_utc(until),
            PAGE_SIZE,
            page
        );
        let response = self.send(&url).await?;

        match response.status {
            200 => {
                let payload: Vec<CommitPayload> =
                    serde_json::from_str(&response.body).map_err(|e| Error::CommitFetch {
                        message: format!("invalid commit payload: {}", e),
                    })?;
                Ok(payload.into_iter().map(Commit::from).collect())
            }
            // GitHub reports an empty repository as a conflict.
            409 => Ok(Vec::new()),
            404 => Err(Error::RepoNotFound {
                org: org.to_string(),
                repo: repo.to_string(),
            }),
            status => Err(Error::CommitFetch {
                message: format!("GitHub responded with status {}", status),
            }),
        }
    }

    /// Send one GET through the rate governor, recovering from upstream
    /// quota exhaustion and transient faults while the retry budget lasts.
    async fn send(&self, url: &str) -> Result<RawResponse> {
        let mut retries = 0u32;

        loop {
            self.limiter.reserve().await;

            let response = match self.transport.execute(url).await {
                Ok(response) => response,
                Err(Error::Connection { message }) => {
                    if retries >= self.max_retries {
                        return Err(Error::TransientExhausted {
                            attempts: retries + 1,
                            message,
                        });
                    }
                    retries += 1;
                    debug!(url, retry = retries, "connection failure, backing off");
                    self.clock.sleep(TRANSIENT_BACKOFF).await;
                    continue;
                }
                Err(other) => return Err(other),
            };

            if let Some(remaining) = response.remaining {
                if remaining < LOW_QUOTA_THRESHOLD {
                    warn!(remaining, "GitHub quota is running low");
                }
            }

            // Upstream quota spent: forbidden with nothing remaining.
            if response.status == 403 && response.remaining == Some(0) {
                let reset_at = response.reset.unwrap_or_else(|| self.clock.now());
                if retries >= self.max_retries {
                    return Err(Error::RateLimited { reset_at });
                }
                retries += 1;
                let wait = (reset_at - self.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                if !wait.is_zero() {
                    warn!(
                        wait_secs = wait.as_secs(),
                        "GitHub quota exhausted, waiting for reset"
                    );
                    self.clock.sleep(wait).await;
                }
                continue;
            }

            if (500..600).contains(&response.status) {
                if retries >= self.max_retries {
                    return Err(Error::TransientExhausted {
                        attempts: retries + 1,
                        message: format!("GitHub responded with status {}", response.status),
                    });
                }
                retries += 1;
                debug!(
                    url,
                    status = response.status,
                    retry = retries,
                    "server error, backing off"
                );
                self.clock.sleep(TRANSIENT_BACKOFF).await;
                continue;
            }

            return Ok(response);
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepoPayload {
    created_at: DateTime<Utc>,
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
    commit: CommitDetails,
    /// Platform account of the author; absent when the commit email does
    /// not map to an account.
    author: Option<AccountRef>,
}

#[derive(Debug, Deserialize)]
struct CommitDetails {
    author: Option<GitActor>,
}

#[derive(Debug, Deserialize)]
struct GitActor {
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AccountRef {
    login: String,
}

impl From<CommitPayload> for Commit {
    fn from(payload: CommitPayload) -> Self {
        Self {
            sha: payload.sha,
            author_login: payload
                .author
                .map(|a| a.login)
                .filter(|login| !login.is_empty()),
            author_timestamp: payload
                .commit
                .author
                .map(|a| a.date)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::github::transport::ReplayTransport;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const REPO_BODY: &str =
        r#"{"created_at": "2020-03-01T12:00:00Z", "default_branch": "main"}"#;

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
    }

    fn client_with(
        transport: Arc<ReplayTransport>,
        clock: Arc<ManualClock>,
    ) -> GitHubClient {
        let config = Config::default();
        let limiter = RateLimiter::new(config.requests_per_hour, clock.clone());
        GitHubClient::new(transport, limiter, clock, &config)
    }

    #[test]
    fn repository_payload_is_decoded() {
        let transport = Arc::new(ReplayTransport::new());
        transport.push(RawResponse::new(200, REPO_BODY));
        let clock = Arc::new(ManualClock::new(start_time()));
        let client = client_with(transport.clone(), clock);

        let repo = tokio_test::block_on(client.fetch_repository("acme", "widgets")).unwrap();

        assert_eq!(repo.org, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.default_branch, "main");
        assert_eq!(
            repo.created_at,
            Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            transport.requests(),
            vec!["https://api.github.com/repos/acme/widgets".to_string()]
        );
    }

    #[test]
    fn missing_repository_is_not_found() {
        let transport = Arc::new(ReplayTransport::new());
        transport.push(RawResponse::new(404, r#"{"message": "Not Found"}"#));
        let clock = Arc::new(ManualClock::new(start_time()));
        let client = client_with(transport, clock);

        let err = tokio_test::block_on(client.fetch_repository("acme", "ghost")).unwrap_err();

        assert!(matches!(err, Error::RepoNotFound { .. }));
        assert_eq!(err.to_string(), "Repository acme/ghost not found");
    }

    #[test]
    fn empty_repository_conflict_yields_no_commits() {
        let transport = Arc::new(ReplayTransport::new());
        transport.push(RawResponse::new(
            409,
            r#"{"message": "Git Repository is empty."}"#,
        ));
        let clock = Arc::new(ManualClock::new(start_time()));
        let client = client_with(transport, clock);

        let since = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let commits = tokio_test::block_on(
            client.fetch_commit_page("acme", "widgets", &since, &until, 1),
        )
        .unwrap();

        assert!(commits.is_empty());
    }

    #[test]
    fn commit_page_url_carries_window_and_paging() {
        let transport = Arc::new(ReplayTransport::new());
        transport.push(RawResponse::new(200, "[]"));
        let clock = Arc::new(ManualClock::new(start_time()));
        let client = client_with(transport.clone(), clock);

        let since = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        tokio_test::block_on(client.fetch_commit_page("acme", "widgets", &since, &until, 3))
            .unwrap();

        assert_eq!(
            transport.requests(),
            vec![
                "https://api.github.com/repos/acme/widgets/commits?since=2023-01-01T00:00:00Z&until=2023-12-31T23:59:59Z&per_page=100&page=3"
                    .to_string()
            ]
        );
    }

    #[test]
    fn commit_author_may_be_absent() {
        let body = r#"[
            {"sha": "a1", "commit": {"author": {"date": "2023-02-01T10:00:00Z"}}, "author": {"login": "alice"}},
            {"sha": "b2", "commit": {"author": {"date": "2023-02-02T10:00:00Z"}}, "author": null}
        ]"#;
        let transport = Arc::new(ReplayTransport::new());
        transport.push(RawResponse::new(200, body));
        let clock = Arc::new(ManualClock::new(start_time()));
        let client = client_with(transport, clock);

        let since = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let commits = tokio_test::block_on(
            client.fetch_commit_page("acme", "widgets", &since, &until, 1),
        )
        .unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].author_login.as_deref(), Some("alice"));
        assert_eq!(commits[1].author_login, None);
    }

    #[test]
    fn quota_exhaustion_waits_until_reset_then_resends() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let reset_at = start_time() + chrono::Duration::seconds(120);

        let transport = Arc::new(ReplayTransport::new());
        transport.push(
            RawResponse::new(403, r#"{"message": "API rate limit exceeded"}"#)
                .with_rate(0, reset_at),
        );
        transport.push(RawResponse::new(200, REPO_BODY));
        let client = client_with(transport.clone(), clock.clone());

        let repo = tokio_test::block_on(client.fetch_repository("acme", "widgets")).unwrap();

        assert_eq!(repo.default_branch, "main");
        assert_eq!(transport.request_count(), 2);
        assert_eq!(clock.total_slept(), Duration::from_secs(120));
    }

    #[test]
    fn server_errors_back_off_then_resend() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let transport = Arc::new(ReplayTransport::new());
        transport.push(RawResponse::new(502, "bad gateway"));
        transport.push(RawResponse::new(200, REPO_BODY));
        let client = client_with(transport.clone(), clock.clone());

        tokio_test::block_on(client.fetch_repository("acme", "widgets")).unwrap();

        assert_eq!(transport.request_count(), 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn connection_failures_back_off_then_resend() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let transport = Arc::new(ReplayTransport::new());
        transport.push_error(Error::Connection {
            message: "connection reset by peer".to_string(),
        });
        transport.push(RawResponse::new(200, REPO_BODY));
        let client = client_with(transport.clone(), clock.clone());

        tokio_test::block_on(client.fetch_repository("acme", "widgets")).unwrap();

        assert_eq!(transport.request_count(), 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn persistent_server_errors_exhaust_the_retry_budget() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let transport = Arc::new(ReplayTransport::new());
        for _ in 0..4 {
            transport.push(RawResponse::new(503, "unavailable"));
        }
        let client = client_with(transport.clone(), clock.clone());

        let err = tokio_test::block_on(client.fetch_repository("acme", "widgets")).unwrap_err();

        // Default budget is three resends, so four dispatches total.
        assert_eq!(transport.request_count(), 4);
        match err {
            Error::TransientExhausted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn persistent_quota_exhaustion_surfaces_rate_limited() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let reset_at = start_time() + chrono::Duration::seconds(30);
        let transport = Arc::new(ReplayTransport::new());
        for _ in 0..4 {
            transport.push(
                RawResponse::new(403, r#"{"message": "API rate limit exceeded"}"#)
                    .with_rate(0, reset_at),
            );
        }
        let client = client_with(transport.clone(), clock.clone());

        let err = tokio_test::block_on(client.fetch_repository("acme", "widgets")).unwrap_err();

        assert_eq!(transport.request_count(), 4);
        assert!(matches!(err, Error::RateLimited { .. }));
    }

    #[test]
    fn plain_forbidden_is_not_retried() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let transport = Arc::new(ReplayTransport::new());
        // Forbidden with quota still remaining is a real refusal.
        transport.push(
            RawResponse::new(403, r#"{"message": "Resource not accessible"}"#)
                .with_rate(4000, start_time() + chrono::Duration::seconds(30)),
        );
        let client = client_with(transport.clone(), clock.clone());

        let err = tokio_test::block_on(client.fetch_repository("acme", "widgets")).unwrap_err();

        assert_eq!(transport.request_count(), 1);
        assert!(matches!(err, Error::RepoFetch { .. }));
        assert!(clock.sleeps().is_empty());
    }
}

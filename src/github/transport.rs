//! HTTP transport seam for the GitHub REST API.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use tracing::warn;

use crate::config::{Config, UNAUTHENTICATED_BUDGET};
use crate::error::{Error, Result};

/// Per-request timeout for upstream calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A raw upstream response with the rate-limit headers already surfaced.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Requests GitHub reports as remaining in its own quota window.
    pub remaining: Option<u32>,
    /// When GitHub's quota window resets.
    pub reset: Option<DateTime<Utc>>,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Build a response with a status and body and no rate-limit headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            remaining: None,
            reset: None,
            body: body.into(),
        }
    }

    /// Attach rate-limit header values to this response.
    pub fn with_rate(mut self, remaining: u32, reset: DateTime<Utc>) -> Self {
        self.remaining = Some(remaining);
        self.reset = Some(reset);
        self
    }
}

/// Executes a single GET against the upstream platform.
///
/// The production implementation is [`HttpTransport`]. [`ReplayTransport`]
/// serves canned responses for tests and offline experiments. Retry and rate
/// handling live above this seam; implementations carry no recovery logic.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, url: &str) -> Result<RawResponse>;
}

/// Production transport backed by a pooled `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the transport, wiring in the auth token when one is configured.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("contribstats/", env!("CARGO_PKG_VERSION"))),
        );

        match &config.token {
            Some(token) => {
                let value =
                    HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                        Error::Connection {
                            message: format!("token is not a valid header value: {}", e),
                        }
                    })?;
                headers.insert(AUTHORIZATION, value);
            }
            None => {
                warn!(
                    budget = UNAUTHENTICATED_BUDGET,
                    "no GitHub token configured, unauthenticated quota applies"
                );
            }
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Connection {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, url: &str) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Connection {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let remaining = header_number(response.headers(), "x-ratelimit-remaining");
        let reset = header_number(response.headers(), "x-ratelimit-reset")
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));

        let body = response.text().await.map_err(|e| Error::Connection {
            message: e.to_string(),
        })?;

        Ok(RawResponse {
            status,
            remaining: remaining.map(|v| v.min(u32::MAX as u64) as u32),
            reset,
            body,
        })
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Canned-response transport for tests and offline experiments.
///
/// Responses are served in FIFO order regardless of URL, and every requested
/// URL is recorded so callers can assert on call counts and ordering.
#[derive(Default)]
pub struct ReplayTransport {
    responses: Mutex<VecDeque<Result<RawResponse>>>,
    requests: Mutex<Vec<String>>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to serve for the next unmatched request.
    pub fn push(&self, response: RawResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error to serve for the next unmatched request.
    pub fn push_error(&self, error: Error) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests that reached this transport.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn execute(&self, url: &str) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(Error::Connection {
                    message: format!("no canned response queued for {}", url),
                })
            })
    }
}

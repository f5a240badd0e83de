//! Error types for the contributor analysis engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top-level error enum for the analysis engine.
///
/// The routing layer that consumes this library maps these variants to
/// external status codes; the messages here are the ones it surfaces.
#[derive(Debug, Error)]
pub enum Error {
    /// GitHub reports that the repository does not exist.
    #[error("Repository {org}/{repo} not found")]
    RepoNotFound { org: String, repo: String },

    /// GitHub's own quota stayed exhausted past the retry budget.
    #[error("GitHub rate limit exhausted, resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// A transient upstream failure persisted past the retry budget.
    #[error("upstream failure persisted after {attempts} attempts: {message}")]
    TransientExhausted { attempts: u32, message: String },

    /// The connection failed before a response arrived. Recovered internally
    /// while the retry budget lasts; callers only see it through
    /// [`Error::TransientExhausted`].
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Any other failure while fetching repository metadata.
    #[error("Failed to fetch repository: {message}")]
    RepoFetch { message: String },

    /// Any other failure while fetching commit history.
    #[error("Failed to fetch commits: {message}")]
    CommitFetch { message: String },

    /// Envelope for any failure that aborts an analysis run.
    #[error("Failed to analyze contributors: {source}")]
    Analysis {
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps this error in the analysis-failure envelope, at most once.
    pub(crate) fn into_analysis(self) -> Self {
        match self {
            wrapped @ Self::Analysis { .. } => wrapped,
            other => Self::Analysis {
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

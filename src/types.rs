//! # Common Types
//!
//! This module contains the common types used throughout the engine for
//! representing repositories, commits, analysis periods, and results.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Repository metadata resolved from GitHub.
///
/// Fetched at most once per cache-TTL window per `(org, name)` pair and
/// treated as immutable within that window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Owning organization or user login.
    pub org: String,
    /// Repository name within the organization.
    pub name: String,
    /// When the repository was created; the lower bound for every analysis.
    pub created_at: DateTime<Utc>,
    /// Default branch reported by GitHub.
    pub default_branch: String,
}

/// A single commit from the repository history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA.
    pub sha: String,
    /// Login of the associated account. `None` when GitHub cannot tie the
    /// commit to an account (email-only authorship); such commits never enter
    /// a contributor set.
    pub author_login: Option<String>,
    /// Author timestamp reported by GitHub.
    pub author_timestamp: DateTime<Utc>,
}

/// The calendar period under analysis.
///
/// A tagged variant rather than an optional month field, so each shape
/// serializes exactly the fields it has: a yearly result carries only `year`,
/// a monthly result carries `year` and `month`.
///
/// `Monthly` must stay the first variant: untagged deserialization tries
/// variants in order, and `Yearly` would also accept a monthly payload by
/// dropping the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Period {
    /// A calendar month.
    Monthly { year: i32, month: u32 },
    /// A full calendar year.
    Yearly { year: i32 },
}

impl Period {
    /// Creates a yearly period.
    pub fn yearly(year: i32) -> Self {
        Self::Yearly { year }
    }

    /// Creates a monthly period. Returns `None` unless `month` is 1–12.
    pub fn monthly(year: i32, month: u32) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(Self::Monthly { year, month })
    }

    /// The calendar year this period belongs to.
    pub fn year(&self) -> i32 {
        match self {
            Self::Monthly { year, .. } | Self::Yearly { year } => *year,
        }
    }

    /// The month number, for monthly periods.
    pub fn month(&self) -> Option<u32> {
        match self {
            Self::Monthly { month, .. } => Some(*month),
            Self::Yearly { .. } => None,
        }
    }

    /// First instant of the period.
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Self::Monthly { year, month } => month_start(*year, *month),
            Self::Yearly { year } => month_start(*year, 1),
        }
    }

    /// Last instant of the period, at second precision.
    pub fn end(&self) -> DateTime<Utc> {
        let next = match self {
            Self::Monthly { year, month: 12 } => month_start(*year + 1, 1),
            Self::Monthly { year, month } => month_start(*year, *month + 1),
            Self::Yearly { year } => month_start(*year + 1, 1),
        };
        next - chrono::Duration::seconds(1)
    }

    /// The period segment of a result cache key: the month number, or `all`
    /// for a full year.
    pub fn cache_label(&self) -> String {
        match self {
            Self::Monthly { year, month } => format!("{year}:{month}"),
            Self::Yearly { year } => format!("{year}:all"),
        }
    }
}

/// The result of one contributor-novelty analysis.
///
/// Immutable once produced; cached under its own key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Owning organization or user login.
    pub org: String,
    /// Repository name.
    pub repository: String,
    /// Analyzed period, flattened into `year` (+ `month` when monthly).
    #[serde(flatten)]
    pub period: Period,
    /// Number of contributors whose first-ever commit falls in the period.
    pub new_contributors: usize,
}

/// Snapshot of the cache's observability counters, shaped for the external
/// monitoring surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of live keys at snapshot time.
    pub keys: usize,
    /// Cumulative counters since the cache was created.
    pub stats: CacheCounters,
}

/// Cumulative hit/miss counters for the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounters {
    /// Reads answered from a live entry.
    pub hits: u64,
    /// Reads that found no entry.
    pub misses: u64,
    /// Reads that found an entry past its TTL (also counted as misses).
    pub expired: u64,
}

/// RFC 3339 at second precision with a `Z` suffix, the one format used for
/// both request URLs and cache keys so the two can never drift apart.
pub(crate) fn rfc3339_utc(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("period within calendar range")
}

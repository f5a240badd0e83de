//! Rate-governed access to the GitHub REST API.

mod client;
mod rate;
mod transport;

pub use client::{GitHubClient, PAGE_SIZE};
pub use rate::RateLimiter;
pub use transport::{HttpTransport, RawResponse, ReplayTransport, Transport};

//! Self-imposed request budget tracking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::Clock;

/// Length of the rolling budget window.
const RATE_WINDOW_SECS: i64 = 3600;

struct RateWindow {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Tracks the outgoing-request budget over a rolling one-hour window and
/// suspends callers once the budget is spent.
///
/// Counters live for the process lifetime only; a long process sleep
/// collapses any number of missed windows into a single reset on the next
/// call.
pub struct RateLimiter {
    limit: u32,
    state: Mutex<RateWindow>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter allowing `limit` requests per rolling hour.
    pub fn new(limit: u32, clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            limit,
            state: Mutex::new(RateWindow {
                count: 0,
                window_start,
            }),
            clock,
        }
    }

    /// Reserve one request slot. Call before every outbound request.
    ///
    /// Returns immediately while the budget lasts; otherwise suspends until
    /// the window would naturally reset. The budget is re-checked after every
    /// wake because another task may have claimed the fresh window first.
    pub async fn reserve(&self) {
        loop {
            let wait = {
                let now = self.clock.now();
                let window_len = chrono::Duration::seconds(RATE_WINDOW_SECS);
                let mut state = self.state.lock().unwrap();

                if now - state.window_start >= window_len {
                    state.count = 0;
                    state.window_start = now;
                }

                if state.count < self.limit {
                    state.count += 1;
                    return;
                }

                (state.window_start + window_len - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
            };

            debug!(
                wait_secs = wait.as_secs(),
                limit = self.limit,
                "request budget spent, waiting for window reset"
            );
            self.clock.sleep(wait).await;
        }
    }
}

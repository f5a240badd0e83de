//! TTL cache for repository metadata, commit pages, and analysis results.
//!
//! One process-wide store serves all three entry classes under composite
//! string keys. GitHub logins and repository names cannot contain `:`, so
//! segments of different kinds can never collide.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::Clock;
use crate::types::{AnalysisResult, CacheCounters, CacheStats, Commit, Repository};

/// Cadence of the background purge of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// A value stored in the cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Repository(Repository),
    CommitPage(Vec<Commit>),
    Analysis(AnalysisResult),
}

struct Entry {
    value: CachedValue,
    expires_at: DateTime<Utc>,
}

struct Store {
    entries: HashMap<String, Entry>,
    counters: CacheCounters,
}

/// Manages caching of upstream lookups and analysis results.
///
/// Entries expire lazily on read and eagerly through [`purge_expired`],
/// which the optional background sweeper calls on a fixed cadence. There is
/// no explicit invalidation; expiry is the only way out.
///
/// [`purge_expired`]: CacheManager::purge_expired
pub struct CacheManager {
    store: Mutex<Store>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    /// Create a cache manager. `default_ttl` applies to [`insert`];
    /// [`insert_with_ttl`] overrides it per entry.
    ///
    /// [`insert`]: CacheManager::insert
    /// [`insert_with_ttl`]: CacheManager::insert_with_ttl
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(Store {
                entries: HashMap::new(),
                counters: CacheCounters::default(),
            }),
            default_ttl,
            clock,
        }
    }

    /// Retrieve a live entry. An expired entry is removed and counts as a
    /// miss, exactly as if it had never been stored.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let now = self.clock.now();
        let mut guard = self.store.lock().unwrap();
        let store = &mut *guard;

        let expired = match store.entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                store.counters.hits += 1;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            store.entries.remove(key);
            store.counters.expired += 1;
        }
        store.counters.misses += 1;
        None
    }

    /// Store a value under the default TTL.
    pub fn insert(&self, key: &str, value: CachedValue) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with an explicit TTL. Re-inserting a key replaces the
    /// old entry and restarts its clock.
    pub fn insert_with_ttl(&self, key: &str, value: CachedValue, ttl: Duration) {
        // TTLs beyond chrono's range clamp to a century.
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let expires_at = self.clock.now() + ttl;
        let mut guard = self.store.lock().unwrap();
        guard
            .entries
            .insert(key.to_string(), Entry { value, expires_at });
    }

    /// Snapshot of hit/miss/expiry counters and the current key count.
    pub fn stats(&self) -> CacheStats {
        let guard = self.store.lock().unwrap();
        CacheStats {
            keys: guard.entries.len(),
            stats: guard.counters,
        }
    }

    /// Drop entries past their expiry. Returns how many were removed.
    ///
    /// Sweep removals do not touch the read counters; `expired` only counts
    /// entries a reader actually observed as stale.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut guard = self.store.lock().unwrap();
        let before = guard.entries.len();
        guard.entries.retain(|_, entry| now < entry.expires_at);
        before - guard.entries.len()
    }

    /// Spawn the background sweep that bounds memory between reads.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.clock.sleep(interval).await;
                let purged = self.purge_expired();
                if purged > 0 {
                    debug!(purged, "cache sweep removed expired entries");
                }
            }
        })
    }
}

//! The `readModelMu`-guarded read-model cache: a map of canonical request
//! key to the last computed snapshots, plus an `in_flight` set used to
//! single-flight async refreshes triggered by the cache loop or a stale
//! read on the HTTP fast path.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use telemetry_core::CachedReadModelEntry;
use tokio::sync::Mutex;

/// How stale a cached fast-path hit may be before it still triggers an
/// async refresh (the read is still returned immediately either way).
pub const STALE_AFTER: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Inner {
    entries: HashMap<String, CachedReadModelEntry>,
    in_flight: HashSet<String>,
}

pub struct ReadModelCache {
    inner: Mutex<Inner>,
}

impl ReadModelCache {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    pub async fn get(&self, key: &str) -> Option<CachedReadModelEntry> {
        self.inner.lock().await.entries.get(key).cloned()
    }

    pub async fn is_stale(&self, entry: &CachedReadModelEntry) -> bool {
        Utc::now().signed_duration_since(entry.updated_at) > chrono::Duration::seconds(2)
    }

    pub async fn store(&self, key: String, snapshots: HashMap<String, telemetry_core::UsageSnapshot>) {
        let mut inner = self.inner.lock().await;
        inner.entries.insert(key, CachedReadModelEntry { snapshots, updated_at: Utc::now() });
    }

    /// Attempts to claim the refresh slot for `key`. Returns `true` if this
    /// caller should perform the refresh; `false` means one is already
    /// running and the caller should not start another.
    pub async fn try_begin_refresh(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().await;
        inner.in_flight.insert(key.to_string())
    }

    pub async fn finish_refresh(&self, key: &str) {
        self.inner.lock().await.in_flight.remove(key);
    }
}

impl Default for ReadModelCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_flight_refuses_second_claim() {
        let cache = ReadModelCache::new();
        assert!(cache.try_begin_refresh("k").await);
        assert!(!cache.try_begin_refresh("k").await);
        cache.finish_refresh("k").await;
        assert!(cache.try_begin_refresh("k").await);
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let cache = ReadModelCache::new();
        cache.store("k".to_string(), HashMap::new()).await;
        let entry = cache.get("k").await.unwrap();
        assert!(entry.snapshots.is_empty());
    }
}

//! In-process key/value cache with per-entry TTLs.
//!
//! Backed by [`moka`]; each entry carries its own time-to-live and the cache is bounded by
//! `cache.max_keys`. The cache is process-local, so multiple replicas each hold their own copy
//! and invalidation only reaches the replica that performed the write.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use moka::{Expiry, future::Cache};
use serde::Serialize;
use tracing::trace;

use crate::config::CacheConfig;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expire each entry after the TTL it was stored with. Overwriting a key restarts its clock.
struct PerEntryTtl;

impl<V> Expiry<String, Entry<V>> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry<V>, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub keys: u64,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Clone)]
pub struct TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<String, Entry<V>>,
    default_ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_keys: u64, default_ttl: Duration) -> Self {
        let inner = Cache::builder().max_capacity(max_keys).expire_after(PerEntryTtl).build();

        Self {
            inner,
            default_ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_keys, config.default_ttl)
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        match self.inner.get(key).await {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Cache hit");
                Some(entry.value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Cache miss");
                None
            }
        }
    }

    /// Store `value` under `key`. `None` uses the default TTL.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.inner.insert(key.into(), Entry { value, ttl }).await;
    }

    /// Returns whether the key was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.remove(key).await.is_some()
    }

    /// Remove every key containing `pattern`. Linear in the number of keys.
    pub async fn delete_by_pattern(&self, pattern: &str) -> usize {
        let matching: Vec<Arc<String>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key)
            .collect();

        let mut removed = 0;
        for key in matching {
            if self.inner.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }

        trace!(pattern, removed, "Cache pattern invalidation");
        removed
    }

    pub async fn flush(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.iter().map(|(key, _)| key.as_str().to_string()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            keys: self.inner.iter().count() as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Purge expired entries and apply pending evictions.
    pub async fn sweep(&self) {
        self.inner.run_pending_tasks().await;
    }
}

/// Cache key builders. Keys are namespaced by what they hold so pattern invalidation stays
/// targeted.
pub mod keys {
    use crate::types::{CategoryId, RestaurantId, UserId};

    pub const ADMIN_STATS: &str = "admin:stats";

    pub fn public_menu(slug: &str) -> String {
        format!("public:menu:{slug}")
    }

    pub fn owner_restaurants(owner_id: UserId) -> String {
        format!("owner:{owner_id}:restaurants")
    }

    /// Prefix matching every key scoped to one owner
    pub fn owner_prefix(owner_id: UserId) -> String {
        format!("owner:{owner_id}:")
    }

    pub fn restaurant_categories(restaurant_id: RestaurantId) -> String {
        format!("restaurant:{restaurant_id}:categories")
    }

    pub fn category_items(category_id: CategoryId) -> String {
        format!("category:{category_id}:items")
    }
}

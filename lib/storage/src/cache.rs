//! Result cache
//!
//! Advisory key -> value cache with a per-entry time to live. Matching works
//! the same without it, only slower for repeated queries.

use moka::sync::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Cache consulted before matching and populated after
pub trait ResultCache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;

    fn set(&self, key: &str, value: V, ttl: Duration);

    /// Drop every entry
    fn clear(&self);
}

struct PerEntryTtl;

impl<V> Expiry<String, (V, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(V, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// Bounded in-memory cache; lookups on one key never wait on another
pub struct MemoryCache<V> {
    inner: Cache<String, (V, Duration)>,
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Approximate number of live entries
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl<V> ResultCache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|(value, _)| value)
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        self.inner.insert(key.to_string(), (value, ttl));
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }
}

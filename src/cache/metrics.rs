//! Load and cache counters
//!
//! Shared between the cache and the loader through [`AssetMetricsHandle`].

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks loading and caching counters
#[derive(Debug, Default)]
pub struct AssetMetrics {
    load_times: RwLock<HashMap<String, Duration>>,
    load_counts: RwLock<HashMap<String, u64>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    pending_waits: AtomicU64,
    clones: AtomicU64,
    failures: AtomicU64,
}

impl AssetMetrics {
    /// Create a new instance of AssetMetrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a real (engine) load of `url`
    pub fn record_load(&self, url: &str, duration: Duration) {
        self.load_times.write().insert(url.to_string(), duration);
        *self.load_counts.write().entry(url.to_string()).or_insert(0) += 1;
    }

    /// Record a failed load
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache hit on a ready entry
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that joined an in-flight load
    pub fn record_pending_wait(&self) {
        self.pending_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a clone served from the cache
    pub fn record_clone(&self) {
        self.clones.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the cache hit rate as a percentage
    ///
    /// Requests that joined an in-flight load count as hits.
    pub fn cache_hit_rate(&self) -> f32 {
        let hits = (self.cache_hits.load(Ordering::Relaxed)
            + self.pending_waits.load(Ordering::Relaxed)) as f32;
        let misses = self.cache_misses.load(Ordering::Relaxed) as f32;

        if hits + misses > 0.0 {
            hits / (hits + misses) * 100.0
        } else {
            0.0
        }
    }

    /// Duration of the most recent load of `url`
    pub fn last_load_time(&self, url: &str) -> Option<Duration> {
        self.load_times.read().get(url).cloned()
    }

    /// Number of real loads of `url`
    pub fn load_count(&self, url: &str) -> u64 {
        *self.load_counts.read().get(url).unwrap_or(&0)
    }

    /// Number of real loads across all urls
    pub fn total_loads(&self) -> u64 {
        self.load_counts.read().values().sum()
    }

    /// Number of clones served
    pub fn clone_count(&self) -> u64 {
        self.clones.load(Ordering::Relaxed)
    }

    /// Number of requests that waited on an in-flight load
    pub fn pending_wait_count(&self) -> u64 {
        self.pending_waits.load(Ordering::Relaxed)
    }

    /// Number of failed loads
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Get all recorded load times
    pub fn all_load_times(&self) -> HashMap<String, Duration> {
        self.load_times.read().clone()
    }
}

/// A thread-safe wrapper around AssetMetrics
#[derive(Debug, Clone, Default)]
pub struct AssetMetricsHandle(Arc<AssetMetrics>);

impl AssetMetricsHandle {
    /// Create a new metrics handle
    pub fn new() -> Self {
        Self(Arc::new(AssetMetrics::new()))
    }

    /// Get a reference to the underlying metrics
    pub fn inner(&self) -> &AssetMetrics {
        &self.0
    }
}

impl std::ops::Deref for AssetMetricsHandle {
    type Target = AssetMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

//! Clone cache for loaded assets
//!
//! The first request for a url performs the real load and keeps the result
//! as the canonical copy. Every later request, including ones that arrive
//! while the load is still in flight, receives an instantiated clone of it
//! (see [`LoadedAsset::instantiate`]).

pub mod metrics;

use futures::channel::oneshot;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use xxhash_rust::xxh3::Xxh3;

use crate::error::{LoadError, Result};
use crate::model::LoadedAsset;
use metrics::AssetMetricsHandle;

type Waiter = oneshot::Sender<Result<LoadedAsset>>;

enum Slot {
    /// A load is in flight; these requests wait on it
    Pending(Vec<Waiter>),
    /// The canonical copy
    Ready(LoadedAsset),
}

struct CacheEntry {
    url: String,
    slot: Slot,
}

/// Result of [`AssetCache::request`]
pub enum CacheLookup {
    /// A fresh clone of the canonical copy
    Ready(LoadedAsset),
    /// Another request is loading this url; await its result
    Pending(PendingLoad),
    /// Nobody has this url; the caller must load it and fill the slot
    Miss(CacheFill),
}

/// A request waiting on a load already in flight
#[derive(Debug)]
pub struct PendingLoad {
    url: String,
    receiver: oneshot::Receiver<Result<LoadedAsset>>,
}

impl PendingLoad {
    /// Url being waited on
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the in-flight load
    ///
    /// Resolves to `None` if the loading request was dropped before it
    /// finished; the slot is free again and the caller should
    /// [`request`](AssetCache::request) it anew. Clearing the cache resolves
    /// to [`LoadError::Cancelled`].
    pub async fn wait(self) -> Option<Result<LoadedAsset>> {
        self.receiver.await.ok()
    }
}

/// Obligation to fill a pending cache slot
///
/// Dropping it without calling [`CacheFill::complete`] releases the slot;
/// its waiters see `None` from [`PendingLoad::wait`] and retry.
pub struct CacheFill {
    cache: AssetCache,
    key: u64,
    url: String,
    done: bool,
}

impl CacheFill {
    /// Url being loaded
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Publish the outcome of the load
    ///
    /// On success the asset becomes the canonical copy and each waiter gets
    /// its own clone. On failure the slot is removed so a later request can
    /// retry, and each waiter gets the error.
    pub fn complete(mut self, result: &Result<LoadedAsset>) {
        self.done = true;
        match result {
            Ok(asset) => self.cache.fill(self.key, &self.url, asset.clone()),
            Err(err) => self.cache.release(self.key, Some(err.clone())),
        }
    }
}

impl Drop for CacheFill {
    fn drop(&mut self) {
        if !self.done {
            log::debug!("Load of {} abandoned, releasing its slot", self.url);
            self.cache.release(self.key, None);
        }
    }
}

impl std::fmt::Debug for CacheFill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFill").field("url", &self.url).finish()
    }
}

/// Url-keyed store of canonical assets
///
/// Clones share the same store.
#[derive(Clone)]
pub struct AssetCache {
    entries: Arc<Mutex<HashMap<u64, CacheEntry>>>,
    metrics: AssetMetricsHandle,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCache {
    /// Creates an empty cache with its own metrics
    pub fn new() -> Self {
        Self::with_metrics(AssetMetricsHandle::new())
    }

    /// Creates an empty cache reporting into `metrics`
    pub fn with_metrics(metrics: AssetMetricsHandle) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            metrics,
        }
    }

    /// Look up `url`, reserving the slot on a miss
    pub fn request(&self, url: &str) -> CacheLookup {
        let key = Self::hash_url(url);
        let mut entries = self.entries.lock();

        match entries.get_mut(&key).map(|entry| &mut entry.slot) {
            Some(Slot::Ready(canonical)) => {
                self.metrics.record_cache_hit();
                self.metrics.record_clone();
                log::debug!("Cache hit for {url}");
                CacheLookup::Ready(canonical.instantiate())
            }
            Some(Slot::Pending(waiters)) => {
                self.metrics.record_pending_wait();
                log::debug!("Joining in-flight load of {url}");
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                CacheLookup::Pending(PendingLoad {
                    url: url.to_string(),
                    receiver,
                })
            }
            None => {
                self.metrics.record_cache_miss();
                entries.insert(
                    key,
                    CacheEntry {
                        url: url.to_string(),
                        slot: Slot::Pending(Vec::new()),
                    },
                );
                CacheLookup::Miss(CacheFill {
                    cache: self.clone(),
                    key,
                    url: url.to_string(),
                    done: false,
                })
            }
        }
    }

    /// A clone of the canonical copy of `url`, if it finished loading
    pub fn get(&self, url: &str) -> Option<LoadedAsset> {
        let entries = self.entries.lock();
        match entries.get(&Self::hash_url(url)).map(|entry| &entry.slot) {
            Some(Slot::Ready(canonical)) => {
                self.metrics.record_clone();
                Some(canonical.instantiate())
            }
            _ => None,
        }
    }

    /// Store `asset` as the canonical copy of `url`
    ///
    /// Requests waiting on an in-flight load of `url` are served from it.
    pub fn put(&self, url: &str, asset: LoadedAsset) {
        self.fill(Self::hash_url(url), url, asset);
    }

    /// Drop every entry; waiters on in-flight loads are cancelled
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.lock());
        for entry in entries.into_values() {
            if let Slot::Pending(waiters) = entry.slot {
                for waiter in waiters {
                    let _ = waiter.send(Err(LoadError::Cancelled(entry.url.clone())));
                }
            }
        }
    }

    /// Number of finished entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| matches!(entry.slot, Slot::Ready(_)))
            .count()
    }

    /// Whether no entry has finished loading
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `url` has finished loading
    pub fn contains(&self, url: &str) -> bool {
        matches!(
            self.entries.lock().get(&Self::hash_url(url)).map(|e| &e.slot),
            Some(Slot::Ready(_))
        )
    }

    /// Whether a load of `url` is in flight
    pub fn is_pending(&self, url: &str) -> bool {
        matches!(
            self.entries.lock().get(&Self::hash_url(url)).map(|e| &e.slot),
            Some(Slot::Pending(_))
        )
    }

    /// Urls of finished entries
    pub fn urls(&self) -> Vec<String> {
        self.entries
            .lock()
            .values()
            .filter(|entry| matches!(entry.slot, Slot::Ready(_)))
            .map(|entry| entry.url.clone())
            .collect()
    }

    /// Get a reference to the metrics handle
    pub fn metrics(&self) -> &AssetMetricsHandle {
        &self.metrics
    }

    fn fill(&self, key: u64, url: &str, asset: LoadedAsset) {
        let previous = self.entries.lock().insert(
            key,
            CacheEntry {
                url: url.to_string(),
                slot: Slot::Ready(asset.clone()),
            },
        );

        if let Some(CacheEntry {
            slot: Slot::Pending(waiters),
            ..
        }) = previous
        {
            for waiter in waiters {
                self.metrics.record_clone();
                let _ = waiter.send(Ok(asset.instantiate()));
            }
        }
    }

    /// Remove a pending slot, sending `err` to its waiters or dropping them
    fn release(&self, key: u64, err: Option<LoadError>) {
        let mut entries = self.entries.lock();
        // a cleared or refilled slot is not ours to remove
        if !matches!(entries.get(&key).map(|e| &e.slot), Some(Slot::Pending(_))) {
            return;
        }
        let removed = entries.remove(&key);
        drop(entries);

        if let (
            Some(CacheEntry {
                slot: Slot::Pending(waiters),
                ..
            }),
            Some(err),
        ) = (removed, err)
        {
            for waiter in waiters {
                let _ = waiter.send(Err(err.clone()));
            }
        }
    }

    fn hash_url(url: &str) -> u64 {
        let mut hasher = Xxh3::new();
        url.hash(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SceneNode;
    use futures::executor::block_on;

    fn chair() -> LoadedAsset {
        LoadedAsset::Node(SceneNode::new(Some("chair".into())))
    }

    fn expect_miss(lookup: CacheLookup) -> CacheFill {
        match lookup {
            CacheLookup::Miss(fill) => fill,
            _ => panic!("expected a miss"),
        }
    }

    fn expect_pending(lookup: CacheLookup) -> PendingLoad {
        match lookup {
            CacheLookup::Pending(pending) => pending,
            _ => panic!("expected a pending load"),
        }
    }

    #[test]
    fn test_cache_creation() {
        let cache = AssetCache::new();
        assert!(cache.is_empty());
        assert!(cache.get("a/chair.obj").is_none());
    }

    #[test]
    fn test_ready_entry_serves_fresh_clones() {
        let cache = AssetCache::new();
        let original = chair();
        cache.put("a/chair.obj", original.clone());

        let first = cache.get("a/chair.obj").unwrap();
        let second = match cache.request("a/chair.obj") {
            CacheLookup::Ready(asset) => asset,
            _ => panic!("expected a hit"),
        };

        let ids = [
            original.as_node().unwrap().id(),
            first.as_node().unwrap().id(),
            second.as_node().unwrap().id(),
        ];
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_eq!(cache.metrics().clone_count(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.urls(), vec!["a/chair.obj".to_string()]);
    }

    #[test]
    fn test_waiters_receive_clones_of_fill() {
        let cache = AssetCache::new();
        let fill = expect_miss(cache.request("a/chair.obj"));
        assert!(cache.is_pending("a/chair.obj"));

        let first = expect_pending(cache.request("a/chair.obj"));
        let second = expect_pending(cache.request("a/chair.obj"));

        let loaded = chair();
        fill.complete(&Ok(loaded.clone()));

        let a = block_on(first.wait()).unwrap().unwrap();
        let b = block_on(second.wait()).unwrap().unwrap();
        assert_eq!(a.name(), Some("chair"));
        assert_ne!(a.as_node().unwrap().id(), loaded.as_node().unwrap().id());
        assert_ne!(a.as_node().unwrap().id(), b.as_node().unwrap().id());
        assert!(cache.contains("a/chair.obj"));
        assert_eq!(cache.metrics().pending_wait_count(), 2);
    }

    #[test]
    fn test_failed_fill_reaches_waiters_and_frees_slot() {
        let cache = AssetCache::new();
        let fill = expect_miss(cache.request("a/chair.obj"));
        let waiter = expect_pending(cache.request("a/chair.obj"));

        let err = LoadError::Cancelled("boom".into());
        fill.complete(&Err(err.clone()));

        assert_eq!(block_on(waiter.wait()), Some(Err(err)));
        assert!(!cache.is_pending("a/chair.obj"));
        // next request retries
        assert!(matches!(cache.request("a/chair.obj"), CacheLookup::Miss(_)));
    }

    #[test]
    fn test_dropped_fill_frees_slot_for_waiters() {
        let cache = AssetCache::new();
        let fill = expect_miss(cache.request("a/chair.obj"));
        let waiter = expect_pending(cache.request("a/chair.obj"));
        drop(fill);

        assert_eq!(block_on(waiter.wait()), None);
        assert!(!cache.is_pending("a/chair.obj"));
        // the waiter takes over the load
        let fill = expect_miss(cache.request("a/chair.obj"));
        fill.complete(&Ok(chair()));
        assert!(cache.contains("a/chair.obj"));
    }

    #[test]
    fn test_clear_cancels_pending() {
        let cache = AssetCache::new();
        let fill = expect_miss(cache.request("a/chair.obj"));
        let waiter = expect_pending(cache.request("a/chair.obj"));
        cache.clear();

        assert!(matches!(
            block_on(waiter.wait()),
            Some(Err(LoadError::Cancelled(_)))
        ));
        // a late fill still lands
        fill.complete(&Ok(chair()));
        assert!(cache.contains("a/chair.obj"));
    }
}

//! Per-principal attribute cache with TTL expiry

use crate::attributes::AttributeMap;
use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    invalidation::{InvalidationEvent, InvalidationReason},
    types::{CacheKey, CacheStats, StatCounters},
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Time-bound store of merged attribute maps, keyed by principal id
///
/// - Entries live in a sharded concurrent map, so principals hashed to
///   different shards never contend
/// - Values are immutable `Arc<AttributeMap>`s replaced wholesale on `put`
/// - Expiry is lazy; an optional background task sweeps expired entries
/// - After [`close`](Self::close) every lookup misses and `put` stores nothing
pub struct AttributeCache {
    /// Cache configuration
    pub(crate) config: CacheConfig,

    entries: Arc<DashMap<CacheKey, Arc<CacheEntry>>>,

    stats: Arc<StatCounters>,

    closed: AtomicBool,

    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl AttributeCache {
    /// Create a new cache with the given configuration
    ///
    /// The background sweep is only started when enabled and when called
    /// from within a tokio runtime.
    pub fn new(config: CacheConfig) -> Self {
        info!("Initializing attribute cache with config: {:?}", config);

        let cache = Self {
            config,
            entries: Arc::new(DashMap::new()),
            stats: Arc::new(StatCounters::default()),
            closed: AtomicBool::new(false),
            cleanup_task: Mutex::new(None),
        };

        let task = cache.spawn_cleanup();
        *cache
            .cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = task;

        cache
    }

    /// Look up the cached attributes of a principal.
    ///
    /// Present only while the entry is younger than the TTL. An expired
    /// entry is removed and reported as a miss.
    pub fn lookup(&self, principal_id: &str) -> Option<Arc<AttributeMap>> {
        if self.is_closed() {
            self.record(&self.stats.misses, 1);
            return None;
        }

        let entry = self
            .entries
            .get(principal_id)
            .map(|entry| Arc::clone(entry.value()));

        match entry {
            Some(entry) if !entry.is_expired() => {
                entry.mark_accessed();
                self.record(&self.stats.hits, 1);
                debug!("Cache hit: {}", principal_id);
                Some(Arc::clone(&entry.value))
            }
            Some(expired) => {
                // Leave a fresher entry from a concurrent put in place
                self.entries
                    .remove_if(principal_id, |_, current| Arc::ptr_eq(current, &expired));
                self.record(&self.stats.misses, 1);
                self.record(&self.stats.evictions_ttl, 1);
                debug!("Cache entry expired: {}", principal_id);
                None
            }
            None => {
                self.record(&self.stats.misses, 1);
                debug!("Cache miss: {}", principal_id);
                None
            }
        }
    }

    /// Live entry of a principal, without touching statistics or access counts
    pub(crate) fn peek(&self, principal_id: &str) -> Option<Arc<AttributeMap>> {
        if self.is_closed() {
            return None;
        }
        self.entries
            .get(principal_id)
            .filter(|entry| !entry.is_expired())
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Store the attributes of a principal with a fresh timestamp.
    ///
    /// Returns `false` without storing anything once the cache is closed.
    pub fn put(&self, principal_id: &str, attributes: Arc<AttributeMap>) -> bool {
        if self.is_closed() {
            debug!("Ignoring put on closed cache: {}", principal_id);
            return false;
        }

        let entry = CacheEntry::new(principal_id.to_string(), attributes, self.config.ttl);
        self.entries.insert(principal_id.to_string(), Arc::new(entry));
        debug!("Cached attributes for principal: {}", principal_id);

        // close() may have cleared the map between the check and the insert
        if self.is_closed() {
            self.entries.remove(principal_id);
            return false;
        }
        true
    }

    /// Remove the entry of one principal
    pub fn invalidate(&self, principal_id: &str) -> bool {
        let removed = self.entries.remove(principal_id).is_some();
        if removed {
            self.record(&self.stats.invalidations, 1);
            debug!("Invalidated cache entry: {}", principal_id);
        }
        removed
    }

    /// Remove all entries
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.record(&self.stats.invalidations, count as u64);

        info!("Cleared {} entries from attribute cache", count);
        count
    }

    /// Remove all expired entries
    pub fn cleanup_expired(&self) -> Option<InvalidationEvent> {
        let expired = remove_expired(&self.entries);
        if expired.is_empty() {
            return None;
        }

        self.record(&self.stats.evictions_ttl, expired.len() as u64);
        debug!("Cleaned up {} expired entries", expired.len());

        Some(InvalidationEvent::new(InvalidationReason::Expired, expired))
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get number of entries in cache, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the background sweep is running
    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the background sweep and drop every entry. Idempotent.
    pub fn close(&self) -> Option<InvalidationEvent> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return None;
        }

        let task = self
            .cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }

        let keys: Vec<CacheKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        self.entries.clear();

        info!("Closed attribute cache, released {} entries", keys.len());
        Some(InvalidationEvent::new(InvalidationReason::Closed, keys))
    }

    fn record(&self, counter: &AtomicU64, amount: u64) {
        if self.config.enable_metrics {
            StatCounters::record(counter, amount);
        }
    }

    fn spawn_cleanup(&self) -> Option<JoinHandle<()>> {
        if !self.config.enable_auto_cleanup {
            return None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!("No tokio runtime, attribute cache relies on lazy expiry only");
                return None;
            }
        };

        let entries = Arc::downgrade(&self.entries);
        let stats = Arc::downgrade(&self.stats);
        let track = self.config.enable_metrics;
        let interval = self.config.cleanup_interval;

        Some(runtime.spawn(run_cleanup(entries, stats, track, interval)))
    }
}

impl Drop for AttributeCache {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background sweep; ends once the cache it watches is gone
async fn run_cleanup(
    entries: Weak<DashMap<CacheKey, Arc<CacheEntry>>>,
    stats: Weak<StatCounters>,
    track: bool,
    interval: std::time::Duration,
) {
    info!("Starting attribute cache cleanup task (interval: {:?})", interval);

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let (Some(entries), Some(stats)) = (entries.upgrade(), stats.upgrade()) else {
            break;
        };

        let expired = remove_expired(&entries);
        if !expired.is_empty() {
            if track {
                StatCounters::record(&stats.evictions_ttl, expired.len() as u64);
            }
            debug!("Auto cleanup removed {} expired entries", expired.len());
        }
    }

    debug!("Attribute cache cleanup task stopped");
}

fn remove_expired(entries: &DashMap<CacheKey, Arc<CacheEntry>>) -> Vec<CacheKey> {
    let mut expired = Vec::new();

    entries.retain(|key, entry| {
        if entry.is_expired() {
            expired.push(key.clone());
            false
        } else {
            true
        }
    });

    expired
}

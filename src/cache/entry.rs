//! Cache entry management with TTL support

use crate::attributes::AttributeMap;
use crate::cache::types::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cached, merged attribute map for one principal
///
/// Entries are never modified after creation apart from the access
/// counter; a `put` replaces the whole entry. Freshness is measured on the
/// monotonic clock, so wall-clock adjustments neither extend nor cut short
/// the TTL. The `chrono` timestamps in [`CacheMetadata`] are informational.
#[derive(Debug)]
pub struct CacheEntry {
    /// The principal identifier
    pub key: CacheKey,

    /// The merged attributes
    pub value: Arc<AttributeMap>,

    /// Entry metadata
    pub metadata: CacheMetadata,

    inserted_at: Instant,

    ttl: Duration,

    access_count: AtomicU64,
}

impl CacheEntry {
    /// Create a new cache entry expiring `ttl` from now
    pub fn new(key: CacheKey, value: Arc<AttributeMap>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        // Clamp absurd TTLs rather than overflow chrono
        let wall_ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::max_value());
        let expires_at = created_at
            .checked_add_signed(wall_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            key,
            value,
            metadata: CacheMetadata {
                created_at,
                expires_at,
            },
            inserted_at: Instant::now(),
            ttl,
            access_count: AtomicU64::new(0),
        }
    }

    /// An entry is live while less than `ttl` has elapsed since insertion
    pub fn is_expired(&self) -> bool {
        self.is_expired_after(self.inserted_at.elapsed())
    }

    /// Whether the entry is expired once `elapsed` has passed since insertion
    pub fn is_expired_after(&self, elapsed: Duration) -> bool {
        elapsed >= self.ttl
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        self.ttl
            .checked_sub(self.inserted_at.elapsed())
            .filter(|remaining| !remaining.is_zero())
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    /// Record a cache hit on this entry
    pub fn mark_accessed(&self) {
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of cache hits served by this entry
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the entry was created
    pub created_at: DateTime<Utc>,

    /// When the entry expires
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attribute_map;
    use std::thread::sleep;

    fn value() -> Arc<AttributeMap> {
        Arc::new(attribute_map([("mail", vec!["casuser@example.org"])]))
    }

    #[test]
    fn test_cache_entry_creation() {
        let entry = CacheEntry::new("casuser".to_string(), value(), Duration::from_secs(3600));

        assert_eq!(entry.key, "casuser");
        assert_eq!(entry.value.len(), 1);
        assert!(!entry.is_expired());
        assert_eq!(entry.access_count(), 0);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("casuser".to_string(), value(), Duration::from_millis(100));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired());
        assert!(entry.time_until_expiration().is_none());
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let entry = CacheEntry::new("casuser".to_string(), value(), Duration::from_secs(10));

        assert!(!entry.is_expired_after(Duration::from_millis(9_999)));
        assert!(entry.is_expired_after(Duration::from_secs(10)));
    }

    #[test]
    fn test_freshness_ignores_wall_clock_metadata() {
        let mut entry = CacheEntry::new("casuser".to_string(), value(), Duration::from_secs(3600));

        // A wall clock stepped far forward leaves the entry live
        entry.metadata.created_at -= chrono::Duration::days(1);
        entry.metadata.expires_at -= chrono::Duration::days(1);

        assert!(!entry.is_expired());
        assert!(entry.time_until_expiration().is_some());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = CacheEntry::new("casuser".to_string(), value(), Duration::MAX);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_mark_accessed() {
        let entry = CacheEntry::new("casuser".to_string(), value(), Duration::from_secs(3600));
        entry.mark_accessed();
        entry.mark_accessed();
        assert_eq!(entry.access_count(), 2);
    }

    #[test]
    fn test_age() {
        let entry = CacheEntry::new("casuser".to_string(), value(), Duration::from_secs(3600));

        sleep(Duration::from_millis(10));
        assert!(entry.age() >= Duration::from_millis(10));
    }
}

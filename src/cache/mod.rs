//! # Attribute Cache
//!
//! Per-principal storage of merged attribute maps with a fixed time-to-live.
//!
//! ## Features
//!
//! - **TTL-Based Expiration**: an entry older than the configured TTL is a miss
//! - **Sharded Concurrency**: lookups for different principals do not share a lock
//! - **Background Sweep**: optional periodic removal of expired entries
//! - **Metrics**: hit/miss/expiry counters
//! - **Scoped Shutdown**: `close` stops the sweep and empties the cache for good
//!
//! ## Example
//!
//! ```rust
//! use principal_attributes::attributes::attribute_map;
//! use principal_attributes::cache::{AttributeCache, CacheConfig, TtlUnit};
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::with_ttl(5, TtlUnit::Seconds)?;
//! let cache = AttributeCache::new(config);
//!
//! let attributes = attribute_map([("mail", vec!["casuser@example.org"])]);
//! cache.put("casuser", Arc::new(attributes));
//!
//! if let Some(cached) = cache.lookup("casuser") {
//!     println!("Cache hit: {:?}", cached);
//! }
//!
//! cache.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod invalidation;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, TtlUnit};
pub use entry::{CacheEntry, CacheMetadata};
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use store::AttributeCache;
pub use types::{CacheKey, CacheStats};

//! # Principal Attributes
//!
//! A caching, attribute-merging principal repository for single sign-on
//! servers.
//!
//! ## Features
//!
//! - Per-principal TTL cache of merged attribute maps
//! - Concurrent, timeout-bounded fetching from pluggable attribute sources
//! - ADD, REPLACE, MULTIVALUED and NONE merging strategies
//! - Source filtering by repository id, adjustable at runtime
//! - Coalescing of concurrent cache misses for the same principal
//! - Graceful degradation: failing sources contribute nothing, a closed
//!   repository releases the principal's own attributes
//!
//! ## Resolving Attributes
//!
//! ```
//! use principal_attributes::{
//!     attribute_map, AttributeSource, CachingAttributeRepository, MergingStrategy, Principal,
//!     RepositoryConfig, ServiceContext, StaticAttributeSource, TtlUnit,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let directory: Arc<dyn AttributeSource> = Arc::new(StaticAttributeSource::returning(
//!         "ldap",
//!         attribute_map([("mail", vec!["casuser@example.org"]), ("cn", vec!["CAS User"])]),
//!     ));
//!
//!     let config = RepositoryConfig::builder()
//!         .ttl(30, TtlUnit::Minutes)
//!         .merging_strategy(MergingStrategy::Replace)
//!         .attribute_repository_ids(["ldap"])
//!         .build()?;
//!     let repository = CachingAttributeRepository::new(config, vec![directory])?;
//!
//!     let principal = Principal::new("casuser").attribute("uid", ["casuser"]);
//!     let service = ServiceContext::new("https://app.example.org");
//!
//!     let attributes = repository.get_attributes(&principal, &service).await;
//!     assert_eq!(attributes.len(), 3);
//!
//!     repository.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration From The Environment
//!
//! ```no_run
//! use principal_attributes::{CachingAttributeRepository, RepositoryConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! // ATTRIBUTE_CACHE_TTL=8 ATTRIBUTE_CACHE_TTL_UNIT=hours ATTRIBUTE_REPOSITORY_IDS=ldap,jdbc
//! let config = RepositoryConfig::from_env()?;
//! let repository = CachingAttributeRepository::new(config, Vec::new())?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod cache;
pub mod error;
pub mod repository;
pub mod source;

// Re-export main types for convenience
pub use attributes::{
    attribute_map, combine_sources, from_json, merge, AttributeMap, AttributeValue,
    MergingStrategy, Principal, ResolvedAttribute, ResolvedAttributes, ServiceContext,
};
pub use cache::{AttributeCache, CacheConfig, CacheConfigBuilder, CacheStats, TtlUnit};
pub use error::{AttributeError, Result};
pub use repository::{
    CachingAttributeRepository, DefaultAttributeRepository, PrincipalAttributesRepository,
    RepositoryConfig, RepositoryConfigBuilder, ResolutionSettings,
};
pub use source::{AttributeSource, SourceFetcher, StaticAttributeSource};

//! Principal attribute repositories
//!
//! A repository turns a principal into the attribute set released to a
//! service. [`CachingAttributeRepository`] consults external sources and
//! caches the merged result; [`DefaultAttributeRepository`] releases the
//! principal's own attributes and is what the caching repository falls
//! back to once closed.

pub mod caching;
pub mod config;
pub mod settings;

use crate::attributes::{Principal, ResolvedAttributes, ServiceContext};
use async_trait::async_trait;

pub use caching::CachingAttributeRepository;
pub use config::{RepositoryConfig, RepositoryConfigBuilder};
pub use settings::ResolutionSettings;

/// Source of the attributes released for a principal
#[async_trait]
pub trait PrincipalAttributesRepository: Send + Sync {
    async fn get_attributes(&self, principal: &Principal, service: &ServiceContext) -> ResolvedAttributes;

    /// Release held resources. Idempotent.
    fn close(&self) {}
}

/// Repository that releases the principal's own attributes unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAttributeRepository;

#[async_trait]
impl PrincipalAttributesRepository for DefaultAttributeRepository {
    async fn get_attributes(&self, principal: &Principal, _service: &ServiceContext) -> ResolvedAttributes {
        ResolvedAttributes::from(&principal.attributes)
    }
}

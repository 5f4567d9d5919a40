//! External attribute sources
//!
//! A source answers to one or more stable identifiers and, given a
//! principal id, returns additional attributes for that principal.

pub mod fetch;
pub mod stub;

use crate::attributes::AttributeMap;
use crate::error::Result;
use async_trait::async_trait;

pub use fetch::{FetchOutcome, FetchReport, SourceFetcher};
pub use stub::StaticAttributeSource;

/// A directory, database or service that supplies principal attributes
#[async_trait]
pub trait AttributeSource: Send + Sync {
    /// Identifiers this source can be selected by
    fn ids(&self) -> Vec<String>;

    /// Fetch the attributes of a principal.
    ///
    /// `Ok(None)` means the source knows nothing about the principal.
    async fn fetch(&self, principal_id: &str) -> Result<Option<AttributeMap>>;

    /// Whether any identifier of this source is in `allowed`
    fn is_allowed(&self, allowed: &std::collections::BTreeSet<String>) -> bool {
        self.ids().iter().any(|id| allowed.contains(id))
    }

    /// Identifier used in logs and errors
    fn display_id(&self) -> String {
        self.ids().join(",")
    }
}

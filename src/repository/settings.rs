//! Runtime-adjustable resolution settings

use crate::attributes::MergingStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Merging strategy and source filter applied on a cache miss.
///
/// Values are immutable; changes produce a new snapshot that replaces the
/// shared one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSettings {
    pub merging_strategy: MergingStrategy,
    pub attribute_repository_ids: BTreeSet<String>,
}

impl ResolutionSettings {
    pub fn new(merging_strategy: MergingStrategy, attribute_repository_ids: BTreeSet<String>) -> Self {
        Self {
            merging_strategy,
            attribute_repository_ids,
        }
    }

    /// Copy with a different merging strategy
    pub fn with_merging_strategy(&self, merging_strategy: MergingStrategy) -> Self {
        Self {
            merging_strategy,
            attribute_repository_ids: self.attribute_repository_ids.clone(),
        }
    }

    /// Copy with a different source filter
    pub fn with_attribute_repository_ids<I, S>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            merging_strategy: self.merging_strategy,
            attribute_repository_ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

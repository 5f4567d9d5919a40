//! Attribute merging strategies
//!
//! Merging combines a principal's existing attributes with attributes
//! fetched from sources. All functions here are pure.

use crate::attributes::types::AttributeMap;
use crate::error::AttributeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy for resolving attribute names present on both sides of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MergingStrategy {
    /// Fetched values overwrite existing ones
    Replace,
    /// Fetched attributes only fill names missing from the existing map
    Add,
    /// Colliding values are combined into one sequence
    #[default]
    Multivalued,
    /// Fetched attributes are ignored
    None,
}

impl MergingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "REPLACE",
            Self::Add => "ADD",
            Self::Multivalued => "MULTIVALUED",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for MergingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergingStrategy {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REPLACE" => Ok(Self::Replace),
            "ADD" => Ok(Self::Add),
            "MULTIVALUED" => Ok(Self::Multivalued),
            "NONE" => Ok(Self::None),
            other => Err(AttributeError::ConfigError(format!(
                "unknown merging strategy: {}",
                other
            ))),
        }
    }
}

/// Merge `fetched` into `existing` according to `strategy`.
///
/// Every existing attribute is kept, empty sequences included, unless a
/// fetched value takes its place. An empty existing sequence counts as
/// absent, so any strategy fills it. Empty fetched sequences are ignored.
/// It follows that an empty `fetched` map returns `existing` unchanged.
pub fn merge(existing: &AttributeMap, fetched: &AttributeMap, strategy: MergingStrategy) -> AttributeMap {
    match strategy {
        MergingStrategy::None => existing.clone(),
        MergingStrategy::Add => merge_add(existing, fetched),
        MergingStrategy::Replace => merge_replace(existing, fetched),
        MergingStrategy::Multivalued => merge_multivalued(existing, fetched),
    }
}

/// Combine the results of several sources, in order.
///
/// Later sources overwrite earlier ones per attribute name. Empty value
/// sequences never overwrite.
pub fn combine_sources<'a, I>(results: I) -> AttributeMap
where
    I: IntoIterator<Item = &'a AttributeMap>,
{
    results
        .into_iter()
        .fold(AttributeMap::new(), |combined, next| merge_replace(&combined, next))
}

fn merge_add(existing: &AttributeMap, fetched: &AttributeMap) -> AttributeMap {
    let mut result = existing.clone();
    for (name, values) in fetched {
        if values.is_empty() {
            continue;
        }
        match result.get_mut(name) {
            Some(current) if !current.is_empty() => {}
            Some(current) => current.clone_from(values),
            None => {
                result.insert(name.clone(), values.clone());
            }
        }
    }
    result
}

fn merge_replace(existing: &AttributeMap, fetched: &AttributeMap) -> AttributeMap {
    let mut result = existing.clone();
    for (name, values) in fetched {
        if values.is_empty() {
            continue;
        }
        result.insert(name.clone(), values.clone());
    }
    result
}

fn merge_multivalued(existing: &AttributeMap, fetched: &AttributeMap) -> AttributeMap {
    let mut result = existing.clone();
    for (name, values) in fetched {
        if values.is_empty() {
            continue;
        }
        match result.get_mut(name) {
            // Identical sequences are kept once
            Some(current) if current == values => {}
            Some(current) => current.extend(values.iter().cloned()),
            None => {
                result.insert(name.clone(), values.clone());
            }
        }
    }
    result
}

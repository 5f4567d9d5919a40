//! Caller-facing attribute shape
//!
//! An attribute with exactly one value is exposed as that bare value; an
//! attribute with several values is exposed as the sequence.

use crate::attributes::types::{AttributeMap, AttributeValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// A single resolved attribute
///
/// Serialization is one-way. A single value that is itself a JSON array
/// serializes exactly like a sequence, so the shape cannot be read back;
/// use [`ResolvedAttributes::to_attribute_map`] to recover sequences.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedAttribute {
    Multi(Vec<AttributeValue>),
    Single(AttributeValue),
}

impl ResolvedAttribute {
    /// The bare value, if single-valued
    pub fn as_single(&self) -> Option<&AttributeValue> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(_) => None,
        }
    }

    /// The sequence, if multi-valued
    pub fn as_multi(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::Single(_) => None,
            Self::Multi(values) => Some(values),
        }
    }

    /// The bare value as a string, if single-valued and a string
    pub fn as_str(&self) -> Option<&str> {
        self.as_single().and_then(|v| v.as_str())
    }

    /// Whether `value` is one of the values of this attribute
    pub fn contains(&self, value: &AttributeValue) -> bool {
        match self {
            Self::Single(single) => single == value,
            Self::Multi(values) => values.contains(value),
        }
    }

    /// All values as a sequence
    pub fn values(&self) -> Vec<AttributeValue> {
        match self {
            Self::Single(value) => vec![value.clone()],
            Self::Multi(values) => values.clone(),
        }
    }
}

/// Resolved attributes keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedAttributes(BTreeMap<String, ResolvedAttribute>);

impl ResolvedAttributes {
    pub fn get(&self, name: &str) -> Option<&ResolvedAttribute> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedAttribute)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, ResolvedAttribute> {
        self.0
    }

    /// Convert back to the sequence form
    pub fn to_attribute_map(&self) -> AttributeMap {
        self.0
            .iter()
            .map(|(name, attribute)| (name.clone(), attribute.values()))
            .collect()
    }
}

impl From<&AttributeMap> for ResolvedAttributes {
    fn from(map: &AttributeMap) -> Self {
        let resolved = map
            .iter()
            .filter_map(|(name, values)| {
                let attribute = match values.as_slice() {
                    [] => return None,
                    [single] => ResolvedAttribute::Single(single.clone()),
                    many => ResolvedAttribute::Multi(many.to_vec()),
                };
                Some((name.clone(), attribute))
            })
            .collect();
        Self(resolved)
    }
}

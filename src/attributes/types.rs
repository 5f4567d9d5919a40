//! Core attribute types: principals, attribute maps and JSON conversion

use crate::error::{AttributeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute value - a string or any opaque JSON value
pub type AttributeValue = serde_json::Value;

/// Attribute name -> ordered sequence of values
///
/// Internally every attribute is a sequence, even when it holds one value.
/// See [`crate::attributes::presentation`] for the caller-facing shape.
pub type AttributeMap = BTreeMap<String, Vec<AttributeValue>>;

/// An authenticated identity with its already-known attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Identifier, unique within the system
    pub id: String,

    /// Attributes known at authentication time
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl Principal {
    /// Create a principal without attributes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: AttributeMap::new(),
        }
    }

    /// Create a principal with the given attributes
    pub fn with_attributes(id: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Add a string-valued attribute
    pub fn attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes.insert(name.into(), string_values(values));
        self
    }
}

/// The caller-side service requesting attributes.
///
/// Accepted by the repository for release-policy callers; the caching and
/// merge core never reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    /// Service identifier
    pub id: String,

    /// Human readable name
    pub name: Option<String>,
}

impl ServiceContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Convert a list of strings into attribute values
pub fn string_values<I, V>(values: I) -> Vec<AttributeValue>
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    values
        .into_iter()
        .map(|v| AttributeValue::String(v.into()))
        .collect()
}

/// Build an attribute map from `(name, values)` string pairs
pub fn attribute_map<'a, I>(entries: I) -> AttributeMap
where
    I: IntoIterator<Item = (&'a str, Vec<&'a str>)>,
{
    entries
        .into_iter()
        .map(|(name, values)| (name.to_string(), string_values(values)))
        .collect()
}

/// Convert a JSON document into an attribute map.
///
/// Accepts an object whose members are scalars, arrays or objects. A
/// non-array member becomes a one-element sequence and `null` becomes an
/// empty sequence. Anything other than an object is malformed.
pub fn from_json(source_id: &str, document: serde_json::Value) -> Result<AttributeMap> {
    let object = match document {
        serde_json::Value::Object(object) => object,
        other => {
            return Err(AttributeError::MalformedSourceData {
                source_id: source_id.to_string(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            })
        }
    };

    let mut attributes = AttributeMap::new();
    for (name, value) in object {
        if name.is_empty() {
            return Err(AttributeError::MalformedSourceData {
                source_id: source_id.to_string(),
                reason: "attribute with empty name".to_string(),
            });
        }
        let values = match value {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter(|item| !item.is_null())
                .collect(),
            scalar => vec![scalar],
        };
        attributes.insert(name, values);
    }

    Ok(attributes)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

//! In-memory attribute source

use crate::attributes::{from_json, AttributeMap};
use crate::error::Result;
use crate::source::AttributeSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Attribute source backed by in-memory maps.
///
/// Answers with the attributes registered for a principal id, falling back
/// to a default map returned for every principal. Contents can be replaced
/// at runtime.
pub struct StaticAttributeSource {
    ids: Vec<String>,
    by_principal: RwLock<HashMap<String, AttributeMap>>,
    default_attributes: RwLock<Option<AttributeMap>>,
}

impl StaticAttributeSource {
    /// Create an empty source
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_ids(vec![id.into()])
    }

    /// Create an empty source answering to several identifiers
    pub fn with_ids(ids: Vec<String>) -> Self {
        Self {
            ids,
            by_principal: RwLock::new(HashMap::new()),
            default_attributes: RwLock::new(None),
        }
    }

    /// Source returning `attributes` for every principal
    pub fn returning(id: impl Into<String>, attributes: AttributeMap) -> Self {
        let source = Self::new(id);
        source.set_default_attributes(attributes);
        source
    }

    /// Source returning the attributes of a JSON object for every principal
    pub fn from_json(id: impl Into<String>, document: serde_json::Value) -> Result<Self> {
        let id = id.into();
        let attributes = from_json(&id, document)?;
        Ok(Self::returning(id, attributes))
    }

    /// Register the attributes of one principal
    pub fn with_principal(self, principal_id: impl Into<String>, attributes: AttributeMap) -> Self {
        self.set_attributes(principal_id, attributes);
        self
    }

    pub fn set_attributes(&self, principal_id: impl Into<String>, attributes: AttributeMap) {
        self.by_principal
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(principal_id.into(), attributes);
    }

    pub fn set_default_attributes(&self, attributes: AttributeMap) {
        *self
            .default_attributes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(attributes);
    }

    /// Forget every registered attribute
    pub fn clear(&self) {
        self.by_principal
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        *self
            .default_attributes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

#[async_trait]
impl AttributeSource for StaticAttributeSource {
    fn ids(&self) -> Vec<String> {
        self.ids.clone()
    }

    async fn fetch(&self, principal_id: &str) -> Result<Option<AttributeMap>> {
        let specific = self
            .by_principal
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(principal_id)
            .cloned();

        if specific.is_some() {
            return Ok(specific);
        }

        Ok(self
            .default_attributes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }
}

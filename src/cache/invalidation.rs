//! Records of principals dropped from the cache in bulk

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// Older than the TTL
    Expired,
    /// Released by `close`
    Closed,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvalidationReason::Expired => "expired",
            InvalidationReason::Closed => "released on close",
        })
    }
}

/// Principals whose cached attributes were dropped together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub reason: InvalidationReason,
    pub at: DateTime<Utc>,
    pub principal_ids: Vec<String>,
}

impl InvalidationEvent {
    pub fn new(reason: InvalidationReason, principal_ids: Vec<String>) -> Self {
        Self {
            reason,
            at: Utc::now(),
            principal_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.principal_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principal_ids.is_empty()
    }

    pub fn contains(&self, principal_id: &str) -> bool {
        self.principal_ids.iter().any(|id| id == principal_id)
    }
}

impl fmt::Display for InvalidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached principals {} at {}",
            self.len(),
            self.reason,
            self.at.to_rfc3339()
        )
    }
}

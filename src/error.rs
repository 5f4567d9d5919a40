//! Error types for attribute resolution
//!
//! Source failures are recovered inside the repository and only surface
//! through the strict resolution path. Configuration errors fail fast.

use thiserror::Error;

/// Main error type for attribute repository operations
#[derive(Error, Debug)]
pub enum AttributeError {
    /// An attribute source could not be reached
    #[error("Attribute source '{source_id}' unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// An attribute source did not answer in time
    #[error("Attribute source '{source_id}' timed out after {timeout_ms}ms")]
    SourceTimeout { source_id: String, timeout_ms: u64 },

    /// An attribute source returned data that is not an attribute mapping
    #[error("Malformed data from attribute source '{source_id}': {reason}")]
    MalformedSourceData { source_id: String, reason: String },

    /// Every allowed source failed while a fresh result was required
    #[error("All {attempted} allowed attribute sources failed")]
    AllSourcesFailed { attempted: usize },

    /// The repository has been closed
    #[error("Attribute repository is closed")]
    RepositoryClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl AttributeError {
    /// Whether this error describes a single source failing, which the
    /// repository recovers from by treating the contribution as empty.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            AttributeError::SourceUnavailable { .. }
                | AttributeError::SourceTimeout { .. }
                | AttributeError::MalformedSourceData { .. }
        )
    }
}

/// Result type alias for attribute operations
pub type Result<T> = std::result::Result<T, AttributeError>;

impl From<String> for AttributeError {
    fn from(s: String) -> Self {
        AttributeError::Other(s)
    }
}

impl From<&str> for AttributeError {
    fn from(s: &str) -> Self {
        AttributeError::Other(s.to_string())
    }
}

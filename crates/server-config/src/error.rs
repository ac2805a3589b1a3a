//! Server config errors

use thiserror::Error;

/// Errors that can occur while building a node configuration document
#[derive(Debug, Error)]
pub enum ServerConfigError {
    /// A document that must be a JSON object was something else
    #[error("Invalid {which} document: expected a JSON object, found {found}")]
    InvalidDocument {
        /// Which side of the merge was rejected ("model" or "overlay")
        which: &'static str,
        /// JSON type actually found
        found: &'static str,
    },

    /// JSON encoding of the merged document failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

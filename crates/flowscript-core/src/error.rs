//! Error types for flowscript-core

use thiserror::Error;

/// Result type alias for flowscript-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flowscript-core
///
/// Detection and validation never surface these to callers; they fold them
/// into their result types. Only loading and configuration return them.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A document on disk exceeds the size bound
    #[error(
        "document '{path}' is {size} bytes, above the {limit} byte limit; split it into smaller flows and compose them with `import`"
    )]
    DocumentTooLarge {
        /// Path of the oversized document
        path: String,
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for program generation
//!
//! Only whole-document problems are errors. A malformed step never fails
//! generation; it becomes a comment in the output plus a warning.

use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during program generation
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load the document
    #[error("failed to load document: {0}")]
    Load(#[from] flowscript_core::Error),

    /// Document root is not a usable mapping
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Error description
        message: String,
    },

    /// No tasks to generate
    #[error("document has no tasks; add a non-empty 'tasks' list")]
    MissingTasks,

    /// Unknown boilerplate template
    #[error("unsupported template '{name}'; available templates: {available}")]
    UnsupportedTemplate {
        /// Requested template
        name: String,
        /// Comma-separated list of known templates
        available: String,
    },

    /// Template rendering failed
    #[error("template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    /// IO error while writing the program
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

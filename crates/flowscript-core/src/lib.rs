//! FlowScript Core Library
//!
//! This crate provides the document side of FlowScript:
//! - Document loading (YAML, JSON, or an already-parsed tree)
//! - Step classification and flow-tree traversal
//! - Mode detection (native vs extended)
//! - Four-level validation with structured diagnostics
//! - Collaborator contracts for execution backends
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Document   │────▶│  Detector   │────▶│  Validator  │
//! │   (YAML)    │     │  (walker)   │     │  (report)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use flowscript_core::{DocumentSource, Limits, detect, validate};
//!
//! let source = DocumentSource::guess("./flows/login.yaml");
//! let detection = detect(source.clone(), &Limits::default());
//! if detection.needs_code_gen {
//!     let report = validate(source);
//!     println!("valid: {}", report.valid);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod bindings;
pub mod config;
pub mod detector;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod expression;
pub mod step;
pub mod validator;
pub mod walker;

pub use config::{Config, Limits, ProjectConfig};
pub use detector::{Detection, Feature, detect, detect_document};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity, ValidationReport};
pub use document::{Document, DocumentSource, Mode, Platform, Task};
pub use error::{Error, Result};
pub use step::{Step, StepKind};
pub use validator::{Validator, validate};
pub use walker::FlowWalker;

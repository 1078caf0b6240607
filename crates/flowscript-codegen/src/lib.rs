//! FlowScript Code Generation
//!
//! This crate handles the extended YAML → JavaScript pipeline.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌─────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐
//! │  YAML   │────▶│  Steps   │────▶│  Body    │────▶│ Program  │
//! │ Script  │     │(Classify)│     │  (Gen)   │     │(Template)│
//! └─────────┘     └──────────┘     └──────────┘     └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use flowscript_codegen::{TranspileOptions, transpile};
//! use flowscript_core::DocumentSource;
//!
//! let output = transpile(
//!     DocumentSource::guess("flows/checkout.yaml"),
//!     TranspileOptions::default(),
//! )?;
//! println!("{}", output.code);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod generators;
pub mod target;
pub mod template;
pub mod transpiler;

pub use context::GenContext;
pub use error::{Error, Result};
pub use target::{AgentTarget, NamedAgent};
pub use template::TemplateKind;
pub use transpiler::{TranspileOptions, TranspileOutput, Transpiler, transpile};

//! Four-level document validation
//!
//! 1. **Syntax**: the document parses. A failure here is the only thing
//!    that stops the remaining levels.
//! 2. **Structure**: platform block, tasks, names, flows.
//! 3. **Mode-aware**: native documents are checked for constructs the
//!    automation engine would ignore; extended documents have each
//!    construct checked for required fields.
//! 4. **Semantic**: undefined variable references and the import graph.
//!
//! Later levels run even after earlier errors so one pass reports as much
//! as possible. Validation never fails; it always returns a report.

mod imports;
mod mode;
mod semantic;
mod structure;

use std::path::PathBuf;

use crate::config::{Config, Limits};
use crate::diagnostics::{DiagnosticKind, Diagnostics, ValidationReport};
use crate::document::{Document, DocumentSource};
use crate::error::Error;
use crate::walker::FlowWalker;

/// Document validator
#[derive(Debug, Clone, Default)]
pub struct Validator {
    limits: Limits,
    project_root: Option<PathBuf>,
}

impl Validator {
    /// Create a validator with the given limits
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            project_root: None,
        }
    }

    /// Create a validator from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: config.limits(),
            project_root: config.project_root(),
        }
    }

    /// Restrict imports to `root` instead of the document's directory
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Validate a document from any source
    pub fn validate(&self, source: DocumentSource) -> ValidationReport {
        match Document::load(source, &self.limits) {
            Ok(document) => self.validate_document(&document),
            Err(e) => {
                tracing::debug!("Validation stopped at syntax level: {}", e);
                let mut diags = Diagnostics::new();
                let message = match e {
                    Error::YamlParse(e) => format!("YAML syntax error: {}", e),
                    Error::Json(e) => format!("JSON syntax error: {}", e),
                    Error::Io(e) => format!("cannot read document: {}", e),
                    other => other.to_string(),
                };
                diags.error(DiagnosticKind::Parse, "", message);
                diags.into_report()
            }
        }
    }

    /// Validate an already-parsed document (levels 2 through 4)
    pub fn validate_document(&self, document: &Document) -> ValidationReport {
        let walker = FlowWalker::from_limits(&self.limits);
        let mut diags = Diagnostics::new();

        structure::check(document, &mut diags);
        mode::check(document, &walker, &self.limits, &mut diags);
        semantic::check(document, &walker, &mut diags);
        imports::check(
            document,
            &walker,
            &self.limits,
            self.project_root.as_deref(),
            &mut diags,
        );

        let report = diags.into_report();
        tracing::info!(
            "Validation finished: {} error(s), {} warning(s)",
            report.errors.len(),
            report.warnings.len()
        );
        report
    }
}

/// Validate with default limits
pub fn validate(source: DocumentSource) -> ValidationReport {
    Validator::default().validate(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use serde_json::json;

    fn validate_json(value: serde_json::Value) -> ValidationReport {
        validate(DocumentSource::Value(value))
    }

    #[test]
    fn test_native_document_is_valid() {
        let report = validate_json(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [{"aiTap": "btn"}]}]
        }));
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_syntax_error_aborts() {
        let report = validate(DocumentSource::Text("tasks: [\n  - name: x\n".to_string()));
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DiagnosticKind::Parse);
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let report = validate(DocumentSource::Path(PathBuf::from("/nonexistent/flow.yaml")));
        assert!(!report.valid);
        assert!(report.errors[0].message.contains("cannot read"));
    }

    #[test]
    fn test_later_levels_run_after_structural_errors() {
        // No platform block (structure error) and a bare try (construct error).
        let report = validate_json(json!({
            "tasks": [{"name": "t", "flow": [{"try": [{"aiTap": "x"}]}]}]
        }));
        assert!(!report.valid);
        assert!(report.of_kind(DiagnosticKind::Structure).count() >= 1);
        assert!(
            report
                .of_kind(DiagnosticKind::Construct)
                .any(|d| d.severity == Severity::Error)
        );
    }

    #[test]
    fn test_repeat_zero_count_is_warning_only() {
        let report = validate_json(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"loop": {"type": "repeat", "count": 0, "flow": [{"aiTap": "x"}]}}
            ]}]
        }));
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.warnings.iter().any(|w| w.message.contains("non-positive")));
    }

    #[test]
    fn test_shell_marker_is_safety_warning() {
        let report = validate_json(json!({
            "web": {"url": "https://x"},
            "variables": {"dir": "/tmp"},
            "tasks": [{"name": "t", "flow": [
                {"external_call": {"type": "shell", "command": "ls ${dir}"}}
            ]}]
        }));
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.of_kind(DiagnosticKind::Safety).count(), 1);
    }
}

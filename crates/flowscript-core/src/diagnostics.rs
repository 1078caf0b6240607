//! Validation diagnostics

use serde::Serialize;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks compilation
    Error,
    /// Advisory only
    Warning,
}

/// What class of problem a diagnostic reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Document could not be parsed
    Parse,
    /// Document shape is wrong
    Structure,
    /// An extended construct is malformed or questionable
    Construct,
    /// Undefined variable, unresolved import, or feature declaration mismatch
    Reference,
    /// Unbounded loop, injection-shaped input, or path traversal
    Safety,
    /// Imports form a cycle
    ImportCycle,
}

/// One finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Error or warning
    pub severity: Severity,
    /// Problem class
    pub kind: DiagnosticKind,
    /// Human-readable description
    pub message: String,
    /// Where in the document, e.g. `tasks[0].flow[3].loop`
    pub location: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// Outcome of validating one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// False whenever any error was recorded
    pub valid: bool,
    /// Blocking findings
    pub errors: Vec<Diagnostic>,
    /// Advisory findings
    pub warnings: Vec<Diagnostic>,
}

/// Accumulates diagnostics during one validation run
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn error(&mut self, kind: DiagnosticKind, location: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            severity: Severity::Error,
            kind,
            message: message.into(),
            location: location.into(),
        });
    }

    /// Record a warning
    pub fn warn(&mut self, kind: DiagnosticKind, location: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            location: location.into(),
        });
    }

    /// Finish into a report
    pub fn into_report(self) -> ValidationReport {
        ValidationReport {
            valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

impl ValidationReport {
    /// Diagnostics of `kind`, errors first
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(move |d| d.kind == kind)
    }
}

//! Collaborator contracts for running compiled scripts
//!
//! Execution and report parsing live outside this workspace. These traits
//! describe what a runner must provide so callers can swap implementations
//! (a local Node process, a remote farm, a test double).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// What to execute
#[derive(Debug, Clone)]
pub enum Executable {
    /// A generated JavaScript program
    Program(String),
    /// An original document, run directly by the automation engine
    Document(PathBuf),
}

/// Options passed through to the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Where the backend writes its report
    pub report_directory: Option<PathBuf>,

    /// Working directory for the run
    pub working_directory: Option<PathBuf>,

    /// Overall timeout in milliseconds; interpretation is up to the backend
    pub timeout_ms: Option<u64>,
}

/// Outcome of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether every task passed
    pub success: bool,

    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Process exit code, when there was a process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Where the report ended up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_directory: Option<PathBuf>,
}

/// Runs compiled programs or native documents
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Execute and wait for completion
    async fn execute(
        &self,
        executable: Executable,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult>;
}

/// Aggregate counts from a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    /// Tasks run
    pub total: u32,
    /// Tasks passed
    pub passed: u32,
    /// Tasks failed
    pub failed: u32,
    /// Overall status label as written by the engine
    pub status: String,
}

/// Summary of a report directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Whether a report was found at all
    pub found: bool,

    /// Counts, when the report could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReportCounts>,

    /// Names of failed tasks
    #[serde(default)]
    pub failed_tasks: Vec<String>,
}

/// Reads reports produced by an [`ExecutionBackend`]
pub trait ReportReader {
    /// Summarise the report in `directory`
    fn read(&self, directory: &Path) -> Result<ReportSummary>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutionBackend for RecordingBackend {
        async fn execute(
            &self,
            executable: Executable,
            options: &ExecutionOptions,
        ) -> Result<ExecutionResult> {
            let label = match executable {
                Executable::Program(code) => format!("program:{}", code.len()),
                Executable::Document(path) => format!("document:{}", path.display()),
            };
            self.calls.lock().unwrap().push(label);
            Ok(ExecutionResult {
                success: true,
                error: None,
                exit_code: Some(0),
                report_directory: options.report_directory.clone(),
            })
        }
    }

    struct FixedReader;

    impl ReportReader for FixedReader {
        fn read(&self, directory: &Path) -> Result<ReportSummary> {
            Ok(ReportSummary {
                found: directory.ends_with("report"),
                summary: Some(ReportCounts {
                    total: 2,
                    passed: 1,
                    failed: 1,
                    status: "failed".to_string(),
                }),
                failed_tasks: vec!["checkout".to_string()],
            })
        }
    }

    #[tokio::test]
    async fn test_backend_is_object_safe_and_passes_options() {
        let backend = RecordingBackend::default();
        let dyn_backend: &dyn ExecutionBackend = &backend;
        let options = ExecutionOptions {
            report_directory: Some(PathBuf::from("out/report")),
            timeout_ms: Some(30_000),
            ..Default::default()
        };

        let result = dyn_backend
            .execute(Executable::Program("await main();".to_string()), &options)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.report_directory, Some(PathBuf::from("out/report")));

        dyn_backend
            .execute(Executable::Document(PathBuf::from("flow.yaml")), &options)
            .await
            .unwrap();
        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec!["program:13".to_string(), "document:flow.yaml".to_string()]
        );
    }

    #[test]
    fn test_report_summary_serializes() {
        let summary = FixedReader.read(Path::new("out/report")).unwrap();
        assert!(summary.found);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(json["failed_tasks"][0], "checkout");
    }
}

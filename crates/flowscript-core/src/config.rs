//! Configuration parsing
//!
//! Compiler settings live in an optional `flowscript.yaml` next to the
//! scripts. Every field has a default, so an empty file (or no file at all)
//! is a valid configuration.
//!
//! ```yaml
//! template: playwright
//! project_root: .
//! limits:
//!   max_depth: 50
//!   max_import_depth: 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "flowscript.yaml";

/// Root project configuration from `flowscript.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Boilerplate template used by `transpile` when none is given
    #[serde(default = "default_template")]
    pub template: String,

    /// Root that import paths must stay inside (defaults to the document's directory)
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Traversal and safety limits
    #[serde(default)]
    pub limits: Limits,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            project_root: None,
            limits: Limits::default(),
        }
    }
}

fn default_template() -> String {
    "puppeteer".to_string()
}

/// Traversal and safety limits shared by detection, validation and generation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth the flow walker descends into
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum depth of the import graph followed during cycle detection
    #[serde(default = "default_max_import_depth")]
    pub max_import_depth: usize,

    /// Largest document accepted from disk, in bytes
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,

    /// Repeat counts above this warn
    #[serde(default = "default_max_repeat_count")]
    pub max_repeat_count: i64,

    /// Iteration bound emitted for while loops that declare none
    #[serde(default = "default_while_iterations")]
    pub default_while_iterations: u64,

    /// Nesting depth up to which HTTP headers/bodies get marker resolution
    #[serde(default = "default_max_literal_depth")]
    pub max_literal_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_import_depth: default_max_import_depth(),
            max_document_bytes: default_max_document_bytes(),
            max_repeat_count: default_max_repeat_count(),
            default_while_iterations: default_while_iterations(),
            max_literal_depth: default_max_literal_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    50
}

fn default_max_import_depth() -> usize {
    10
}

fn default_max_document_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_max_repeat_count() -> i64 {
    10_000
}

fn default_while_iterations() -> u64 {
    100
}

fn default_max_literal_depth() -> usize {
    10
}

/// Main configuration container
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Directory the configuration was loaded from
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or a `flowscript.yaml` file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./scripts")?;
    /// println!("template: {}", config.project.template);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE_NAME), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = if contents.trim().is_empty() {
            ProjectConfig::default()
        } else {
            serde_yaml::from_str(&contents)?
        };

        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(Self { project, base_path })
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(Error::ConfigNotFound { path: missing }) => {
                tracing::debug!("No configuration at {}, using defaults", missing);
                let base_path = if path.as_ref().is_dir() {
                    path.as_ref().to_path_buf()
                } else {
                    path.as_ref()
                        .parent()
                        .unwrap_or(Path::new("."))
                        .to_path_buf()
                };
                Ok(Self {
                    project: ProjectConfig::default(),
                    base_path,
                })
            }
            other => other,
        }
    }

    /// The limits in effect
    pub fn limits(&self) -> Limits {
        self.project.limits
    }

    /// Project root resolved against the configuration directory
    pub fn project_root(&self) -> Option<PathBuf> {
        self.project
            .project_root
            .as_ref()
            .map(|root| self.base_path.join(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_depth, 50);
        assert_eq!(limits.max_import_depth, 10);
        assert_eq!(limits.max_document_bytes, 5 * 1024 * 1024);
        assert_eq!(limits.default_while_iterations, 100);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ProjectConfig = serde_yaml::from_str("template: playwright\n").unwrap();
        assert_eq!(config.template, "playwright");
        assert_eq!(config.limits, Limits::default());
        assert!(config.project_root.is_none());
    }

    #[test]
    fn test_parse_partial_limits() {
        let yaml = r#"
limits:
  max_depth: 8
  max_repeat_count: 50
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.template, "puppeteer");
        assert_eq!(config.limits.max_depth, 8);
        assert_eq!(config.limits.max_repeat_count, 50);
        assert_eq!(config.limits.max_import_depth, 10);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "project_root: scripts\nlimits:\n  max_import_depth: 3\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.limits().max_import_depth, 3);
        assert_eq!(config.project_root(), Some(dir.path().join("scripts")));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(dir.path());
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(config.project.template, "puppeteer");
        assert_eq!(config.base_path, dir.path());
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.limits(), Limits::default());
    }
}

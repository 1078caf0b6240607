//! CLI command implementations

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use flowscript_core::Config;

pub mod detect;
pub mod transpile;
pub mod validate;

/// Configuration file looked up when `--config` is not given
const DEFAULT_CONFIG: &str = "flowscript.yaml";

/// Load the project configuration
///
/// An explicit path must exist; the default file is optional.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => Config::load_or_default(DEFAULT_CONFIG).context("Failed to load configuration"),
    }
}

/// Expand inputs into script files; directories are searched for YAML scripts
pub fn collect_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext == "yaml" || ext == "yml")
                })
                .filter(|e| e.file_name() != DEFAULT_CONFIG)
                .map(|e| e.into_path())
                .collect();
            found.sort();
            tracing::debug!("Found {} script(s) in {}", found.len(), path.display());
            files.extend(found);
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            anyhow::bail!("Input not found: {}", input);
        }
    }

    if files.is_empty() {
        anyhow::bail!("No scripts found in {}", inputs.join(", "));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("flows/nested")).unwrap();
        for name in [
            "flows/b.yaml",
            "flows/a.yml",
            "flows/nested/c.yaml",
            "flows/readme.md",
            "flows/flowscript.yaml",
        ] {
            std::fs::write(dir.path().join(name), "tasks: []\n").unwrap();
        }
        dir
    }

    #[test]
    fn test_collect_directory_sorted_yaml_only() {
        let dir = project();
        let flows = dir.path().join("flows").display().to_string();

        let files = collect_inputs(&[flows]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("flows/a.yml"),
                PathBuf::from("flows/b.yaml"),
                PathBuf::from("flows/nested/c.yaml"),
            ]
        );
    }

    #[test]
    fn test_collect_explicit_file_kept_as_given() {
        let dir = project();
        let file = dir.path().join("flows/readme.md").display().to_string();
        assert_eq!(collect_inputs(&[file.clone()]).unwrap(), vec![PathBuf::from(file)]);
    }

    #[rstest]
    #[case("missing.yaml", "Input not found")]
    #[case("empty", "No scripts found")]
    fn test_collect_failures(#[case] input: &str, #[case] message: &str) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        let input = dir.path().join(input).display().to_string();

        let err = collect_inputs(&[input]).unwrap_err();
        assert!(err.to_string().contains(message));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.yaml").display().to_string();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration from"));
    }
}

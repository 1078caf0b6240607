//! Validate command

use anyhow::Result;
use serde_json::json;

use flowscript_core::{Diagnostic, DocumentSource, Validator};

use super::{collect_inputs, load_config};

/// Run the validate command; fails when any script has errors
pub async fn run(
    config_path: Option<&str>,
    inputs: &[String],
    project_root: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut validator = Validator::from_config(&config);
    if let Some(root) = project_root {
        validator = validator.with_project_root(root);
    }

    let files = collect_inputs(inputs)?;
    let mut invalid = 0;
    let mut results = Vec::new();

    for path in &files {
        tracing::info!("Validating {}", path.display());
        let report = validator.validate(DocumentSource::Path(path.clone()));
        if !report.valid {
            invalid += 1;
        }

        if json {
            results.push(json!({ "path": path, "report": report }));
            continue;
        }

        println!(
            "{}: {}",
            path.display(),
            if report.valid { "valid" } else { "invalid" }
        );
        for error in &report.errors {
            println!("  error[{}] {}", kind_tag(error), error);
        }
        for warning in &report.warnings {
            println!("  warning[{}] {}", kind_tag(warning), warning);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    if invalid > 0 {
        anyhow::bail!(
            "{} of {} script(s) failed validation",
            invalid,
            files.len()
        );
    }
    Ok(())
}

/// The diagnostic kind as it appears in JSON output
pub(crate) fn kind_tag(diagnostic: &Diagnostic) -> String {
    serde_json::to_value(diagnostic.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

//! Detect command

use anyhow::Result;
use serde_json::json;

use flowscript_core::{DocumentSource, detect};

use super::{collect_inputs, load_config};

/// Run the detect command
pub async fn run(config_path: Option<&str>, inputs: &[String], json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let limits = config.limits();

    let mut results = Vec::new();
    for path in collect_inputs(inputs)? {
        tracing::info!("Detecting mode: {}", path.display());
        let detection = detect(DocumentSource::Path(path.clone()), &limits);
        for warning in &detection.warnings {
            tracing::warn!("{}: {}", path.display(), warning);
        }

        if json {
            results.push(json!({ "path": path, "detection": detection }));
            continue;
        }

        let features: Vec<&str> = detection.features.iter().map(|f| f.as_str()).collect();
        println!(
            "{}: {}{}{}",
            path.display(),
            detection.mode,
            if features.is_empty() {
                String::new()
            } else {
                format!(" [{}]", features.join(", "))
            },
            if detection.needs_code_gen {
                " (code generation required)"
            } else {
                ""
            }
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

//! Transpile command

use anyhow::{Context, Result};
use std::path::PathBuf;

use flowscript_codegen::{TranspileOptions, Transpiler};
use flowscript_core::{DocumentSource, Validator, detect};

use super::load_config;
use super::validate::kind_tag;

/// Command-line switches for `transpile`
pub struct Flags<'a> {
    /// Output file
    pub output: Option<&'a str>,
    /// Template override
    pub template: Option<&'a str>,
    /// Generate for native scripts too
    pub force: bool,
    /// Validate before generating
    pub validate: bool,
    /// JSON output
    pub json: bool,
}

/// Run the transpile command
pub async fn run(config_path: Option<&str>, input: &str, flags: Flags<'_>) -> Result<()> {
    let config = load_config(config_path)?;
    let path = PathBuf::from(input);
    if !path.is_file() {
        anyhow::bail!("Script not found: {}", input);
    }

    let detection = detect(DocumentSource::Path(path.clone()), &config.limits());
    if !detection.needs_code_gen && !flags.force {
        tracing::info!("{} is native; no code generation needed", input);
        if flags.json {
            println!("{}", serde_json::to_string_pretty(&detection)?);
        } else {
            println!("{}: {} (no code generation needed)", input, detection.mode);
        }
        return Ok(());
    }

    if flags.validate {
        let report = Validator::from_config(&config).validate(DocumentSource::Path(path.clone()));
        for warning in &report.warnings {
            tracing::warn!("warning[{}] {}", kind_tag(warning), warning);
        }
        if !report.valid {
            for error in &report.errors {
                eprintln!("error[{}] {}", kind_tag(error), error);
            }
            anyhow::bail!(
                "{} failed validation with {} error(s)",
                input,
                report.errors.len()
            );
        }
    }

    let options = TranspileOptions {
        template: flags
            .template
            .map_or_else(|| config.project.template.clone(), str::to_string),
        output_path: flags.output.map(PathBuf::from),
    };
    let output = Transpiler::new(options)
        .with_limits(config.limits())
        .transpile(DocumentSource::Path(path))
        .with_context(|| format!("Failed to transpile {}", input))?;

    for warning in &output.warnings {
        tracing::warn!("{}", warning);
    }

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if let Some(written) = &output.output_path {
        println!("Wrote {}", written.display());
    } else {
        print!("{}", output.code);
    }
    Ok(())
}

//! FlowScript CLI
//!
//! Developer tool for checking and compiling automation scripts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// FlowScript - YAML browser automation scripts
#[derive(Parser)]
#[command(name = "flowscript")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path [default: flowscript.yaml, if present]
    #[arg(short, long, env = "FLOWSCRIPT_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether scripts are native or need code generation
    Detect {
        /// Script files or directories
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate scripts without generating code
    Validate {
        /// Script files or directories
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Directory imports must stay inside
        #[arg(long)]
        project_root: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a runnable program from an extended script
    Transpile {
        /// Script file
        input: String,

        /// Write the program here instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Program template (puppeteer, playwright)
        #[arg(short, long)]
        template: Option<String>,

        /// Generate even when the script is native
        #[arg(long)]
        force: bool,

        /// Skip validation before generating
        #[arg(long)]
        no_validate: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Logs go to stderr so stdout carries only command output
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Detect { inputs, json } => {
            commands::detect::run(config, &inputs, json).await?;
        }
        Commands::Validate {
            inputs,
            project_root,
            json,
        } => {
            commands::validate::run(config, &inputs, project_root.as_deref(), json).await?;
        }
        Commands::Transpile {
            input,
            output,
            template,
            force,
            no_validate,
            json,
        } => {
            commands::transpile::run(
                config,
                &input,
                commands::transpile::Flags {
                    output: output.as_deref(),
                    template: template.as_deref(),
                    force,
                    validate: !no_validate,
                    json,
                },
            )
            .await?;
        }
    }

    Ok(())
}

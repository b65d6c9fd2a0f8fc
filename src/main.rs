//! microscopy-metadata - metadata extraction for microscopy image files.
//!
//! This binary parses the command line, configures logging and runs the
//! selected subcommand.

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use microscopy_metadata::{
    config::{Cli, Command, ExtractConfig, ExtractorsConfig, LoggingArgs, PathsConfig},
    keypath::{sorted_key_paths, structure_template, to_lines},
    tree::MetadataTree,
    workflow::{discover_inputs, run_batch},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Extract(config) => run_extract(config).await,
        Command::Paths(config) => run_paths(config).await,
        Command::Extractors(config) => run_extractors(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(logging: &LoggingArgs) {
    let directive = logging.filter_directive();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Extract Command
// =============================================================================

async fn run_extract(config: ExtractConfig) -> ExitCode {
    init_logging(&config.logging);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let files = match discover_inputs(&config.input, &registry).await {
        Ok(files) => files,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if files.is_empty() {
        info!(
            "No supported image files found at path: {}. Exiting.",
            config.input.display()
        );
        return ExitCode::SUCCESS;
    }

    let ctx = config.workflow_context();
    match run_batch(&ctx, &registry, &files).await {
        Ok(summary) if summary.has_failures() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Paths Command
// =============================================================================

async fn emit(lines: &[String], destination: Option<&Path>) -> Result<(), String> {
    let text = to_lines(lines);
    match destination {
        Some(path) => {
            tokio::fs::write(path, text)
                .await
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            info!("Wrote {} line(s) to {}", lines.len(), path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

async fn run_paths(config: PathsConfig) -> ExitCode {
    init_logging(&config.logging);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let text = match tokio::fs::read_to_string(&config.input).await {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to read {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let tree = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => MetadataTree::from(value),
        Err(e) => {
            error!("{} is not valid JSON: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let paths = sorted_key_paths(&tree);
    let templates = structure_template(&paths);

    for (lines, destination) in [
        (&paths, config.key_paths.as_deref()),
        (&templates, config.template.as_deref()),
    ] {
        if let Err(e) = emit(lines, destination).await {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Extractors Command
// =============================================================================

fn run_extractors(config: ExtractorsConfig) -> ExitCode {
    init_logging(&config.logging);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Registered extractors");
    println!("─────────────────────");
    for (extension, name) in registry.describe() {
        println!("  {:<10} {}", extension, name);
    }
    println!();
    println!("Total: {} extension(s)", registry.len());

    ExitCode::SUCCESS
}

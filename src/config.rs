//! Command-line configuration.
//!
//! Every option can also be set through an environment variable with the
//! `MMD_` prefix:
//!
//! - `MMD_INPUT` - image file or directory to process
//! - `MMD_OUTPUT_DIR` - artifact directory (default: metadata_output)
//! - `MMD_PDF` - also convert reports to PDF (default: false)
//! - `MMD_PDF_CONVERTER` - program used for PDF conversion (default: pandoc)
//! - `MMD_MAP_EXTENSION` - extra `EXT=EXTRACTOR` mappings, comma-separated
//! - `MMD_LOG_LEVEL` - error, warn, info, debug or trace (default: info)
//!
//! `RUST_LOG`, when set, overrides the log level entirely.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::RegistryError;
use crate::extract::ExtractorRegistry;
use crate::report::PANDOC;
use crate::workflow::WorkflowContext;

// =============================================================================
// Default Values
// =============================================================================

/// Default artifact directory.
pub const DEFAULT_OUTPUT_DIR: &str = "metadata_output";

/// Default PDF converter.
pub const DEFAULT_PDF_CONVERTER: &str = PANDOC;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Extract, normalize and report metadata from microscopy image files.
#[derive(Parser, Debug, Clone)]
#[command(name = "microscopy-metadata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the metadata pipeline on a file or every supported file in a directory
    Extract(ExtractConfig),

    /// Write the key paths and structural template of a JSON document
    Paths(PathsConfig),

    /// List the extension to extractor table
    Extractors(ExtractorsConfig),
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    /// Log level for this crate's messages.
    #[arg(long, value_enum, default_value_t = DEFAULT_LOG_LEVEL, env = "MMD_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl LoggingArgs {
    /// Level after applying `--verbose`; never quieter than requested.
    pub fn effective_level(&self) -> LogLevel {
        if self.verbose && matches!(self.log_level, LogLevel::Error | LogLevel::Warn | LogLevel::Info) {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        format!("microscopy_metadata={}", self.effective_level().as_str())
    }
}

impl Default for LoggingArgs {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL,
            verbose: false,
        }
    }
}

/// Build the built-in registry and apply `EXT=EXTRACTOR` mappings in order.
pub fn build_registry(mappings: &[String]) -> Result<ExtractorRegistry, RegistryError> {
    let mut registry = ExtractorRegistry::builtin();
    for mapping in mappings {
        registry.apply_mapping(mapping)?;
    }
    Ok(registry)
}

fn validate_mappings(mappings: &[String]) -> Result<(), String> {
    build_registry(mappings).map(|_| ()).map_err(|e| e.to_string())
}

// =============================================================================
// Extract
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ExtractConfig {
    /// Image file, or directory whose supported files are processed.
    #[arg(env = "MMD_INPUT")]
    pub input: PathBuf,

    /// Directory to write artifacts to.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, env = "MMD_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Also convert each Markdown report to PDF.
    #[arg(long, default_value_t = false, env = "MMD_PDF")]
    pub pdf: bool,

    /// Program used for PDF conversion.
    #[arg(long, default_value = DEFAULT_PDF_CONVERTER, env = "MMD_PDF_CONVERTER")]
    pub pdf_converter: String,

    /// Extra extension mappings, e.g. `btf=tiff` (comma-separated).
    #[arg(long, env = "MMD_MAP_EXTENSION", value_delimiter = ',')]
    pub map_extension: Vec<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

impl ExtractConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.input.as_os_str().is_empty() {
            return Err("An input file or directory is required. Set INPUT or MMD_INPUT".to_string());
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir must not be empty".to_string());
        }

        if self.pdf && self.pdf_converter.trim().is_empty() {
            return Err("PDF output requested but no converter set. Set --pdf-converter".to_string());
        }

        validate_mappings(&self.map_extension)
    }

    /// Registry with this run's extension mappings applied.
    pub fn registry(&self) -> Result<ExtractorRegistry, RegistryError> {
        build_registry(&self.map_extension)
    }

    pub fn workflow_context(&self) -> WorkflowContext {
        WorkflowContext::new(&self.output_dir)
            .with_pdf(self.pdf)
            .with_pdf_converter(&self.pdf_converter)
    }
}

// =============================================================================
// Paths
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct PathsConfig {
    /// JSON document to analyse.
    pub input: PathBuf,

    /// Write key paths here instead of stdout.
    #[arg(long)]
    pub key_paths: Option<PathBuf>,

    /// Write the structural template here instead of stdout.
    #[arg(long)]
    pub template: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

impl PathsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.input.as_os_str().is_empty() {
            return Err("A JSON input file is required".to_string());
        }
        if self.key_paths.is_some() && self.key_paths == self.template {
            return Err("--key-paths and --template must be different files".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Extractors
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ExtractorsConfig {
    /// Extra extension mappings, e.g. `btf=tiff` (comma-separated).
    #[arg(long, env = "MMD_MAP_EXTENSION", value_delimiter = ',')]
    pub map_extension: Vec<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

impl ExtractorsConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_mappings(&self.map_extension)
    }

    pub fn registry(&self) -> Result<ExtractorRegistry, RegistryError> {
        build_registry(&self.map_extension)
    }
}

// =============================================================================
// Tests
// =============================================================================

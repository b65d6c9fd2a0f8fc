//! Run and per-file context.
//!
//! A [`WorkflowContext`] is built once per run and passed by reference into
//! every stage. Each input file gets a [`FileContext`] that knows where its
//! artifacts go.

use std::path::{Path, PathBuf};

use crate::error::WorkflowError;
use crate::report::PANDOC;

// =============================================================================
// Artifact suffixes
// =============================================================================

pub const RAW_METADATA_SUFFIX: &str = "_raw_metadata.json";
pub const PROCESSED_METADATA_SUFFIX: &str = "_processed_metadata.json";
pub const KEY_PATHS_SUFFIX: &str = "_key_paths.txt";
pub const STRUCTURE_TEMPLATE_SUFFIX: &str = "_metadata_structure_template.txt";
pub const REPORT_SUFFIX: &str = "_report.md";
pub const PDF_REPORT_SUFFIX: &str = "_report.pdf";
pub const ERROR_SUFFIX: &str = "_error.json";
pub const WORKFLOW_ERROR_SUFFIX: &str = "_WORKFLOW_ERROR.txt";

// =============================================================================
// Workflow Context
// =============================================================================

/// Settings shared by every file in a run.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    /// Directory all artifacts are written to
    pub output_dir: PathBuf,

    /// Convert the Markdown report to PDF
    pub generate_pdf: bool,

    /// Program used for PDF conversion
    pub pdf_converter: String,
}

impl WorkflowContext {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            generate_pdf: false,
            pdf_converter: PANDOC.to_string(),
        }
    }

    pub fn with_pdf(mut self, generate_pdf: bool) -> Self {
        self.generate_pdf = generate_pdf;
        self
    }

    pub fn with_pdf_converter(mut self, program: impl Into<String>) -> Self {
        self.pdf_converter = program.into();
        self
    }

    /// Create the output directory (and parents) if needed.
    pub async fn ensure_output_dir(&self) -> Result<(), WorkflowError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| WorkflowError::OutputDir {
                path: self.output_dir.display().to_string(),
                source,
            })
    }

    /// Context for one input file.
    pub fn file(&self, input_path: &Path) -> Result<FileContext, WorkflowError> {
        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| WorkflowError::NoStem(input_path.display().to_string()))?;

        Ok(FileContext {
            input_path: input_path.to_path_buf(),
            stem,
            output_dir: self.output_dir.clone(),
        })
    }
}

// =============================================================================
// File Context
// =============================================================================

/// One input file and the naming of its artifacts.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub input_path: PathBuf,

    /// File name without its last extension; prefix of every artifact
    pub stem: String,

    output_dir: PathBuf,
}

impl FileContext {
    /// `<output_dir>/<stem><suffix>`
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", self.stem, suffix))
    }

    /// File name of the input, for log lines.
    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.stem.clone())
    }

    /// Input path as recorded in error artifacts.
    pub fn source(&self) -> String {
        self.input_path.display().to_string()
    }
}

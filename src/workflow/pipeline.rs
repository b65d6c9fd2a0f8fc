//! Per-file pipeline.
//!
//! ```text
//! extract -> raw dump -> normalize -> processed dump -> key paths -> report
//! ```
//!
//! Stages run in order and the first failing stage ends the run for that
//! file. Extraction itself cannot fail: problems reading the container are
//! recorded in the raw tree and the remaining stages work on whatever was
//! read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{Stage, WorkflowError};
use crate::extract::{file_extension, ExtractorRegistry, MetadataExtractor};
use crate::format::detect_container;
use crate::io::{FileRangeReader, RangeReader};
use crate::keypath::{sorted_key_paths, structure_template, to_lines};
use crate::normalize::normalize;
use crate::report::{convert_to_pdf, write_markdown_report};
use crate::tree::MetadataTree;

use super::context::{
    FileContext, WorkflowContext, ERROR_SUFFIX, KEY_PATHS_SUFFIX, PDF_REPORT_SUFFIX,
    PROCESSED_METADATA_SUFFIX, RAW_METADATA_SUFFIX, REPORT_SUFFIX, STRUCTURE_TEMPLATE_SUFFIX,
};

/// Artifacts written for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifacts {
    pub raw_metadata: PathBuf,
    pub processed_metadata: PathBuf,
    pub key_paths: PathBuf,
    pub structure_template: PathBuf,
    pub report: PathBuf,
    /// Present only when PDF conversion was requested and succeeded
    pub pdf_report: Option<PathBuf>,
}

// =============================================================================
// Writers
// =============================================================================

async fn write_text(stage: Stage, path: &Path, content: String) -> Result<(), WorkflowError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| WorkflowError::Write {
            stage,
            path: path.display().to_string(),
            source,
        })
}

async fn write_json(stage: Stage, path: &Path, tree: &MetadataTree) -> Result<(), WorkflowError> {
    let json = tree
        .to_json_pretty()
        .map_err(|source| WorkflowError::Serialize { stage, source })?;
    write_text(stage, path, json).await
}

/// Write `_error.json` for a file no extractor handles.
async fn write_no_extractor_error(
    file: &FileContext,
    extension: &str,
) -> Result<(), WorkflowError> {
    let error = WorkflowError::NoExtractor(extension.to_string());
    let document = MetadataTree::from(json!({
        "source_file": file.source(),
        "error": error.to_string(),
    }));
    let path = file.output_path(ERROR_SUFFIX);
    write_json(Stage::Extract, &path, &document).await?;
    info!("Error report saved to: {}", path.display());
    Ok(())
}

// =============================================================================
// Stages
// =============================================================================

/// Warn when the file content does not look like what its extension says.
async fn check_container<R: RangeReader + ?Sized>(reader: &R, extractor: &dyn MetadataExtractor) {
    match detect_container(reader).await {
        Ok(Some(format)) if format.extractor_name() != extractor.name() => warn!(
            "{} looks like {} content but is handled by the '{}' extractor",
            reader.identifier(),
            format.name(),
            extractor.name()
        ),
        Ok(Some(format)) => debug!("Detected {} container", format.name()),
        Ok(None) => warn!(
            "{} is not a recognised container; extraction will likely fail",
            reader.identifier()
        ),
        Err(e) => debug!("Container detection skipped: {}", e),
    }
}

async fn extract(file: &FileContext, extractor: &dyn MetadataExtractor) -> MetadataTree {
    let source = file.source();
    match FileRangeReader::open(&file.input_path).await {
        Ok(reader) => {
            check_container(&reader, extractor).await;
            extractor.extract_from_reader(&reader, &source).await
        }
        Err(e) => {
            error!("{} extractor could not open {}: {}", extractor.name(), source, e);
            extractor.failure_tree(&source, e.to_string())
        }
    }
}

async fn run_stages(
    ctx: &WorkflowContext,
    file: &FileContext,
    extractor: Arc<dyn MetadataExtractor>,
) -> Result<FileArtifacts, WorkflowError> {
    debug!("Using extractor '{}'", extractor.name());
    let raw = extract(file, extractor.as_ref()).await;
    if let Some(message) = raw.get("error").and_then(MetadataTree::as_str) {
        warn!("Extraction reported an error: {}", message);
    }

    let raw_metadata = file.output_path(RAW_METADATA_SUFFIX);
    write_json(Stage::RawDump, &raw_metadata, &raw).await?;
    info!("Raw metadata saved to: {}", raw_metadata.display());

    debug!("Normalizing metadata");
    let processed = normalize(&raw);

    let processed_metadata = file.output_path(PROCESSED_METADATA_SUFFIX);
    write_json(Stage::ProcessedDump, &processed_metadata, &processed).await?;
    info!("Processed metadata saved to: {}", processed_metadata.display());

    let paths = sorted_key_paths(&processed);
    let templates = structure_template(&paths);
    let key_paths = file.output_path(KEY_PATHS_SUFFIX);
    let structure = file.output_path(STRUCTURE_TEMPLATE_SUFFIX);
    write_text(Stage::KeyPaths, &key_paths, to_lines(&paths)).await?;
    write_text(Stage::KeyPaths, &structure, to_lines(&templates)).await?;
    info!(
        "Key paths ({}) and structure template ({}) written to: {}, {}",
        paths.len(),
        templates.len(),
        key_paths.display(),
        structure.display()
    );

    let report = file.output_path(REPORT_SUFFIX);
    write_markdown_report(&processed, &report).await?;

    let mut pdf_report = None;
    if ctx.generate_pdf {
        let pdf = file.output_path(PDF_REPORT_SUFFIX);
        if convert_to_pdf(&ctx.pdf_converter, &report, &pdf).await {
            pdf_report = Some(pdf);
        }
    }

    Ok(FileArtifacts {
        raw_metadata,
        processed_metadata,
        key_paths,
        structure_template: structure,
        report,
        pdf_report,
    })
}

/// Run the full pipeline for one file.
///
/// A file with no registered extractor gets an `_error.json` artifact and
/// [`WorkflowError::NoExtractor`] is returned. The output directory must
/// already exist.
pub async fn run_for_file(
    ctx: &WorkflowContext,
    registry: &ExtractorRegistry,
    input_path: &Path,
) -> Result<FileArtifacts, WorkflowError> {
    let file = ctx.file(input_path)?;
    let span = info_span!("file", file = %file.file_name());

    async move {
        info!("Processing file: {}", file.source());

        let Some(extractor) = registry.get_for_path(&file.input_path) else {
            let extension = file_extension(&file.input_path).unwrap_or_default();
            error!("No extractor found for file type: {}", extension);
            write_no_extractor_error(&file, &extension).await?;
            return Err(WorkflowError::NoExtractor(extension));
        };

        let artifacts = run_stages(ctx, &file, extractor).await?;
        info!("Successfully completed processing for file: {}", file.source());
        Ok(artifacts)
    }
    .instrument(span)
    .await
}

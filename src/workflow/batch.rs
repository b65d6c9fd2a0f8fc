//! Input discovery and the batch driver.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::WorkflowError;
use crate::extract::ExtractorRegistry;

use super::context::{WorkflowContext, WORKFLOW_ERROR_SUFFIX};
use super::pipeline::run_for_file;

/// Success/failure tally for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

async fn resolve(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Files to process for `input`: the file itself when its extension is
/// registered, or every registered file directly inside a directory.
///
/// Results are absolute, sorted and free of duplicates. Subdirectories are
/// not searched.
pub async fn discover_inputs(
    input: &Path,
    registry: &ExtractorRegistry,
) -> Result<Vec<PathBuf>, WorkflowError> {
    let metadata = tokio::fs::metadata(input)
        .await
        .map_err(|_| WorkflowError::InputNotFound(input.display().to_string()))?;

    if metadata.is_file() {
        if registry.supports(input) {
            return Ok(vec![resolve(input).await]);
        }
        let supported: Vec<String> = registry.describe().into_iter().map(|(ext, _)| ext).collect();
        warn!(
            "Specified file is not a supported type: {}. Supported types: {}",
            input.display(),
            supported.join(", ")
        );
        return Ok(Vec::new());
    }

    info!("Scanning directory: {} for supported files...", input.display());
    let scan_error = |source| WorkflowError::Discover {
        path: input.display().to_string(),
        source,
    };

    let mut entries = tokio::fs::read_dir(input).await.map_err(scan_error)?;
    let mut found = BTreeSet::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false)
            || tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
        if is_file && registry.supports(&path) {
            found.insert(resolve(&path).await);
        }
    }

    info!("Found {} supported files in {}", found.len(), input.display());
    Ok(found.into_iter().collect())
}

/// Write `_WORKFLOW_ERROR.txt` for a file whose pipeline failed.
async fn write_workflow_error(ctx: &WorkflowContext, input: &Path, err: &WorkflowError) {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());
    let path = ctx.output_dir.join(format!("{}{}", stem, WORKFLOW_ERROR_SUFFIX));
    let content = format!(
        "A critical error occurred processing {}:\n{}\nCheck logs for more details.",
        name, err
    );

    if let Err(e) = tokio::fs::write(&path, content).await {
        error!("Failed to write error file {}: {}", path.display(), e);
    }
}

/// Process `files` one after another.
///
/// The output directory is created first; failing to create it is the only
/// error that stops the batch. Each file's failure is logged, recorded and
/// counted, and the batch moves on.
pub async fn run_batch(
    ctx: &WorkflowContext,
    registry: &ExtractorRegistry,
    files: &[PathBuf],
) -> Result<BatchSummary, WorkflowError> {
    ctx.ensure_output_dir().await?;
    info!("Output will be saved to: {}", ctx.output_dir.display());
    info!("Found {} image file(s) to process", files.len());

    let mut summary = BatchSummary::default();

    for path in files {
        let name = path.display();
        info!("--- Starting processing for: {} ---", name);

        match run_for_file(ctx, registry, path).await {
            Ok(_) => {
                info!("--- Finished processing for: {} ---", name);
                summary.succeeded += 1;
            }
            Err(e @ WorkflowError::NoExtractor(_)) => {
                error!("Skipped {}: {}", name, e);
                summary.failed += 1;
            }
            Err(e) => {
                match e.stage() {
                    Some(stage) => error!("Error in {} stage for {}: {}", stage, name, e),
                    None => error!("Critical error during workflow for {}: {}", name, e),
                }
                write_workflow_error(ctx, path, &e).await;
                summary.failed += 1;
            }
        }
    }

    info!("===================================================");
    info!("              Batch Processing Complete!");
    info!("  Successfully processed: {} file(s)", summary.succeeded);
    info!("  Failed to process:      {} file(s)", summary.failed);
    info!("===================================================");

    Ok(summary)
}

//! Human-readable reports.
//!
//! - [`markdown`] - renders the processed tree as Markdown
//! - [`pdf`] - optional conversion of the Markdown file through `pandoc`

pub mod markdown;
pub mod pdf;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Stage, WorkflowError};
use crate::tree::MetadataTree;

pub use markdown::{render_markdown, source_file, NOT_AVAILABLE};
pub use pdf::{convert_to_pdf, PANDOC};

/// Render `metadata` and write it to `path`.
pub async fn write_markdown_report(
    metadata: &MetadataTree,
    path: &Path,
) -> Result<(), WorkflowError> {
    let content = render_markdown(metadata);
    tokio::fs::write(path, content)
        .await
        .map_err(|source| WorkflowError::Write {
            stage: Stage::Report,
            path: path.display().to_string(),
            source,
        })?;
    info!("Markdown report saved to: {}", path.display());
    Ok(())
}

/// Path of the PDF that sits next to a Markdown report.
pub fn pdf_path_for(markdown: &Path) -> PathBuf {
    markdown.with_extension("pdf")
}

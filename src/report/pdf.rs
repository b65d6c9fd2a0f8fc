//! PDF conversion through an external `pandoc`.

use std::path::Path;

use tokio::process::Command;
use tracing::{info, warn};

/// Converter program looked up on `PATH`.
pub const PANDOC: &str = "pandoc";

/// Convert `markdown` to `pdf` with `program`.
///
/// Returns whether a PDF was written. A missing converter or a failed
/// conversion is logged and otherwise ignored.
pub async fn convert_to_pdf(program: &str, markdown: &Path, pdf: &Path) -> bool {
    let output = match Command::new(program)
        .arg(markdown)
        .arg("-o")
        .arg(pdf)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            warn!(
                "Could not run {} to create {}: {}",
                program,
                pdf.display(),
                e
            );
            return false;
        }
    };

    if !output.status.success() {
        warn!(
            "{} failed to create PDF {} ({}). Is a LaTeX engine installed? {}",
            program,
            pdf.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return false;
    }

    info!("Converted report to PDF: {}", pdf.display());
    true
}

//! Orchestration of the per-file pipeline and batches of files.
//!
//! # Artifacts
//!
//! For an input `slide.qptiff` the pipeline writes, into the output
//! directory:
//!
//! | File | Content |
//! |:-----|:--------|
//! | `slide_raw_metadata.json` | extractor tree |
//! | `slide_processed_metadata.json` | normalized tree |
//! | `slide_key_paths.txt` | sorted key paths of the normalized tree |
//! | `slide_metadata_structure_template.txt` | structural template of those paths |
//! | `slide_report.md` / `slide_report.pdf` | human-readable report |
//! | `slide_error.json` | no extractor for the extension |
//! | `slide_WORKFLOW_ERROR.txt` | a stage failed |

mod batch;
mod context;
mod pipeline;

pub use batch::{discover_inputs, run_batch, BatchSummary};
pub use context::{
    FileContext, WorkflowContext, ERROR_SUFFIX, KEY_PATHS_SUFFIX, PDF_REPORT_SUFFIX,
    PROCESSED_METADATA_SUFFIX, RAW_METADATA_SUFFIX, REPORT_SUFFIX, STRUCTURE_TEMPLATE_SUFFIX,
    WORKFLOW_ERROR_SUFFIX,
};
pub use pipeline::{run_for_file, FileArtifacts};

//! # microscopy-metadata
//!
//! Extracts embedded metadata from microscopy image containers, normalizes
//! it and writes derived artifacts.
//!
//! The output of the binary-format readers has no fixed shape, so everything
//! downstream works on a schema-less [`MetadataTree`]:
//!
//! - key naming is normalized to camel case and numeric strings become numbers
//! - common TIFF tags are promoted from `pages[*].tags` to the page
//! - every addressable key path is listed, and list indices are collapsed into
//!   a structural template
//!
//! ## Features
//!
//! - **Native readers**: TIFF, BigTIFF, QPTIFF (including PerkinElmer scan
//!   profiles), OME-TIFF, ImageJ TIFF, and Carl Zeiss CZI
//! - **Best-effort XML**: embedded XML is decoded and parsed with scalar type
//!   coercion; failures are recorded in the tree instead of aborting
//! - **Explicit registry**: extractors are registered per file extension and
//!   can be re-mapped from the command line
//! - **Reports**: Markdown, with optional PDF conversion through `pandoc`
//!
//! ## Architecture
//!
//! - [`io`] - range reads over local files and in-memory buffers
//! - [`mod@format`] - TIFF and CZI container parsing, magic-byte detection
//! - [`xml`] - XML-to-tree parsing
//! - [`extract`] - extractors and the extension registry
//! - [`normalize`] - key casing, numeric coercion, tag promotion
//! - [`keypath`] - key paths and structural templates
//! - [`report`] - Markdown and PDF reports
//! - [`workflow`] - per-file pipeline and batch driver
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use microscopy_metadata::{run_batch, ExtractorRegistry, WorkflowContext};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ExtractorRegistry::builtin();
//!     let ctx = WorkflowContext::new("metadata_output");
//!     let files = vec![PathBuf::from("/data/slide.qptiff")];
//!
//!     let summary = run_batch(&ctx, &registry, &files).await.unwrap();
//!     println!("{} ok, {} failed", summary.succeeded, summary.failed);
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod io;
pub mod keypath;
pub mod normalize;
pub mod report;
pub mod tree;
pub mod workflow;
pub mod xml;

// Re-export commonly used types
pub use config::{Cli, Command, ExtractConfig, ExtractorsConfig, LogLevel, PathsConfig};
pub use error::{CziError, IoError, RegistryError, Stage, TiffError, WorkflowError, XmlError};
pub use extract::{CziExtractor, ExtractorRegistry, MetadataExtractor, TiffExtractor};
pub use format::{detect_container, ContainerFormat};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use keypath::{key_paths, sorted_key_paths, structure_template, WILDCARD};
pub use normalize::{normalize, to_camel_case, PROMOTED_TAGS};
pub use report::render_markdown;
pub use tree::{Mapping, MetadataTree, Scalar};
pub use workflow::{
    discover_inputs, run_batch, run_for_file, BatchSummary, FileArtifacts, FileContext,
    WorkflowContext,
};
pub use xml::{parse_xml, NamespaceMode};

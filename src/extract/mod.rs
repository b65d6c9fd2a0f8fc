//! Metadata extractors.
//!
//! An extractor walks one kind of container and produces the raw
//! [`MetadataTree`] for a file. Extractors never fail: problems are recorded
//! in the tree's `error` field so later stages still see whatever was read.
//!
//! Extractors are looked up by file extension in an [`ExtractorRegistry`]
//! built at startup.

mod czi;
mod perkinelmer;
mod registry;
mod tiff;

use std::path::Path;

use async_trait::async_trait;
use tracing::error;

use crate::io::{FileRangeReader, RangeReader};
use crate::tree::{Mapping, MetadataTree};

pub use czi::CziExtractor;
pub use perkinelmer::{find_first_truthy, parse_perkinelmer_xml};
pub use registry::{file_extension, ExtractorRegistry};
pub use tiff::{parse_imagej_description, TiffExtractor};

/// Produces the raw metadata tree for one container format.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Short name used in registry listings and `--map-extension`.
    fn name(&self) -> &str;

    /// Extract metadata from an open reader.
    ///
    /// `source_path` is recorded in the tree as `source_file_path`.
    async fn extract_from_reader(&self, reader: &dyn RangeReader, source_path: &str)
        -> MetadataTree;

    /// Tree returned when the file cannot even be opened.
    fn failure_tree(&self, source_path: &str, message: String) -> MetadataTree {
        let mut root = Mapping::new();
        root.insert("source_file_path".into(), source_path.into());
        root.insert("error".into(), message.into());
        MetadataTree::Mapping(root)
    }

    /// Open `path` and extract its metadata.
    async fn extract(&self, path: &Path) -> MetadataTree {
        let source_path = path.display().to_string();
        match FileRangeReader::open(path).await {
            Ok(reader) => self.extract_from_reader(&reader, &source_path).await,
            Err(e) => {
                error!("{} extractor could not open {}: {}", self.name(), source_path, e);
                self.failure_tree(&source_path, e.to_string())
            }
        }
    }
}

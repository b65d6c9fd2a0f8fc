//! Carl Zeiss CZI extractor.
//!
//! Reads the XML metadata document and parses it with namespace prefixes
//! stripped.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::format::czi::{read_file_header, read_metadata_xml};
use crate::io::RangeReader;
use crate::tree::{Mapping, MetadataTree};
use crate::xml::{parse_xml, NamespaceMode};

use super::MetadataExtractor;

/// Extractor for `.czi` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CziExtractor;

impl CziExtractor {
    pub fn new() -> Self {
        CziExtractor
    }
}

#[async_trait]
impl MetadataExtractor for CziExtractor {
    fn name(&self) -> &str {
        "czi"
    }

    async fn extract_from_reader(
        &self,
        reader: &dyn RangeReader,
        source_path: &str,
    ) -> MetadataTree {
        debug!("Attempting to open CZI file: {}", source_path);

        let mut root = Mapping::new();
        root.insert("source_file_path".into(), source_path.into());

        let header = match read_file_header(reader).await {
            Ok(header) => header,
            Err(e) => {
                error!("Failed to extract CZI metadata from {}: {}", source_path, e);
                root.insert("error".into(), e.to_string().into());
                return MetadataTree::Mapping(root);
            }
        };

        match read_metadata_xml(reader, &header).await {
            Ok(Some(xml)) => match parse_xml(&xml, NamespaceMode::Strip) {
                Ok(parsed) => {
                    root.insert("xml_metadata_string".into(), xml.into());
                    root.insert("structured_metadata".into(), parsed);
                }
                Err(e) => {
                    error!("Failed to parse CZI metadata XML in {}: {}", source_path, e);
                    root.insert("xml_metadata_string".into(), xml.into());
                    root.insert("error".into(), e.to_string().into());
                }
            },
            Ok(None) => {
                warn!("No XML metadata found in CZI file: {}", source_path);
                root.insert(
                    "warning".into(),
                    "No XML metadata segment found in file.".into(),
                );
                root.insert("file_header_summary".into(), header.summary());
            }
            Err(e) => {
                error!("Failed to extract CZI metadata from {}: {}", source_path, e);
                root.insert("error".into(), e.to_string().into());
            }
        }

        MetadataTree::Mapping(root)
    }
}

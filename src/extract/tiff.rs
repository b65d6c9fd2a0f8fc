//! TIFF / QPTIFF / OME-TIFF extractor.
//!
//! Every IFD in the main chain becomes one page carrying all of its tags.
//! XML image descriptions are additionally parsed into
//! `structured_image_description`, and file-level OME-XML and ImageJ
//! metadata from the first page are collected under `top_level_tags`.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::format::tiff::{tag_name, Ifd, TiffDirectory, TiffTag, ValueReader};
use crate::io::RangeReader;
use crate::tree::{Mapping, MetadataTree, Scalar};
use crate::xml::{coerce_xml_scalar, decode_xml_bytes, try_parse_xml, NamespaceMode};

use super::perkinelmer::parse_perkinelmer_xml;
use super::MetadataExtractor;

/// Extractor for the TIFF family.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffExtractor;

impl TiffExtractor {
    pub fn new() -> Self {
        TiffExtractor
    }
}

/// Text of a tag value, decoding byte values.
fn value_text(value: &MetadataTree) -> Option<String> {
    match value {
        MetadataTree::Scalar(Scalar::Str(s)) => Some(s.clone()),
        MetadataTree::Scalar(Scalar::Bytes(b)) => Some(decode_xml_bytes(b)),
        _ => None,
    }
}

fn looks_like_xml(text: &str) -> bool {
    text.trim_start().starts_with('<')
}

/// Byte values that decode to XML are kept as text.
fn tag_output_value(value: MetadataTree) -> MetadataTree {
    if let MetadataTree::Scalar(Scalar::Bytes(bytes)) = &value {
        let decoded = decode_xml_bytes(bytes);
        if looks_like_xml(&decoded) {
            return MetadataTree::string(decoded);
        }
    }
    value
}

/// OME-XML descriptions end with the closing `OME` element.
fn is_ome_description(description: &str) -> bool {
    description.trim_end().ends_with("OME>")
}

/// Parse an ImageJ description (`ImageJ=1.53t\nimages=3\n...`).
///
/// Returns `None` unless the text starts with `ImageJ=`. Values are coerced
/// like XML leaves.
pub fn parse_imagej_description(description: &str) -> Option<MetadataTree> {
    if !description.starts_with("ImageJ=") {
        return None;
    }

    let map: Mapping = description
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            (
                key.trim().to_string(),
                MetadataTree::Scalar(coerce_xml_scalar(value.trim())),
            )
        })
        .filter(|(key, _)| !key.is_empty())
        .collect();

    Some(MetadataTree::Mapping(map))
}

impl TiffExtractor {
    /// Build the tree for one IFD. Also returns the ImageDescription text.
    async fn read_page<R: RangeReader + ?Sized>(
        &self,
        index: usize,
        ifd: &Ifd,
        values: &ValueReader<'_, R>,
        source_path: &str,
    ) -> (MetadataTree, Option<String>) {
        let mut page = Mapping::new();
        page.insert("page_index_in_series".into(), (index as i64).into());

        if ifd.entries.is_empty() {
            page.insert("tags".into(), MetadataTree::mapping());
            page.insert(
                "warning".into(),
                "No TIFF tags available for this page.".into(),
            );
            return (MetadataTree::Mapping(page), None);
        }

        let mut tags = Mapping::new();
        let mut description = None;

        for entry in &ifd.entries {
            let name = tag_name(entry.tag_id).into_owned();
            let value = match values.read_value(entry).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("Could not read tag {} on page {}: {}", name, index, e);
                    tags.insert(name, MetadataTree::error_node(e.to_string(), MetadataTree::null()));
                    continue;
                }
            };

            if entry.tag_id == TiffTag::ImageDescription.as_u16() && description.is_none() {
                description = value_text(&value);
            }
            tags.insert(name, tag_output_value(value));
        }

        if let Some(xml) = description.as_deref().filter(|d| looks_like_xml(d)) {
            page.insert("image_description_xml".into(), xml.into());

            let structured = if xml.contains("PerkinElmer")
                || source_path.to_uppercase().contains("QPTIFF")
            {
                Some(parse_perkinelmer_xml(xml))
            } else {
                try_parse_xml(xml, NamespaceMode::Preserve)
            };

            if let Some(tree) = structured.filter(MetadataTree::is_truthy) {
                page.insert("structured_image_description".into(), tree);
            }
        }

        page.insert("tags".into(), MetadataTree::Mapping(tags));
        (MetadataTree::Mapping(page), description)
    }

    /// File-level blocks derived from the first page's description.
    fn top_level_tags(first_description: Option<&str>) -> Mapping {
        let mut top = Mapping::new();
        let Some(description) = first_description else {
            return top;
        };

        if is_ome_description(description) {
            top.insert("ome_xml_string".into(), description.into());
            if let Some(parsed) = try_parse_xml(description, NamespaceMode::Preserve) {
                top.insert("structured_ome_metadata".into(), parsed);
            }
        }

        if let Some(imagej) = parse_imagej_description(description) {
            top.insert("imagej_metadata".into(), imagej);
        }

        top
    }
}

#[async_trait]
impl MetadataExtractor for TiffExtractor {
    fn name(&self) -> &str {
        "tiff"
    }

    fn failure_tree(&self, source_path: &str, message: String) -> MetadataTree {
        let mut root = Mapping::new();
        root.insert("source_file_path".into(), source_path.into());
        root.insert("pages".into(), MetadataTree::Sequence(Vec::new()));
        root.insert("error".into(), message.into());
        MetadataTree::Mapping(root)
    }

    async fn extract_from_reader(
        &self,
        reader: &dyn RangeReader,
        source_path: &str,
    ) -> MetadataTree {
        let directory = match TiffDirectory::read(reader).await {
            Ok(directory) => directory,
            Err(e) => {
                error!("Failed to extract TIFF metadata from {}: {}", source_path, e);
                return self.failure_tree(source_path, e.to_string());
            }
        };

        let values = ValueReader::new(reader, &directory.header);
        let mut pages = Vec::with_capacity(directory.ifds.len());
        let mut first_description = None;

        for (index, ifd) in directory.ifds.iter().enumerate() {
            let (page, description) = self.read_page(index, ifd, &values, source_path).await;
            if index == 0 {
                first_description = description;
            }
            pages.push(page);
        }

        let top = Self::top_level_tags(first_description.as_deref());

        let mut root = Mapping::new();
        root.insert("source_file_path".into(), source_path.into());

        if pages.is_empty() {
            warn!("No image series or pages found in file: {}", source_path);
            root.insert("pages".into(), MetadataTree::Sequence(pages));
            root.insert("top_level_tags".into(), MetadataTree::Mapping(top));
            return MetadataTree::Mapping(root);
        }

        debug!("Extracted {} page(s) from {}", pages.len(), source_path);
        root.insert("pages".into(), MetadataTree::Sequence(pages));
        if !top.is_empty() {
            root.insert("top_level_tags".into(), MetadataTree::Mapping(top));
        }
        MetadataTree::Mapping(root)
    }
}

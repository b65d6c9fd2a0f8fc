//! PerkinElmer (Akoya) QPTIFF image descriptions.
//!
//! These descriptions are XML documents whose `ScanProfile` element carries
//! a JSON object as text. The JSON is decoded and attached next to the
//! parsed XML.

use tracing::warn;

use crate::tree::{MetadataTree, Scalar};
use crate::xml::{parse_xml, NamespaceMode};

const SCAN_PROFILE_KEY: &str = "ScanProfile";

/// Depth-first search for `key`.
///
/// A mapping that holds `key` answers with its value, truthy or not. Values
/// found further down only count when they are truthy, so an empty element
/// does not stop the search of later siblings.
pub fn find_first_truthy<'a>(data: &'a MetadataTree, key: &str) -> Option<&'a MetadataTree> {
    match data {
        MetadataTree::Mapping(map) => {
            if let Some(value) = map.get(key) {
                return Some(value);
            }
            map.values()
                .find_map(|v| find_first_truthy(v, key).filter(|found| found.is_truthy()))
        }
        MetadataTree::Sequence(items) => items
            .iter()
            .find_map(|v| find_first_truthy(v, key).filter(|found| found.is_truthy())),
        MetadataTree::Scalar(_) => None,
    }
}

/// Parse a PerkinElmer description, decoding the embedded scan profile.
///
/// - XML that does not parse yields `{"error": "Failed generic XML parse", "raw_value": xml}`
/// - a JSON scan profile lands in `parsed_scan_profile`
/// - an undecodable scan profile is recorded as an error node under
///   `ScanProfile` when that is a root key, `parsed_scan_profile_error`
///   otherwise
pub fn parse_perkinelmer_xml(xml: &str) -> MetadataTree {
    let mut parsed = match parse_xml(xml, NamespaceMode::Preserve) {
        Ok(tree) => tree,
        Err(e) => {
            let preview: String = xml.chars().take(200).collect();
            warn!("Failed to parse XML: {}. XML content: {}", e, preview);
            return MetadataTree::error_node("Failed generic XML parse", xml.into());
        }
    };

    let profile = match find_first_truthy(&parsed, SCAN_PROFILE_KEY) {
        Some(MetadataTree::Scalar(Scalar::Str(text))) if !text.is_empty() => text.clone(),
        _ => return parsed,
    };

    if let Some(root) = parsed.as_mapping_mut() {
        match serde_json::from_str::<serde_json::Value>(&profile) {
            Ok(value) => {
                root.insert("parsed_scan_profile".into(), MetadataTree::from(value));
            }
            Err(e) => {
                warn!("ScanProfile is not valid JSON: {}", e);
                let node = MetadataTree::error_node(format!("JSON parse error: {}", e), profile.into());
                let key = if root.contains_key(SCAN_PROFILE_KEY) {
                    SCAN_PROFILE_KEY
                } else {
                    "parsed_scan_profile_error"
                };
                root.insert(key.into(), node);
            }
        }
    }

    parsed
}

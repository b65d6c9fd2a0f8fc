//! Markdown rendering of a processed metadata tree.
//!
//! Rendering never fails: any field the report looks for may be missing and
//! is shown as `N/A`.

use std::path::Path;

use tracing::warn;

use crate::tree::{Mapping, MetadataTree};

/// Placeholder for missing values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Rows shown per "remaining" table before summarizing the rest.
const MAX_ROWS: usize = 5;

/// Cell values are cut to this many characters.
const MAX_CELL_CHARS: usize = 100;

const GENERAL_PROPERTIES: [(&str, &str); 4] = [
    ("Image Width", "imageWidth"),
    ("Image Length", "imageLength"),
    ("Bits Per Sample", "bitsPerSample"),
    ("Date/Time", "dateTime"),
];

const TECHNICAL_DETAILS: [(&str, &str); 7] = [
    ("Software", "software"),
    ("Compression", "compression"),
    ("Photometric Interpretation", "photometricInterpretation"),
    ("X Resolution", "xResolution"),
    ("Y Resolution", "yResolution"),
    ("Resolution Unit", "resolutionUnit"),
    ("Sample Format", "sampleFormat"),
];

/// First-page keys already covered by the property tables.
const HANDLED_PAGE_KEYS: [&str; 14] = [
    "imageWidth",
    "imageLength",
    "bitsPerSample",
    "dateTime",
    "software",
    "compression",
    "photometricInterpretation",
    "xResolution",
    "yResolution",
    "resolutionUnit",
    "sampleFormat",
    "pageIndex",
    "parsedName",
    "tags",
];

/// Root keys rendered outside the catch-all section.
const HANDLED_ROOT_KEYS: [&str; 4] = ["pages", "sourceFile", "sourceFilePath", "schemaVersion"];

fn format_value(value: Option<&MetadataTree>) -> String {
    match value {
        None => NOT_AVAILABLE.to_string(),
        Some(v) if v.is_null() => NOT_AVAILABLE.to_string(),
        Some(v) => v.to_string(),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_CELL_CHARS).collect()
}

/// Source path of the processed tree: `sourceFile`, then `sourceFilePath`.
pub fn source_file(metadata: &MetadataTree) -> &str {
    metadata
        .get("sourceFile")
        .and_then(MetadataTree::as_str)
        .or_else(|| metadata.get("sourceFilePath").and_then(MetadataTree::as_str))
        .unwrap_or("Unknown Source File")
}

fn property_table(lines: &mut Vec<String>, header: &str, rows: &[(&str, &str)], page: &Mapping) {
    lines.push(format!("| {} | Value |", header));
    lines.push("|:---|:---|".to_string());
    for (label, key) in rows {
        lines.push(format!("| {} | {} |", label, format_value(page.get(*key))));
    }
    lines.push(String::new());
}

fn limited_table<'a>(
    lines: &mut Vec<String>,
    header: &str,
    entries: impl ExactSizeIterator<Item = (&'a String, &'a MetadataTree)>,
) {
    let total = entries.len();
    lines.push(format!("| {} | Value |", header));
    lines.push("|:---|:---|".to_string());
    for (count, (key, value)) in entries.enumerate() {
        if count == MAX_ROWS {
            lines.push(format!("| ...and {} more | |", total - count));
            break;
        }
        lines.push(format!("| {} | {} |", key, truncate(&value.to_string())));
    }
    lines.push(String::new());
}

fn first_page_sections(lines: &mut Vec<String>, page: &Mapping) {
    lines.push("## General Image Properties (from first page if available)".to_string());
    property_table(lines, "Property", &GENERAL_PROPERTIES, page);

    lines.push("## Technical Details (from first page if available)".to_string());
    property_table(lines, "Detail", &TECHNICAL_DETAILS, page);

    if let Some(MetadataTree::Mapping(tags)) = page.get("tags") {
        lines.push("### Remaining Tags from First Page (under 'tags' key)".to_string());
        if tags.is_empty() {
            lines.push("| (No remaining tags under 'tags' key) | |".to_string());
            lines.push(String::new());
        } else {
            limited_table(lines, "Tag Key", tags.iter());
        }
    }

    let others: Mapping = page
        .iter()
        .filter(|(key, _)| !HANDLED_PAGE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !others.is_empty() {
        lines.push("### Other Top-Level Fields from First Page".to_string());
        limited_table(lines, "Field Key", others.iter());
    }
}

fn root_block(lines: &mut Vec<String>, key: &str, value: &MetadataTree) {
    lines.push(format!("### {}", key));
    match value {
        MetadataTree::Scalar(scalar) => {
            lines.push("```".to_string());
            lines.push(scalar.to_string());
            lines.push("```".to_string());
        }
        container => match container.to_json_pretty() {
            Ok(json) => {
                lines.push("```json".to_string());
                lines.push(json);
                lines.push("```".to_string());
            }
            Err(e) => {
                warn!("Could not serialize content for root key {}: {}", key, e);
                lines.push(format!(
                    "Could not display content for {} (serialization error).",
                    key
                ));
            }
        },
    }
    lines.push(String::new());
}

/// Render the Markdown report for a processed tree.
pub fn render_markdown(metadata: &MetadataTree) -> String {
    let source = source_file(metadata);
    let basename = Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());

    let mut lines = vec![
        format!("# Metadata Report for {}", basename),
        format!("**Source File:** `{}`", source),
        String::new(),
    ];

    let first_page = metadata
        .get("pages")
        .and_then(MetadataTree::as_sequence)
        .and_then(|pages| pages.first())
        .and_then(MetadataTree::as_mapping);

    match first_page {
        Some(page) => first_page_sections(&mut lines, page),
        None => {
            lines.push("## General Image Properties (from first page if available)".to_string());
            lines.push("No page data available to display general properties.".to_string());
            lines.push(String::new());
        }
    }

    lines.push("## Other Root-Level Metadata Blocks".to_string());
    let mut any_block = false;
    if let Some(root) = metadata.as_mapping() {
        for (key, value) in root {
            if HANDLED_ROOT_KEYS.contains(&key.as_str()) {
                continue;
            }
            any_block = true;
            root_block(&mut lines, key, value);
        }
    }
    if !any_block {
        lines.push("No other root-level metadata blocks found.".to_string());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

//! XML blob decoding and XML-to-tree parsing.
//!
//! Both container formats embed metadata as XML: OME-XML and vendor
//! descriptions in TIFF `ImageDescription` tags, and the `ImageDocument` in
//! the CZI metadata segment. This module turns such a blob into a
//! [`MetadataTree`] using the conventional XML-to-dict mapping:
//!
//! - an element becomes `{name: value}` in its parent mapping
//! - attributes become `@name` keys, text next to attributes or children
//!   becomes `#text`
//! - an element with only text becomes that text, an empty element is null
//! - repeated sibling elements collapse into a sequence
//!
//! Every text leaf and attribute value is coerced to bool/int/float when it
//! looks like one (see [`coerce_xml_scalar`]).

use std::collections::btree_map::Entry;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::error::XmlError;
use crate::tree::{Mapping, MetadataTree, Scalar};

/// Key prefix for attributes.
pub const ATTR_PREFIX: &str = "@";

/// Key for element text that sits next to attributes or child elements.
pub const TEXT_KEY: &str = "#text";

/// How namespace prefixes in element and attribute names are treated.
///
/// Each extractor uses one fixed mode: TIFF descriptions keep prefixes,
/// CZI documents strip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceMode {
    /// Keep qualified names as written (`ome:Pixels`, `@xmlns:ome`)
    Preserve,
    /// Use local names only and drop `xmlns` declarations
    Strip,
}

// =============================================================================
// Decoding
// =============================================================================

/// Candidate encodings tried in order when decoding an XML byte blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf16,
    Utf8,
    Latin1,
}

const CANDIDATE_ENCODINGS: [Encoding; 3] = [Encoding::Utf16, Encoding::Utf8, Encoding::Latin1];

fn decode_with(bytes: &[u8], encoding: Encoding) -> Option<String> {
    match encoding {
        Encoding::Utf16 => decode_utf16(bytes),
        Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
        Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Strict UTF-16: honours a byte order mark, little-endian otherwise.
fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }

    let (body, big_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        _ => (bytes, false),
    };

    let units = body.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });

    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Decode a byte blob that is expected to hold XML.
///
/// The first candidate encoding whose output contains an XML prolog
/// (`<?xml`, case-insensitive) wins; otherwise the bytes are decoded as
/// UTF-8 with replacement characters.
pub fn decode_xml_bytes(bytes: &[u8]) -> String {
    for encoding in CANDIDATE_ENCODINGS {
        if let Some(text) = decode_with(bytes, encoding) {
            if text.to_lowercase().contains("<?xml") {
                return text;
            }
        }
    }
    String::from_utf8_lossy(bytes).into_owned()
}

// =============================================================================
// Scalar coercion
// =============================================================================

/// Coerce an XML text leaf to the scalar it most likely represents.
///
/// - `true`/`false` (any case) become booleans
/// - text containing `.` or an exponent marker is tried as a float
/// - text that is all digits after leading signs is tried as an integer
///
/// Anything that fails to parse stays a string.
pub fn coerce_xml_scalar(value: &str) -> Scalar {
    let lower = value.to_lowercase();
    if lower == "true" || lower == "false" {
        return Scalar::Bool(lower == "true");
    }

    if value.contains('.') || lower.contains('e') {
        return match value.trim().parse::<f64>() {
            Ok(f) => Scalar::Float(f),
            Err(_) => Scalar::Str(value.to_string()),
        };
    }

    let unsigned = value.trim_start_matches(['-', '+']);
    if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = value.parse::<i64>() {
            return Scalar::Int(i);
        }
    }

    Scalar::Str(value.to_string())
}

fn coerce_value(value: MetadataTree) -> MetadataTree {
    match value {
        MetadataTree::Scalar(Scalar::Str(s)) => MetadataTree::Scalar(coerce_xml_scalar(&s)),
        other => other,
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Locate the first `<` that does not open a comment.
fn xml_start(input: &str) -> Option<usize> {
    input
        .match_indices('<')
        .map(|(idx, _)| idx)
        .find(|&idx| !input[idx + 1..].starts_with("!--"))
}

/// Insert `value` under `key`, turning repeated keys into a sequence.
fn push_data(map: &mut Mapping, key: String, value: MetadataTree) {
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            MetadataTree::Sequence(items) => items.push(value),
            existing => {
                let previous = std::mem::replace(existing, MetadataTree::null());
                *existing = MetadataTree::Sequence(vec![previous, value]);
            }
        },
    }
}

/// An element whose end tag has not been seen yet.
struct Frame {
    name: String,
    node: Mapping,
    text: String,
}

impl Frame {
    /// Collapse the element into its tree value.
    fn finish(self) -> (String, MetadataTree) {
        let text = self.text.trim();
        let value = if self.node.is_empty() {
            if text.is_empty() {
                MetadataTree::null()
            } else {
                MetadataTree::string(text)
            }
        } else {
            let mut node = self.node;
            if !text.is_empty() {
                push_data(&mut node, TEXT_KEY.to_string(), coerce_value(text.into()));
            }
            MetadataTree::Mapping(node)
        };
        (self.name, coerce_value(value))
    }
}

fn malformed(err: impl std::fmt::Display) -> XmlError {
    XmlError::Malformed(err.to_string())
}

fn open_frame(start: &BytesStart<'_>, mode: NamespaceMode) -> Result<Frame, XmlError> {
    let name = match mode {
        NamespaceMode::Preserve => String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        NamespaceMode::Strip => {
            String::from_utf8_lossy(start.name().local_name().as_ref()).into_owned()
        }
    };

    let mut node = Mapping::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let qualified = attr.key.as_ref();
        let key = match mode {
            NamespaceMode::Preserve => String::from_utf8_lossy(qualified).into_owned(),
            NamespaceMode::Strip => {
                if qualified == b"xmlns" || qualified.starts_with(b"xmlns:") {
                    continue;
                }
                String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned()
            }
        };
        let value = attr.unescape_value().map_err(malformed)?;
        push_data(
            &mut node,
            format!("{}{}", ATTR_PREFIX, key),
            MetadataTree::Scalar(coerce_xml_scalar(&value)),
        );
    }

    Ok(Frame {
        name,
        node,
        text: String::new(),
    })
}

/// Parse XML text into a tree of the form `{root_name: root_value}`.
///
/// Leading junk before the first non-comment `<` is skipped. Fails on empty
/// input, input that does not start with `<`, and well-formedness errors.
pub fn parse_xml(input: &str, mode: NamespaceMode) -> Result<MetadataTree, XmlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(XmlError::Empty);
    }
    if !trimmed.starts_with('<') {
        return Err(XmlError::NotXml);
    }
    let start = xml_start(input).ok_or(XmlError::NotXml)?;

    let mut reader = Reader::from_str(&input[start..]);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, MetadataTree)> = None;

    loop {
        let event = reader.read_event().map_err(malformed)?;
        match event {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(XmlError::Malformed("junk after document element".into()));
                }
                stack.push(open_frame(&e, mode)?);
            }
            Event::Empty(e) => {
                if root.is_some() {
                    return Err(XmlError::Malformed("junk after document element".into()));
                }
                let finished = open_frame(&e, mode)?.finish();
                match stack.last_mut() {
                    Some(parent) => push_data(&mut parent.node, finished.0, finished.1),
                    None => root = Some(finished),
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| XmlError::Malformed("unexpected closing tag".into()))?;
                let finished = frame.finish();
                match stack.last_mut() {
                    Some(parent) => push_data(&mut parent.node, finished.0, finished.1),
                    None => root = Some(finished),
                }
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(malformed)?;
                match stack.last_mut() {
                    Some(frame) => frame.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(XmlError::Malformed(
                            "text outside of the document element".into(),
                        ))
                    }
                }
            }
            Event::CData(e) => {
                let frame = stack.last_mut().ok_or_else(|| {
                    XmlError::Malformed("CDATA outside of the document element".into())
                })?;
                frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Malformed(format!(
            "unexpected end of input inside <{}>",
            open.name
        )));
    }

    let (name, value) =
        root.ok_or_else(|| XmlError::Malformed("no document element found".into()))?;
    let mut tree = Mapping::new();
    tree.insert(name, value);
    Ok(MetadataTree::Mapping(tree))
}

/// Decode an XML byte blob and parse it (see [`decode_xml_bytes`]).
pub fn parse_xml_bytes(bytes: &[u8], mode: NamespaceMode) -> Result<MetadataTree, XmlError> {
    parse_xml(&decode_xml_bytes(bytes), mode)
}

/// Parse XML, logging a warning and returning `None` on failure.
pub fn try_parse_xml(input: &str, mode: NamespaceMode) -> Option<MetadataTree> {
    match parse_xml(input, mode) {
        Ok(tree) => Some(tree),
        Err(e) => {
            let preview: String = input.chars().take(200).collect();
            warn!("Failed to parse XML: {}. XML content: {}", e, preview);
            None
        }
    }
}

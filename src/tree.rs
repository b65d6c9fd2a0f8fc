//! Schema-less metadata tree.
//!
//! Container parsers produce arbitrarily shaped, arbitrarily deep nested data.
//! [`MetadataTree`] is the tagged variant every stage of the pipeline works on:
//! a mapping, a sequence, or a scalar leaf. Traversals pattern-match on it
//! exhaustively; trees are built fresh per file and never share structure.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// String-keyed mapping node.
pub type Mapping = BTreeMap<String, MetadataTree>;

/// Scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Absent value (empty XML element, JSON null)
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Opaque binary data from UNDEFINED/BYTE tags
    Bytes(Vec<u8>),
}

/// A nested mapping/sequence/scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataTree {
    Mapping(Mapping),
    Sequence(Vec<MetadataTree>),
    Scalar(Scalar),
}

impl Default for MetadataTree {
    fn default() -> Self {
        MetadataTree::Mapping(Mapping::new())
    }
}

impl MetadataTree {
    /// An empty mapping.
    pub fn mapping() -> Self {
        MetadataTree::Mapping(Mapping::new())
    }

    /// The null scalar.
    pub fn null() -> Self {
        MetadataTree::Scalar(Scalar::Null)
    }

    /// A string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        MetadataTree::Scalar(Scalar::Str(value.into()))
    }

    /// A `{"error": ..., "raw_value": ...}` node recording an inline failure.
    pub fn error_node(error: impl Into<String>, raw_value: MetadataTree) -> Self {
        let mut map = Mapping::new();
        map.insert("error".to_string(), MetadataTree::string(error));
        map.insert("raw_value".to_string(), raw_value);
        MetadataTree::Mapping(map)
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            MetadataTree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            MetadataTree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[MetadataTree]> {
        match self {
            MetadataTree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataTree::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetadataTree::Scalar(Scalar::Null))
    }

    /// Look up a key when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&MetadataTree> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Walk a dot-separated key path.
    ///
    /// Digit-only segments index into sequences; on mappings every segment is
    /// looked up as a key, so mapping keys that are themselves numeric resolve.
    pub fn get_path(&self, path: &str) -> Option<&MetadataTree> {
        if path.is_empty() {
            return None;
        }
        let mut node = self;
        for segment in path.split('.') {
            node = match node {
                MetadataTree::Mapping(map) => map.get(segment)?,
                MetadataTree::Sequence(items) => items.get(segment.parse::<usize>().ok()?)?,
                MetadataTree::Scalar(_) => return None,
            };
        }
        Some(node)
    }

    /// Truthiness as used when searching for embedded documents: empty
    /// containers, empty strings, zero, `false` and null are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            MetadataTree::Mapping(map) => !map.is_empty(),
            MetadataTree::Sequence(items) => !items.is_empty(),
            MetadataTree::Scalar(scalar) => match scalar {
                Scalar::Null => false,
                Scalar::Bool(b) => *b,
                Scalar::Int(i) => *i != 0,
                Scalar::Float(f) => *f != 0.0,
                Scalar::Str(s) => !s.is_empty(),
                Scalar::Bytes(b) => !b.is_empty(),
            },
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<Scalar> for MetadataTree {
    fn from(value: Scalar) -> Self {
        MetadataTree::Scalar(value)
    }
}

impl From<Mapping> for MetadataTree {
    fn from(value: Mapping) -> Self {
        MetadataTree::Mapping(value)
    }
}

impl From<Vec<MetadataTree>> for MetadataTree {
    fn from(value: Vec<MetadataTree>) -> Self {
        MetadataTree::Sequence(value)
    }
}

impl From<&str> for MetadataTree {
    fn from(value: &str) -> Self {
        MetadataTree::string(value)
    }
}

impl From<String> for MetadataTree {
    fn from(value: String) -> Self {
        MetadataTree::Scalar(Scalar::Str(value))
    }
}

impl From<i64> for MetadataTree {
    fn from(value: i64) -> Self {
        MetadataTree::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for MetadataTree {
    fn from(value: i32) -> Self {
        MetadataTree::Scalar(Scalar::Int(value.into()))
    }
}

impl From<f64> for MetadataTree {
    fn from(value: f64) -> Self {
        MetadataTree::Scalar(Scalar::Float(value))
    }
}

impl From<bool> for MetadataTree {
    fn from(value: bool) -> Self {
        MetadataTree::Scalar(Scalar::Bool(value))
    }
}

impl From<serde_json::Value> for MetadataTree {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => MetadataTree::null(),
            Value::Bool(b) => b.into(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                // u64 beyond i64 and all floats land here
                None => n.as_f64().map(MetadataTree::from).unwrap_or_else(MetadataTree::null),
            },
            Value::String(s) => s.into(),
            Value::Array(items) => {
                MetadataTree::Sequence(items.into_iter().map(MetadataTree::from).collect())
            }
            Value::Object(map) => MetadataTree::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, MetadataTree::from(v)))
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// JSON encoding
// =============================================================================

/// Render bytes the way a byte-string literal prints: `b'...'` with escapes.
pub fn bytes_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push_str("b'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push('\'');
    out
}

/// Text form of a float: shortest round-trip digits, always with a fraction
/// or exponent; non-finite values use their JSON-incompatible names.
fn float_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let name = if value > 0.0 { "Infinity" } else { "-Infinity" };
        name.to_string()
    } else {
        serde_json::Number::from_f64(value)
            .map(|n| n.to_string())
            .unwrap_or_else(|| value.to_string())
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            // JSON has no NaN/Infinity; these and raw bytes become strings
            Scalar::Float(f) => serializer.serialize_str(&float_text(*f)),
            Scalar::Str(s) => serializer.serialize_str(s),
            Scalar::Bytes(b) => serializer.serialize_str(&bytes_literal(b)),
        }
    }
}

impl Serialize for MetadataTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetadataTree::Mapping(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
            MetadataTree::Sequence(items) => {
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    state.serialize_element(item)?;
                }
                state.end()
            }
            MetadataTree::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

impl MetadataTree {
    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// =============================================================================
// Display
// =============================================================================

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => f.write_str(&float_text(*v)),
            Scalar::Str(s) => f.write_str(s),
            Scalar::Bytes(b) => f.write_str(&bytes_literal(b)),
        }
    }
}

/// Scalars print bare; containers print as compact JSON.
impl fmt::Display for MetadataTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataTree::Scalar(scalar) => scalar.fmt(f),
            container => {
                let json = serde_json::to_string(container).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

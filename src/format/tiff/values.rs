//! TIFF tag value reading.
//!
//! Values are stored either inline in the IFD entry (for small values) or at
//! an offset in the file. [`ValueReader`] fetches the bytes and
//! [`decode_value`] turns them into a [`MetadataTree`] according to the
//! entry's field type:
//!
//! | Field type | Decoded as |
//! |:-----------|:-----------|
//! | ASCII | string up to the first NUL |
//! | integer types | integer, or a list when count > 1 |
//! | RATIONAL / SRATIONAL | `[num, den]`, or a flat list when count > 1 |
//! | FLOAT / DOUBLE | float, or a list when count > 1 |
//! | UNDEFINED | raw bytes |

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;
use crate::tree::{MetadataTree, Scalar};

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::{tag_name, FieldType};

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF file.
///
/// Combines a RangeReader with the header so values are read in the file's
/// byte order and format.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    /// Create a new ValueReader.
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Get the byte order from the header.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read raw bytes for an IFD entry's value.
    ///
    /// For inline values, returns the bytes from the entry.
    /// For offset values, fetches the bytes from the file.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ));
        }

        let len = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
            tag: tag_name(entry.tag_id).into_owned(),
            message: format!("value of {} bytes is too large to read", size),
        })?;
        let offset = entry.value_offset(self.header.byte_order);
        Ok(self.reader.read_exact_at(offset, len).await?)
    }

    /// Read and decode an entry's value.
    pub async fn read_value(&self, entry: &IfdEntry) -> Result<MetadataTree, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        let bytes = self.read_bytes(entry).await?;
        Ok(decode_value(
            &bytes,
            field_type,
            entry.count as usize,
            self.header.byte_order,
        ))
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Convert an unsigned value that may exceed `i64`.
fn unsigned(value: u64) -> MetadataTree {
    match i64::try_from(value) {
        Ok(v) => MetadataTree::from(v),
        Err(_) => MetadataTree::string(value.to_string()),
    }
}

/// Decode a single element at index `i`.
fn decode_element(bytes: &[u8], field_type: FieldType, i: usize, byte_order: ByteOrder) -> MetadataTree {
    let size = field_type.size_in_bytes();
    let b = &bytes[i * size..(i + 1) * size];
    match field_type {
        FieldType::Byte | FieldType::Ascii | FieldType::Undefined => MetadataTree::from(b[0] as i64),
        FieldType::SByte => MetadataTree::from(b[0] as i8 as i64),
        FieldType::Short => MetadataTree::from(byte_order.read_u16(b) as i64),
        FieldType::SShort => MetadataTree::from(byte_order.read_u16(b) as i16 as i64),
        FieldType::Long | FieldType::Ifd => MetadataTree::from(byte_order.read_u32(b) as i64),
        FieldType::SLong => MetadataTree::from(byte_order.read_u32(b) as i32 as i64),
        FieldType::Long8 | FieldType::Ifd8 => unsigned(byte_order.read_u64(b)),
        FieldType::SLong8 => MetadataTree::from(byte_order.read_u64(b) as i64),
        FieldType::Float => MetadataTree::from(f32::from_bits(byte_order.read_u32(b)) as f64),
        FieldType::Double => MetadataTree::from(f64::from_bits(byte_order.read_u64(b))),
        FieldType::Rational => MetadataTree::Sequence(vec![
            MetadataTree::from(byte_order.read_u32(&b[0..4]) as i64),
            MetadataTree::from(byte_order.read_u32(&b[4..8]) as i64),
        ]),
        FieldType::SRational => MetadataTree::Sequence(vec![
            MetadataTree::from(byte_order.read_u32(&b[0..4]) as i32 as i64),
            MetadataTree::from(byte_order.read_u32(&b[4..8]) as i32 as i64),
        ]),
    }
}

/// Decode `count` values of `field_type` from `bytes`.
///
/// Elements missing from a short buffer are dropped rather than failing.
pub fn decode_value(
    bytes: &[u8],
    field_type: FieldType,
    count: usize,
    byte_order: ByteOrder,
) -> MetadataTree {
    let available = count.min(bytes.len() / field_type.size_in_bytes());

    match field_type {
        FieldType::Ascii => {
            let data = &bytes[..available];
            let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
            MetadataTree::string(String::from_utf8_lossy(&data[..end]))
        }
        FieldType::Undefined => MetadataTree::Scalar(Scalar::Bytes(bytes[..available].to_vec())),
        FieldType::Rational | FieldType::SRational if available > 1 => {
            // Several rationals flatten to num, den, num, den, ...
            let flat = (0..available)
                .flat_map(|i| match decode_element(bytes, field_type, i, byte_order) {
                    MetadataTree::Sequence(pair) => pair,
                    other => vec![other],
                })
                .collect();
            MetadataTree::Sequence(flat)
        }
        _ if available == 1 => decode_element(bytes, field_type, 0, byte_order),
        _ => MetadataTree::Sequence(
            (0..available)
                .map(|i| decode_element(bytes, field_type, i, byte_order))
                .collect(),
        ),
    }
}

// =============================================================================
// Tests
// =============================================================================

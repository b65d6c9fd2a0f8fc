//! TIFF parser for microscopy containers.
//!
//! This module handles parsing of TIFF and BigTIFF files, the container used
//! by OME-TIFF, QPTIFF and most scanner exports.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. The parser handles both transparently.
//!
//! - **IFD (Image File Directory)**: One per page. Its entries are the tags
//!   that end up in the extracted metadata.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod directory;
mod parser;
mod tags;
mod values;

pub use directory::{TiffDirectory, MAX_IFDS};
pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{tag_name, FieldType, TiffTag};
pub use values::{decode_value, ValueReader};

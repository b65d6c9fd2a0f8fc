//! Container detection by magic bytes.
//!
//! Extractors are chosen by file extension; detection is a cross-check that
//! the bytes actually match, so a mislabelled file is reported instead of
//! silently producing an error tree.
//!
//! - **TIFF / BigTIFF**: `II` or `MM` followed by version 42 or 43
//! - **CZI**: a `ZISRAWFILE` segment at offset 0

use crate::error::IoError;
use crate::io::RangeReader;

use super::czi::is_czi_header;
use super::tiff::{ByteOrder, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};

// =============================================================================
// ContainerFormat
// =============================================================================

/// Container format identified from the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// Classic TIFF (32-bit offsets)
    Tiff,

    /// BigTIFF (64-bit offsets)
    BigTiff,

    /// Carl Zeiss ZISRAW
    Czi,
}

impl ContainerFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Tiff => "TIFF",
            ContainerFormat::BigTiff => "BigTIFF",
            ContainerFormat::Czi => "CZI",
        }
    }

    /// Name of the built-in extractor that reads this container.
    pub const fn extractor_name(&self) -> &'static str {
        match self {
            ContainerFormat::Tiff | ContainerFormat::BigTiff => "tiff",
            ContainerFormat::Czi => "czi",
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Bytes examined for detection.
const MIN_HEADER_BYTES: usize = BIGTIFF_HEADER_SIZE;

/// Identify the container format from its leading bytes.
pub fn detect_from_bytes(bytes: &[u8]) -> Option<ContainerFormat> {
    if is_czi_header(bytes) {
        return Some(ContainerFormat::Czi);
    }
    if is_tiff_header(bytes) {
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = if magic == 0x4949 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        return match byte_order.read_u16(&bytes[2..4]) {
            43 => Some(ContainerFormat::BigTiff),
            _ => Some(ContainerFormat::Tiff),
        };
    }
    None
}

/// Read the start of a file and identify its container format.
///
/// Returns `Ok(None)` for unrecognised content, including files shorter
/// than a TIFF header.
pub async fn detect_container<R: RangeReader + ?Sized>(
    reader: &R,
) -> Result<Option<ContainerFormat>, IoError> {
    let len = (MIN_HEADER_BYTES as u64).min(reader.size()) as usize;
    let bytes = reader.read_exact_at(0, len).await?;
    Ok(detect_from_bytes(&bytes))
}

/// Check if bytes represent a valid TIFF header.
///
/// This is a quick check that can be used before attempting full parsing.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    // Check magic bytes
    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    if magic != 0x4949 && magic != 0x4D4D {
        return false;
    }

    // Check version
    let byte_order = if magic == 0x4949 {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    };

    let version = byte_order.read_u16(&bytes[2..4]);
    version == 42 || version == 43
}

// =============================================================================
// Tests
// =============================================================================

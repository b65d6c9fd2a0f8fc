//! Carl Zeiss CZI (ZISRAW) container reading.
//!
//! A CZI file is a sequence of segments, each introduced by a 32-byte
//! header. The first segment is always `ZISRAWFILE`, whose payload points at
//! the other top-level structures. Only the path to the XML metadata is
//! followed here.
//!
//! # Segment Header (32 bytes, little-endian)
//! ```text
//! Bytes 0-15:  Segment id, ASCII, NUL padded
//! Bytes 16-23: Allocated size of the payload
//! Bytes 24-31: Used size of the payload
//! ```
//!
//! # File Header Payload (ZISRAWFILE)
//! ```text
//! Bytes 0-3:   Major version
//! Bytes 4-7:   Minor version
//! Bytes 8-15:  Reserved
//! Bytes 16-31: Primary file GUID
//! Bytes 32-47: File GUID
//! Bytes 48-51: File part
//! Bytes 52-59: Directory position
//! Bytes 60-67: Metadata position
//! Bytes 68-71: Update pending flag
//! Bytes 72-79: Attachment directory position
//! ```
//!
//! # Metadata Payload (ZISRAWMETADATA)
//! ```text
//! Bytes 0-3:    XML size
//! Bytes 4-7:    Attachment size
//! Bytes 8-255:  Spare
//! Bytes 256-:   XML document
//! ```

use tracing::debug;

use crate::error::CziError;
use crate::io::{read_u32_le, read_u64_le, RangeReader};
use crate::tree::{Mapping, MetadataTree};

// =============================================================================
// Constants
// =============================================================================

/// Size of every segment header in bytes
pub const SEGMENT_HEADER_SIZE: usize = 32;

/// Size of the ZISRAWFILE payload fields that are read
const FILE_HEADER_PAYLOAD_SIZE: usize = 80;

/// Size of the fixed part of the ZISRAWMETADATA payload
const METADATA_PAYLOAD_PREFIX_SIZE: usize = 256;

/// Segment id of the file header
pub const FILE_SEGMENT_ID: &str = "ZISRAWFILE";

/// Segment id of the metadata segment
pub const METADATA_SEGMENT_ID: &str = "ZISRAWMETADATA";

// =============================================================================
// SegmentHeader
// =============================================================================

/// Header shared by all CZI segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub id: String,
    pub allocated_size: u64,
    pub used_size: u64,
}

impl SegmentHeader {
    /// Parse a segment header from at least 32 bytes.
    pub fn parse(bytes: &[u8]) -> Self {
        SegmentHeader {
            id: segment_id(bytes),
            allocated_size: read_u64_le(&bytes[16..24]),
            used_size: read_u64_le(&bytes[24..32]),
        }
    }

    fn expect_id(&self, expected: &'static str) -> Result<(), CziError> {
        expect_id(&self.id, expected)
    }
}

/// The NUL-trimmed id from the first (up to) 16 bytes of a segment.
fn segment_id(bytes: &[u8]) -> String {
    let raw_id = &bytes[..bytes.len().min(16)];
    let end = raw_id.iter().position(|&b| b == 0).unwrap_or(raw_id.len());
    String::from_utf8_lossy(&raw_id[..end]).into_owned()
}

fn expect_id(actual: &str, expected: &'static str) -> Result<(), CziError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CziError::InvalidSegmentId {
            expected,
            actual: actual.to_string(),
        })
    }
}

/// Check whether bytes start with a ZISRAWFILE segment id.
pub fn is_czi_header(bytes: &[u8]) -> bool {
    bytes.len() >= FILE_SEGMENT_ID.len() && bytes.starts_with(FILE_SEGMENT_ID.as_bytes())
}

// =============================================================================
// CziFileHeader
// =============================================================================

/// Parsed ZISRAWFILE payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CziFileHeader {
    pub major_version: i32,
    pub minor_version: i32,
    pub primary_file_guid: [u8; 16],
    pub file_guid: [u8; 16],
    pub file_part: i32,
    pub directory_position: u64,
    pub metadata_position: u64,
    pub update_pending: bool,
    pub attachment_directory_position: u64,
}

fn guid(bytes: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes[..16]);
    out
}

fn guid_text(bytes: &[u8; 16]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl CziFileHeader {
    /// Total bytes needed from offset 0 to parse the file header.
    pub const REQUIRED_SIZE: usize = SEGMENT_HEADER_SIZE + FILE_HEADER_PAYLOAD_SIZE;

    /// Parse the file header from the first [`Self::REQUIRED_SIZE`] bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, CziError> {
        if bytes.len() < Self::REQUIRED_SIZE {
            return Err(CziError::FileTooSmall {
                required: Self::REQUIRED_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        SegmentHeader::parse(bytes).expect_id(FILE_SEGMENT_ID)?;

        let p = &bytes[SEGMENT_HEADER_SIZE..];
        Ok(CziFileHeader {
            major_version: read_u32_le(&p[0..4]) as i32,
            minor_version: read_u32_le(&p[4..8]) as i32,
            primary_file_guid: guid(&p[16..32]),
            file_guid: guid(&p[32..48]),
            file_part: read_u32_le(&p[48..52]) as i32,
            directory_position: read_u64_le(&p[52..60]),
            metadata_position: read_u64_le(&p[60..68]),
            update_pending: read_u32_le(&p[68..72]) != 0,
            attachment_directory_position: read_u64_le(&p[72..80]),
        })
    }

    /// Summary reported when a file carries no metadata segment.
    pub fn summary(&self) -> MetadataTree {
        let mut map = Mapping::new();
        map.insert("major_version".into(), (self.major_version as i64).into());
        map.insert("minor_version".into(), (self.minor_version as i64).into());
        map.insert("file_part".into(), (self.file_part as i64).into());
        map.insert(
            "primary_file_guid".into(),
            guid_text(&self.primary_file_guid).into(),
        );
        map.insert("file_guid".into(), guid_text(&self.file_guid).into());
        map.insert(
            "directory_position".into(),
            MetadataTree::from(self.directory_position.to_string()),
        );
        map.insert(
            "metadata_position".into(),
            MetadataTree::from(self.metadata_position.to_string()),
        );
        map.insert(
            "attachment_directory_position".into(),
            MetadataTree::from(self.attachment_directory_position.to_string()),
        );
        map.insert("update_pending".into(), self.update_pending.into());
        MetadataTree::Mapping(map)
    }
}

// =============================================================================
// Reading
// =============================================================================

/// Read and validate the file header at offset 0.
pub async fn read_file_header<R: RangeReader + ?Sized>(
    reader: &R,
) -> Result<CziFileHeader, CziError> {
    let size = reader.size();
    if size < CziFileHeader::REQUIRED_SIZE as u64 {
        // Report a wrong magic in preference to a short file
        let head = reader.read_exact_at(0, size as usize).await?;
        expect_id(&segment_id(&head), FILE_SEGMENT_ID)?;
        return Err(CziError::FileTooSmall {
            required: CziFileHeader::REQUIRED_SIZE as u64,
            actual: size,
        });
    }

    let bytes = reader
        .read_exact_at(0, CziFileHeader::REQUIRED_SIZE)
        .await?;
    CziFileHeader::parse(&bytes)
}

/// Read the XML document from the metadata segment.
///
/// Returns `None` when the file header has no metadata position.
pub async fn read_metadata_xml<R: RangeReader + ?Sized>(
    reader: &R,
    header: &CziFileHeader,
) -> Result<Option<String>, CziError> {
    let offset = header.metadata_position;
    if offset == 0 {
        return Ok(None);
    }

    let invalid = |message: String| CziError::InvalidMetadataSegment { offset, message };

    let prefix_len = SEGMENT_HEADER_SIZE + METADATA_PAYLOAD_PREFIX_SIZE;
    let prefix = reader
        .read_exact_at(offset, prefix_len)
        .await
        .map_err(|e| invalid(e.to_string()))?;

    SegmentHeader::parse(&prefix).expect_id(METADATA_SEGMENT_ID)?;

    let payload = &prefix[SEGMENT_HEADER_SIZE..];
    let xml_size = read_u32_le(&payload[0..4]) as i32;
    let attachment_size = read_u32_le(&payload[4..8]) as i32;
    if xml_size < 0 {
        return Err(invalid(format!("negative XML size {}", xml_size)));
    }
    debug!(
        "CZI metadata segment at {}: xml_size={}, attachment_size={}",
        offset, xml_size, attachment_size
    );

    let xml_bytes = reader
        .read_exact_at(offset + prefix_len as u64, xml_size as usize)
        .await
        .map_err(|e| invalid(e.to_string()))?;

    let end = xml_bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    Ok(Some(String::from_utf8_lossy(&xml_bytes[..end]).into_owned()))
}

//! Test utilities for integration tests.
//!
//! In-memory builders for TIFF, BigTIFF and CZI files, plus helpers for
//! writing them to a temporary directory.

use std::path::{Path, PathBuf};

// =============================================================================
// TIFF File Builders
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Builder for creating test TIFF files.
///
/// IFDs are laid out one after another, each followed by the values that do
/// not fit inline, and chained through their next-IFD offsets.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    ifds: Vec<IfdBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            ifds: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Build the TIFF file data.
    pub fn build(self) -> Vec<u8> {
        let order = self.byte_order;
        let big = self.is_bigtiff;
        let mut data = Vec::new();

        match order {
            ByteOrderType::LittleEndian => data.extend(b"II"),
            ByteOrderType::BigEndian => data.extend(b"MM"),
        }

        if big {
            write_value(&mut data, order, 43, 2);
            write_value(&mut data, order, 8, 2);
            write_value(&mut data, order, 0, 2);
        } else {
            write_value(&mut data, order, 42, 2);
        }

        let offset_size = if big { 8 } else { 4 };
        let mut pending_next = data.len();
        write_value(&mut data, order, 0, offset_size);

        for ifd in &self.ifds {
            let ifd_offset = data.len() as u64;
            patch_value(&mut data, order, pending_next, ifd_offset, offset_size);
            pending_next = ifd.write_to(&mut data, order, big);
        }

        data
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

enum EntryValue {
    /// Numeric values, encoded per field type at build time
    Numbers(Vec<u64>),
    /// Bytes written as-is (ASCII, BYTE, UNDEFINED)
    Raw(Vec<u8>),
}

struct IfdEntryBuilder {
    tag: u16,
    field_type: u16,
    value: EntryValue,
}

/// Builder for one IFD.
pub struct IfdBuilder {
    entries: Vec<IfdEntryBuilder>,
}

impl IfdBuilder {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// A typical strip image: size, bits, compression and photometric tags.
    pub fn basic_image(width: u32, height: u32) -> Self {
        let mut builder = Self::new();
        builder
            .add_long(256, width) // ImageWidth
            .add_long(257, height) // ImageLength
            .add_short(258, 8) // BitsPerSample
            .add_short(259, 1) // Compression = None
            .add_short(262, 1); // PhotometricInterpretation = MinIsBlack
        builder
    }

    /// Add a numeric tag entry with one or more values.
    pub fn add_entry(&mut self, tag: u16, field_type: u16, values: &[u64]) -> &mut Self {
        self.entries.push(IfdEntryBuilder {
            tag,
            field_type,
            value: EntryValue::Numbers(values.to_vec()),
        });
        self
    }

    /// Add a tag entry whose value is raw bytes.
    pub fn add_entry_with_data(&mut self, tag: u16, field_type: u16, data: Vec<u8>) -> &mut Self {
        self.entries.push(IfdEntryBuilder {
            tag,
            field_type,
            value: EntryValue::Raw(data),
        });
        self
    }

    pub fn add_short(&mut self, tag: u16, value: u16) -> &mut Self {
        self.add_entry(tag, 3, &[value as u64])
    }

    pub fn add_long(&mut self, tag: u16, value: u32) -> &mut Self {
        self.add_entry(tag, 4, &[value as u64])
    }

    pub fn add_rational(&mut self, tag: u16, numerator: u32, denominator: u32) -> &mut Self {
        self.add_entry(tag, 5, &[numerator as u64, denominator as u64])
    }

    pub fn add_double(&mut self, tag: u16, value: f64) -> &mut Self {
        self.add_entry(tag, 12, &[value.to_bits()])
    }

    /// ASCII value; a terminating NUL is appended.
    pub fn add_ascii(&mut self, tag: u16, text: &str) -> &mut Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.add_entry_with_data(tag, 2, bytes)
    }

    pub fn add_undefined(&mut self, tag: u16, bytes: &[u8]) -> &mut Self {
        self.add_entry_with_data(tag, 7, bytes.to_vec())
    }

    /// Write the IFD followed by its out-of-line values. Returns the position
    /// of the next-IFD offset field.
    fn write_to(&self, data: &mut Vec<u8>, order: ByteOrderType, big: bool) -> usize {
        let inline_size = if big { 8 } else { 4 };
        let count_size = if big { 8 } else { 2 };
        let entry_size = if big { 20 } else { 12 };

        let mut entries: Vec<&IfdEntryBuilder> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.tag);

        let ifd_start = data.len();
        let ifd_len = count_size + entries.len() * entry_size + inline_size;
        let mut external_offset = (ifd_start + ifd_len) as u64;
        let mut external = Vec::new();

        write_value(data, order, entries.len() as u64, count_size);

        for entry in entries {
            let (count, bytes) = encode_entry(entry, order);

            write_value(data, order, entry.tag as u64, 2);
            write_value(data, order, entry.field_type as u64, 2);
            write_value(data, order, count, inline_size);

            if bytes.len() <= inline_size {
                let mut field = bytes;
                field.resize(inline_size, 0);
                data.extend(field);
            } else {
                write_value(data, order, external_offset, inline_size);
                external_offset += bytes.len() as u64;
                external.extend(bytes);
            }
        }

        let next_pos = data.len();
        write_value(data, order, 0, inline_size);
        data.extend(external);
        next_pos
    }
}

impl Default for IfdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn field_type_size(field_type: u16) -> usize {
    match field_type {
        1 => 1,  // BYTE
        2 => 1,  // ASCII
        3 => 2,  // SHORT
        4 => 4,  // LONG
        5 => 8,  // RATIONAL
        6 => 1,  // SBYTE
        7 => 1,  // UNDEFINED
        8 => 2,  // SSHORT
        9 => 4,  // SLONG
        10 => 8, // SRATIONAL
        11 => 4, // FLOAT
        12 => 8, // DOUBLE
        16 => 8, // LONG8 (BigTIFF)
        17 => 8, // SLONG8 (BigTIFF)
        18 => 8, // IFD8 (BigTIFF)
        _ => 1,
    }
}

/// Count and encoded bytes of an entry's value.
fn encode_entry(entry: &IfdEntryBuilder, order: ByteOrderType) -> (u64, Vec<u8>) {
    match &entry.value {
        EntryValue::Raw(bytes) => (bytes.len() as u64, bytes.clone()),
        EntryValue::Numbers(values) => {
            let rational = matches!(entry.field_type, 5 | 10);
            let element_size = if rational { 4 } else { field_type_size(entry.field_type) };
            let mut bytes = Vec::new();
            for &v in values {
                write_value(&mut bytes, order, v, element_size);
            }
            let count = if rational { values.len() / 2 } else { values.len() };
            (count as u64, bytes)
        }
    }
}

fn write_value(data: &mut Vec<u8>, byte_order: ByteOrderType, value: u64, size: usize) {
    match byte_order {
        ByteOrderType::LittleEndian => match size {
            1 => data.push(value as u8),
            2 => data.extend(&(value as u16).to_le_bytes()),
            4 => data.extend(&(value as u32).to_le_bytes()),
            8 => data.extend(&value.to_le_bytes()),
            _ => {}
        },
        ByteOrderType::BigEndian => match size {
            1 => data.push(value as u8),
            2 => data.extend(&(value as u16).to_be_bytes()),
            4 => data.extend(&(value as u32).to_be_bytes()),
            8 => data.extend(&value.to_be_bytes()),
            _ => {}
        },
    }
}

fn patch_value(data: &mut [u8], byte_order: ByteOrderType, pos: usize, value: u64, size: usize) {
    let mut encoded = Vec::with_capacity(size);
    write_value(&mut encoded, byte_order, value, size);
    data[pos..pos + size].copy_from_slice(&encoded);
}

// =============================================================================
// Sample TIFF Files
// =============================================================================

/// Two-page TIFF with resolution, software and a plain description.
pub fn create_two_page_tiff(byte_order: ByteOrderType) -> Vec<u8> {
    let mut first = IfdBuilder::basic_image(1024, 768);
    first
        .add_ascii(270, "Plain description")
        .add_rational(282, 300, 1)
        .add_rational(283, 300, 1)
        .add_short(296, 2)
        .add_ascii(305, "ScopeSoft 2.1")
        .add_ascii(306, "2024:05:01 12:30:00")
        .add_ascii(271, "Acme");

    let second = IfdBuilder::basic_image(256, 192);

    TiffBuilder::new()
        .with_byte_order(byte_order)
        .add_ifd(first)
        .add_ifd(second)
        .build()
}

pub const OME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2016-06">
  <Image ID="Image:0" Name="sample">
    <Pixels ID="Pixels:0" SizeX="64" SizeY="32" SizeC="2" PhysicalSizeX="0.325" Type="uint16">
      <Channel ID="Channel:0:0" Name="DAPI"/>
      <Channel ID="Channel:0:1" Name="FITC"/>
    </Pixels>
  </Image>
</OME>"#;

pub fn create_ome_tiff() -> Vec<u8> {
    let mut ifd = IfdBuilder::basic_image(64, 32);
    ifd.add_ascii(270, OME_XML);
    TiffBuilder::new().add_ifd(ifd).build()
}

pub const PERKINELMER_XML: &str = r#"<?xml version="1.0" encoding="utf-16"?>
<PerkinElmer-QPI-ImageDescription>
  <DescriptionVersion>2</DescriptionVersion>
  <ImageType>FullResolution</ImageType>
  <Name>DAPI</Name>
  <ScanProfile>{"ScanResolution": 0.5, "Filters": ["DAPI", "FITC"]}</ScanProfile>
</PerkinElmer-QPI-ImageDescription>"#;

/// QPTIFF whose first page carries a PerkinElmer description.
pub fn create_qptiff() -> Vec<u8> {
    let mut first = IfdBuilder::basic_image(2048, 1024);
    first.add_ascii(270, PERKINELMER_XML).add_ascii(305, "PerkinElmer-QPI");
    let mut thumb = IfdBuilder::basic_image(128, 64);
    thumb.add_ascii(270, "<PerkinElmer-QPI-ImageDescription><ImageType>Thumbnail</ImageType></PerkinElmer-QPI-ImageDescription>");

    TiffBuilder::new().add_ifd(first).add_ifd(thumb).build()
}

pub fn create_imagej_tiff() -> Vec<u8> {
    let mut ifd = IfdBuilder::basic_image(32, 32);
    ifd.add_ascii(270, "ImageJ=1.54f\nimages=3\nchannels=3\nunit=micron\nspacing=0.5\n");
    TiffBuilder::new().add_ifd(ifd).build()
}

// =============================================================================
// CZI File Builders
// =============================================================================

const CZI_SEGMENT_HEADER_SIZE: usize = 32;
const CZI_FILE_HEADER_PAYLOAD_SIZE: usize = 80;
const CZI_METADATA_PREFIX_SIZE: usize = 256;

fn push_segment_header(data: &mut Vec<u8>, id: &str, payload_size: u64) {
    let mut raw_id = [0u8; 16];
    raw_id[..id.len()].copy_from_slice(id.as_bytes());
    data.extend(raw_id);
    data.extend(payload_size.to_le_bytes());
    data.extend(payload_size.to_le_bytes());
}

/// Builder for minimal CZI files: a file header and an optional metadata
/// segment holding `xml`.
pub struct CziBuilder {
    major_version: i32,
    minor_version: i32,
    xml: Option<String>,
}

impl CziBuilder {
    pub fn new() -> Self {
        Self {
            major_version: 1,
            minor_version: 0,
            xml: None,
        }
    }

    pub fn with_version(mut self, major: i32, minor: i32) -> Self {
        self.major_version = major;
        self.minor_version = minor;
        self
    }

    pub fn with_metadata_xml(mut self, xml: impl Into<String>) -> Self {
        self.xml = Some(xml.into());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = Vec::new();
        push_segment_header(&mut data, "ZISRAWFILE", CZI_FILE_HEADER_PAYLOAD_SIZE as u64);

        let metadata_position = if self.xml.is_some() {
            (CZI_SEGMENT_HEADER_SIZE + CZI_FILE_HEADER_PAYLOAD_SIZE) as u64
        } else {
            0
        };

        let mut payload = Vec::with_capacity(CZI_FILE_HEADER_PAYLOAD_SIZE);
        payload.extend(self.major_version.to_le_bytes());
        payload.extend(self.minor_version.to_le_bytes());
        payload.extend([0u8; 8]); // reserved
        payload.extend([0x11u8; 16]); // primary file GUID
        payload.extend([0x22u8; 16]); // file GUID
        payload.extend(0i32.to_le_bytes()); // file part
        payload.extend(0u64.to_le_bytes()); // directory position
        payload.extend(metadata_position.to_le_bytes());
        payload.extend(0i32.to_le_bytes()); // update pending
        payload.extend(0u64.to_le_bytes()); // attachment directory position
        data.extend(payload);

        if let Some(xml) = self.xml {
            let xml_bytes = xml.into_bytes();
            let payload_size = (CZI_METADATA_PREFIX_SIZE + xml_bytes.len()) as u64;
            push_segment_header(&mut data, "ZISRAWMETADATA", payload_size);
            data.extend((xml_bytes.len() as i32).to_le_bytes());
            data.extend(0i32.to_le_bytes()); // attachment size
            data.extend([0u8; CZI_METADATA_PREFIX_SIZE - 8]);
            data.extend(xml_bytes);
        }

        data
    }
}

impl Default for CziBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub const CZI_XML: &str = r#"<ImageDocument xmlns:zen="http://www.zeiss.com/zen">
  <Metadata>
    <Information>
      <Image>
        <SizeX>512</SizeX>
        <SizeY>256</SizeY>
        <zen:PixelType>Gray16</zen:PixelType>
      </Image>
    </Information>
    <Scaling>
      <Items>
        <Distance Id="X"><Value>1.5E-07</Value></Distance>
        <Distance Id="Y"><Value>1.5E-07</Value></Distance>
      </Items>
    </Scaling>
  </Metadata>
</ImageDocument>"#;

// =============================================================================
// Filesystem Helpers
// =============================================================================

/// Write `data` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn is_tiff_magic(data: &[u8]) -> bool {
    data.len() >= 4 && (data.starts_with(b"II*\0") || data.starts_with(b"MM\0*"))
}

pub fn is_bigtiff_magic(data: &[u8]) -> bool {
    data.len() >= 4 && (data.starts_with(b"II+\0") || data.starts_with(b"MM\0+"))
}

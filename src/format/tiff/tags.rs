//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for TIFF parsing, including:
//! - Field types that determine how values are encoded
//! - Tag IDs and the names they are reported under
//!
//! The definitions support both classic TIFF and BigTIFF formats.

use std::borrow::Cow;

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// Each field type has a specific size in bytes, which is critical for:
/// - Determining if a value fits inline in an IFD entry
/// - Reading arrays of values correctly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,

    /// 8-bit ASCII character, NUL terminated
    Ascii = 2,

    /// Unsigned 16-bit integer
    Short = 3,

    /// Unsigned 32-bit integer
    Long = 4,

    /// Two LONGs: numerator and denominator
    Rational = 5,

    /// Signed 8-bit integer
    SByte = 6,

    /// Undefined byte data
    Undefined = 7,

    /// Signed 16-bit integer
    SShort = 8,

    /// Signed 32-bit integer
    SLong = 9,

    /// Two SLONGs: numerator and denominator
    SRational = 10,

    /// IEEE single precision float
    Float = 11,

    /// IEEE double precision float
    Double = 12,

    /// 32-bit IFD offset
    Ifd = 13,

    /// Unsigned 64-bit integer (BigTIFF)
    Long8 = 16,

    /// Signed 64-bit integer (BigTIFF)
    SLong8 = 17,

    /// 64-bit IFD offset (BigTIFF)
    Ifd8 = 18,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }

    /// Maximum bytes that can be stored inline in a classic TIFF IFD entry.
    pub const INLINE_THRESHOLD_TIFF: usize = 4;

    /// Maximum bytes that can be stored inline in a BigTIFF IFD entry.
    pub const INLINE_THRESHOLD_BIGTIFF: usize = 8;

    /// Check if a value with this type and count fits inline in an entry.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let threshold = if is_bigtiff {
            Self::INLINE_THRESHOLD_BIGTIFF as u64
        } else {
            Self::INLINE_THRESHOLD_TIFF as u64
        };
        match (self.size_in_bytes() as u64).checked_mul(count) {
            Some(total_size) => total_size <= threshold,
            None => false,
        }
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// Well-known TIFF tag IDs.
///
/// Covers the baseline and extension tags plus the private tags commonly
/// found in microscopy files. Tags outside this set are still extracted,
/// under their decimal ID (see [`tag_name`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    NewSubfileType = 254,
    SubfileType = 255,
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    Threshholding = 263,
    CellWidth = 264,
    CellLength = 265,
    FillOrder = 266,
    DocumentName = 269,
    ImageDescription = 270,
    Make = 271,
    Model = 272,
    StripOffsets = 273,
    Orientation = 274,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    MinSampleValue = 280,
    MaxSampleValue = 281,
    XResolution = 282,
    YResolution = 283,
    PlanarConfiguration = 284,
    PageName = 285,
    XPosition = 286,
    YPosition = 287,
    GrayResponseUnit = 290,
    GrayResponseCurve = 291,
    ResolutionUnit = 296,
    PageNumber = 297,
    TransferFunction = 301,
    Software = 305,
    DateTime = 306,
    Artist = 315,
    HostComputer = 316,
    Predictor = 317,
    WhitePoint = 318,
    PrimaryChromaticities = 319,
    ColorMap = 320,
    HalftoneHints = 321,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SubIfds = 330,
    InkSet = 332,
    InkNames = 333,
    NumberOfInks = 334,
    ExtraSamples = 338,
    SampleFormat = 339,
    SMinSampleValue = 340,
    SMaxSampleValue = 341,
    JpegTables = 347,
    YCbCrCoefficients = 529,
    YCbCrSubSampling = 530,
    YCbCrPositioning = 531,
    ReferenceBlackWhite = 532,
    Xmp = 700,
    ImageId = 32781,
    Copyright = 33432,
    ExposureTime = 33434,
    FNumber = 33437,
    IptcNaa = 33723,
    Photoshop = 34377,
    ExifIfd = 34665,
    IccProfile = 34675,
    GpsIfd = 34853,
    ImageJMetaDataByteCounts = 50838,
    ImageJMetaData = 50839,
}

impl TiffTag {
    /// Create a TiffTag from its numeric value.
    ///
    /// Returns `None` for tags outside the known vocabulary.
    pub fn from_u16(value: u16) -> Option<Self> {
        KNOWN_TAGS
            .iter()
            .find(|(tag, _)| tag.as_u16() == value)
            .map(|(tag, _)| *tag)
    }

    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Name the tag is reported under in extracted metadata.
    pub fn name(self) -> &'static str {
        KNOWN_TAGS
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, name)| *name)
            .unwrap_or("Unknown")
    }
}

/// Known tags and their conventional names.
const KNOWN_TAGS: &[(TiffTag, &str)] = &[
    (TiffTag::NewSubfileType, "NewSubfileType"),
    (TiffTag::SubfileType, "SubfileType"),
    (TiffTag::ImageWidth, "ImageWidth"),
    (TiffTag::ImageLength, "ImageLength"),
    (TiffTag::BitsPerSample, "BitsPerSample"),
    (TiffTag::Compression, "Compression"),
    (TiffTag::PhotometricInterpretation, "PhotometricInterpretation"),
    (TiffTag::Threshholding, "Threshholding"),
    (TiffTag::CellWidth, "CellWidth"),
    (TiffTag::CellLength, "CellLength"),
    (TiffTag::FillOrder, "FillOrder"),
    (TiffTag::DocumentName, "DocumentName"),
    (TiffTag::ImageDescription, "ImageDescription"),
    (TiffTag::Make, "Make"),
    (TiffTag::Model, "Model"),
    (TiffTag::StripOffsets, "StripOffsets"),
    (TiffTag::Orientation, "Orientation"),
    (TiffTag::SamplesPerPixel, "SamplesPerPixel"),
    (TiffTag::RowsPerStrip, "RowsPerStrip"),
    (TiffTag::StripByteCounts, "StripByteCounts"),
    (TiffTag::MinSampleValue, "MinSampleValue"),
    (TiffTag::MaxSampleValue, "MaxSampleValue"),
    (TiffTag::XResolution, "XResolution"),
    (TiffTag::YResolution, "YResolution"),
    (TiffTag::PlanarConfiguration, "PlanarConfiguration"),
    (TiffTag::PageName, "PageName"),
    (TiffTag::XPosition, "XPosition"),
    (TiffTag::YPosition, "YPosition"),
    (TiffTag::GrayResponseUnit, "GrayResponseUnit"),
    (TiffTag::GrayResponseCurve, "GrayResponseCurve"),
    (TiffTag::ResolutionUnit, "ResolutionUnit"),
    (TiffTag::PageNumber, "PageNumber"),
    (TiffTag::TransferFunction, "TransferFunction"),
    (TiffTag::Software, "Software"),
    (TiffTag::DateTime, "DateTime"),
    (TiffTag::Artist, "Artist"),
    (TiffTag::HostComputer, "HostComputer"),
    (TiffTag::Predictor, "Predictor"),
    (TiffTag::WhitePoint, "WhitePoint"),
    (TiffTag::PrimaryChromaticities, "PrimaryChromaticities"),
    (TiffTag::ColorMap, "ColorMap"),
    (TiffTag::HalftoneHints, "HalftoneHints"),
    (TiffTag::TileWidth, "TileWidth"),
    (TiffTag::TileLength, "TileLength"),
    (TiffTag::TileOffsets, "TileOffsets"),
    (TiffTag::TileByteCounts, "TileByteCounts"),
    (TiffTag::SubIfds, "SubIFDs"),
    (TiffTag::InkSet, "InkSet"),
    (TiffTag::InkNames, "InkNames"),
    (TiffTag::NumberOfInks, "NumberOfInks"),
    (TiffTag::ExtraSamples, "ExtraSamples"),
    (TiffTag::SampleFormat, "SampleFormat"),
    (TiffTag::SMinSampleValue, "SMinSampleValue"),
    (TiffTag::SMaxSampleValue, "SMaxSampleValue"),
    (TiffTag::JpegTables, "JPEGTables"),
    (TiffTag::YCbCrCoefficients, "YCbCrCoefficients"),
    (TiffTag::YCbCrSubSampling, "YCbCrSubSampling"),
    (TiffTag::YCbCrPositioning, "YCbCrPositioning"),
    (TiffTag::ReferenceBlackWhite, "ReferenceBlackWhite"),
    (TiffTag::Xmp, "XMP"),
    (TiffTag::ImageId, "ImageID"),
    (TiffTag::Copyright, "Copyright"),
    (TiffTag::ExposureTime, "ExposureTime"),
    (TiffTag::FNumber, "FNumber"),
    (TiffTag::IptcNaa, "IPTCNAA"),
    (TiffTag::Photoshop, "Photoshop"),
    (TiffTag::ExifIfd, "ExifTag"),
    (TiffTag::IccProfile, "InterColorProfile"),
    (TiffTag::GpsIfd, "GPSTag"),
    (TiffTag::ImageJMetaDataByteCounts, "IJMetadataByteCounts"),
    (TiffTag::ImageJMetaData, "IJMetadata"),
];

/// Name a tag ID: the conventional name for known tags, the decimal ID
/// otherwise.
pub fn tag_name(tag_id: u16) -> Cow<'static, str> {
    match TiffTag::from_u16(tag_id) {
        Some(tag) => Cow::Borrowed(tag.name()),
        None => Cow::Owned(tag_id.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================

use thiserror::Error;

/// I/O errors that can occur when reading container bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// Any other failure from the underlying file system
    #[error("Read error: {0}")]
    Read(String),
}

impl IoError {
    /// Map a `std::io::Error` for the resource at `path`.
    pub fn from_std(err: std::io::Error, path: &str) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            IoError::NotFound(path.to_string())
        } else {
            IoError::Read(format!("{}: {}", path, err))
        }
    }
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Tag value is larger than the file or otherwise unreadable
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: String, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors that can occur when reading Carl Zeiss CZI files
#[derive(Debug, Clone, Error)]
pub enum CziError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// File does not start with a ZISRAWFILE segment
    #[error("Invalid CZI segment id: expected {expected}, got {actual:?}")]
    InvalidSegmentId {
        expected: &'static str,
        actual: String,
    },

    /// File is too small to contain a CZI file header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Metadata segment declares sizes that do not fit in the file
    #[error("Invalid metadata segment at offset {offset}: {message}")]
    InvalidMetadataSegment { offset: u64, message: String },
}

/// Errors from turning an XML blob into a metadata tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// Input was empty or whitespace only
    #[error("XML input is empty")]
    Empty,

    /// Input does not look like XML
    #[error("Input does not start with '<'")]
    NotXml,

    /// Well-formedness error reported by the XML reader
    #[error("Malformed XML: {0}")]
    Malformed(String),
}

/// Errors from building the extractor registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Extension must start with a dot (e.g. ".tif")
    #[error("Extension must start with '.': {0:?}")]
    InvalidExtension(String),

    /// Mapping refers to an extractor name that is not registered
    #[error("Unknown extractor {name:?} (available: {available})")]
    UnknownExtractor { name: String, available: String },

    /// `EXT=NAME` mapping could not be parsed
    #[error("Invalid extension mapping {0:?}: expected EXT=EXTRACTOR")]
    InvalidMapping(String),
}

/// Stage of the per-file pipeline, used to tag failures in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    RawDump,
    Normalize,
    ProcessedDump,
    KeyPaths,
    Report,
}

impl Stage {
    /// Human-readable stage name.
    pub const fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::RawDump => "raw dump",
            Stage::Normalize => "normalize",
            Stage::ProcessedDump => "processed dump",
            Stage::KeyPaths => "key paths",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that abort the pipeline for a single file
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No extractor is registered for the file's extension
    #[error("No extractor found for file type: {0}")]
    NoExtractor(String),

    /// Writing an artifact failed
    #[error("{stage} stage failed writing {path}: {source}")]
    Write {
        stage: Stage,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding a tree as JSON failed
    #[error("{stage} stage failed to serialize metadata: {source}")]
    Serialize {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    /// Output directory could not be created
    #[error("Could not create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Input file has no usable file name
    #[error("Input path has no file stem: {0}")]
    NoStem(String),

    /// Input path given on the command line does not exist
    #[error("Input path does not exist: {0}")]
    InputNotFound(String),

    /// Input directory could not be listed
    #[error("Could not scan {path}: {source}")]
    Discover {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    /// Stage the error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkflowError::Write { stage, .. } | WorkflowError::Serialize { stage, .. } => {
                Some(*stage)
            }
            WorkflowError::NoExtractor(_) => Some(Stage::Extract),
            WorkflowError::OutputDir { .. }
            | WorkflowError::NoStem(_)
            | WorkflowError::InputNotFound(_)
            | WorkflowError::Discover { .. } => None,
        }
    }
}

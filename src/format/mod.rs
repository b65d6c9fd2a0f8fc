//! Binary container parsers for microscopy image files.
//!
//! - [`tiff`]: TIFF / BigTIFF (OME-TIFF, QPTIFF, ImageJ TIFF)
//! - [`czi`]: Carl Zeiss ZISRAW containers
//!
//! Use [`detect::detect_container`] to identify a container from its magic
//! bytes.

pub mod czi;
pub mod detect;
pub mod tiff;

pub use detect::{detect_container, detect_from_bytes, is_tiff_header, ContainerFormat};

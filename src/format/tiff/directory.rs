//! IFD chain walking.
//!
//! A TIFF file is a linked list of IFDs starting at the header's first IFD
//! offset. Each IFD is read in two requests: the entry count, then the
//! whole directory.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{Ifd, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};

/// Maximum number of IFDs followed before giving up on a chain.
pub const MAX_IFDS: usize = 1024;

/// Header plus every IFD in the main chain, in file order.
#[derive(Debug, Clone)]
pub struct TiffDirectory {
    pub header: TiffHeader,
    pub ifds: Vec<Ifd>,
}

impl TiffDirectory {
    /// Parse the header and follow the IFD chain.
    ///
    /// The chain stops at a zero offset, at an offset already visited, at an
    /// offset outside the file, or after [`MAX_IFDS`] directories. Only a
    /// broken header or an unreadable first IFD is an error.
    pub async fn read<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, TiffError> {
        let size = reader.size();
        if size < TIFF_HEADER_SIZE as u64 {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: size,
            });
        }

        let header_len = (BIGTIFF_HEADER_SIZE as u64).min(size) as usize;
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, size)?;

        let ifds = Self::read_chain(reader, &header).await?;
        debug!(
            "Read {} IFD(s) from {} (bigtiff: {})",
            ifds.len(),
            reader.identifier(),
            header.is_bigtiff
        );

        Ok(TiffDirectory { header, ifds })
    }

    async fn read_chain<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut visited = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 {
            if ifds.len() >= MAX_IFDS {
                warn!(
                    "Stopping after {} IFDs in {}",
                    MAX_IFDS,
                    reader.identifier()
                );
                break;
            }
            if !visited.insert(offset) {
                warn!(
                    "IFD chain loops back to offset {} in {}",
                    offset,
                    reader.identifier()
                );
                break;
            }

            match Self::read_ifd(reader, header, offset).await {
                Ok(ifd) => {
                    offset = ifd.next_ifd_offset;
                    ifds.push(ifd);
                }
                Err(e) if ifds.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        "Ignoring unreadable IFD at offset {} in {}: {}",
                        offset,
                        reader.identifier(),
                        e
                    );
                    break;
                }
            }
        }

        Ok(ifds)
    }

    /// Read the IFD at `offset`.
    pub async fn read_ifd<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
        offset: u64,
    ) -> Result<Ifd, TiffError> {
        if offset >= reader.size() {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        let count_bytes = reader.read_exact_at(offset, header.ifd_count_size()).await?;
        let entry_count = Ifd::entry_count(&count_bytes, header);

        let ifd_size =
            Ifd::calculate_size(entry_count, header).ok_or(TiffError::InvalidIfdOffset(offset))?;
        let ifd_bytes = reader.read_exact_at(offset, ifd_size).await?;
        Ifd::parse(&ifd_bytes, header)
    }
}

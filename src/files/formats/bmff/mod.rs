//! ISO Base Media File Format (BMFF) support
//!
//! This module provides common utilities for handling BMFF-based file formats:
//! - HEIF family: HEIC still images
//! - The `mpvd` box wrapping the video of a HEIC motion photo
//!
//! BMFF Structure:
//! - Files are composed of "boxes" (also called "atoms" in QuickTime)
//! - Each box has: 4-byte size, 4-byte type, optional extended size, data
//! - All multi-byte integers are big-endian

use crate::core::error::{MphotoError, MphotoResult};

#[cfg(feature = "heif")]
pub mod heif;

#[cfg(feature = "heif")]
pub use heif::{HeifDocument, HeifHandler};

// ============================================================================
// Constants
// ============================================================================

/// ftyp box type (file type box)
pub const FTYP_BOX: &[u8; 4] = b"ftyp";

/// meta box type
pub const META_BOX: &[u8; 4] = b"meta";

/// Motion photo video data box type
pub const MPVD_BOX: &[u8; 4] = b"mpvd";

/// Size of a compact box header (size + type)
pub const BOX_HEADER_SIZE: u64 = 8;

/// Size of the header written in front of the video of a HEIC motion photo
pub const MPVD_HEADER_SIZE: u64 = 16;

// ============================================================================
// Types
// ============================================================================

/// BMFF box information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BmffBox {
    /// Box size (including header)
    pub size: u64,
    /// Box type (4-byte FourCC)
    pub box_type: [u8; 4],
    /// Offset where box data starts (after header)
    pub data_offset: u64,
    /// Offset where box header starts
    pub header_offset: u64,
}

impl BmffBox {
    /// Get the size of the box header (8 or 16 bytes for extended size)
    pub fn header_size(&self) -> u64 {
        self.data_offset - self.header_offset
    }

    /// Get the size of the box data (excluding header)
    pub fn data_size(&self) -> u64 {
        self.size - self.header_size()
    }

    /// Offset just past the end of the box
    pub fn end_offset(&self) -> u64 {
        self.header_offset + self.size
    }
}

// ============================================================================
// Reading Functions
// ============================================================================

/// Read the header of the box starting at `offset` in `data`
///
/// A size of 0 means the box extends to the end of `data`; a size of 1 means
/// a 64-bit size follows the type. The box must fit inside `data`.
pub fn read_box(data: &[u8], offset: u64) -> MphotoResult<BmffBox> {
    let mut reader = ByteReader::new(data);
    reader.seek(offset)?;

    let size = reader.read_u32()? as u64;
    let box_type = reader.read_fourcc()?;

    let (actual_size, data_offset) = match size {
        0 => (data.len() as u64 - offset, offset + BOX_HEADER_SIZE),
        1 => (reader.read_u64()?, offset + 16),
        _ => (size, offset + BOX_HEADER_SIZE),
    };

    let box_info = BmffBox {
        size: actual_size,
        box_type,
        data_offset,
        header_offset: offset,
    };

    if actual_size < box_info.header_size() {
        return Err(MphotoError::InvalidArgument(format!(
            "Box '{}' is smaller than its header",
            fourcc_str(&box_type)
        )));
    }
    let fits = offset
        .checked_add(actual_size)
        .is_some_and(|end| end <= data.len() as u64);
    if !fits {
        return Err(MphotoError::InvalidArgument(format!(
            "Box '{}' extends past the end of its container",
            fourcc_str(&box_type)
        )));
    }

    Ok(box_info)
}

/// Read all consecutive boxes in `data`
pub fn read_boxes(data: &[u8]) -> MphotoResult<Vec<BmffBox>> {
    let mut boxes = Vec::new();
    let mut offset = 0u64;
    while offset < data.len() as u64 {
        let box_info = read_box(data, offset)?;
        offset = box_info.end_offset();
        boxes.push(box_info);
    }
    Ok(boxes)
}

/// Get the data of a box (excluding header)
pub fn box_data<'a>(data: &'a [u8], box_info: &BmffBox) -> &'a [u8] {
    &data[box_info.data_offset as usize..box_info.end_offset() as usize]
}

/// Build the header of the `mpvd` box that wraps `video_len` bytes of video
pub fn mpvd_box_header(video_len: u64) -> [u8; 16] {
    let mut header = [0u8; 16];
    // Size 1: the 64-bit size follows the box type
    header[..4].copy_from_slice(&1u32.to_be_bytes());
    header[4..8].copy_from_slice(MPVD_BOX);
    header[8..].copy_from_slice(&(MPVD_HEADER_SIZE + video_len).to_be_bytes());
    header
}

/// Render a FourCC for messages
pub fn fourcc_str(fourcc: &[u8; 4]) -> String {
    String::from_utf8_lossy(fourcc).into_owned()
}

// ============================================================================
// Byte reader
// ============================================================================

/// Bounds-checked big-endian reader over box data
///
/// Every read past the end fails with `InvalidArgument`, so malformed boxes
/// surface as errors rather than panics.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek(&mut self, pos: u64) -> MphotoResult<()> {
        if pos > self.data.len() as u64 {
            return Err(Self::truncated());
        }
        self.pos = pos as usize;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> MphotoResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_bytes(&mut self, count: usize) -> MphotoResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(Self::truncated());
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> MphotoResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> MphotoResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> MphotoResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> MphotoResult<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_fourcc(&mut self) -> MphotoResult<[u8; 4]> {
        let b = self.read_bytes(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    /// Read an integer stored on 0, 4 or 8 bytes (as in `iloc`)
    pub fn read_sized_uint(&mut self, size: u8) -> MphotoResult<u64> {
        match size {
            0 => Ok(0),
            4 => self.read_u32().map(u64::from),
            8 => self.read_u64(),
            _ => Err(MphotoError::InvalidArgument(format!(
                "Invalid field size: {}",
                size
            ))),
        }
    }

    /// Read a full box header, returning `(version, flags)`
    pub fn read_full_box_header(&mut self) -> MphotoResult<(u8, u32)> {
        let word = self.read_u32()?;
        Ok(((word >> 24) as u8, word & 0x00FF_FFFF))
    }

    /// Read a NUL-terminated UTF-8 string. A missing terminator ends the
    /// string at the end of the data.
    pub fn read_cstring(&mut self) -> MphotoResult<String> {
        let rest = &self.data[self.pos..];
        let (text, consumed) = match rest.iter().position(|&b| b == 0) {
            Some(nul) => (&rest[..nul], nul + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    fn truncated() -> MphotoError {
        MphotoError::InvalidArgument("Truncated box data".to_string())
    }
}

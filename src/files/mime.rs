//! Stream type detection
//!
//! Streams are classified from their first bytes only:
//! - JPEG: SOI marker (`FF D8`) at offset 0
//! - HEIC / MP4: an ISO BMFF `ftyp` box whose major brand is one of a fixed
//!   set, within the first 16 bytes

use crate::types::MimeType;

/// Number of leading bytes inspected for an `ftyp` signature
const HEADER_SIZE: usize = 16;

/// Brands identifying HEIF-family still images
const HEIC_BRANDS: &[&[u8; 4]] = &[b"mif1", b"msf1", b"heic", b"heix", b"hevc", b"hevx"];

/// Brands identifying MP4-family video
const MP4_BRANDS: &[&[u8; 4]] = &[
    b"avc1", b"iso2", b"isom", b"mmp4", b"mp41", b"mp42", b"mp71", b"msnv", b"ndas", b"ndsc",
    b"ndsh", b"ndsm", b"ndsp", b"ndss", b"ndxc", b"ndxh", b"ndxm", b"ndxp", b"ndxs",
];

/// Classify a stream from its leading bytes
pub fn classify(bytes: &[u8]) -> MimeType {
    if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xD8 {
        return MimeType::ImageJpeg;
    }

    if bytes.len() < HEADER_SIZE {
        return MimeType::Unknown;
    }
    let header = &bytes[..HEADER_SIZE];

    if has_ftyp_brand(header, HEIC_BRANDS) {
        return MimeType::ImageHeic;
    }
    if has_ftyp_brand(header, MP4_BRANDS) {
        return MimeType::VideoMp4;
    }

    MimeType::Unknown
}

/// Check whether `ftyp` immediately followed by one of `brands` occurs in
/// the header
fn has_ftyp_brand(header: &[u8], brands: &[&[u8; 4]]) -> bool {
    header.windows(8).any(|window| {
        &window[..4] == b"ftyp" && brands.iter().any(|brand| &window[4..] == brand.as_slice())
    })
}

//! File format handlers
//!
//! Each format handler implements format-specific logic for extracting and
//! embedding XMP metadata in a still image. The `bmff` module also carries
//! the box helpers shared by HEIC motion photos.

pub mod bmff;
#[cfg(feature = "jpeg")]
pub mod jpeg;

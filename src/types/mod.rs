//! Motion photo value types
//!
//! This module defines the plain values exchanged with callers.

pub mod image_info;
pub mod mime_type;

pub use image_info::ImageInfo;
pub use mime_type::MimeType;

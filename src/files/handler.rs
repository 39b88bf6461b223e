//! Handler trait for embedded XMP
//!
//! This module defines the trait that every still image format handler
//! implements, giving the motion photo logic a single interface for reading
//! and replacing the XMP document of a stream.

use crate::core::error::MphotoResult;
use crate::core::node::XmlDocument;
use crate::types::MimeType;
use std::io::{Read, Seek, Write};

/// Trait for still image format handlers
pub trait XmpHandler: Send + Sync {
    /// Read the XMP document embedded in a stream
    ///
    /// # Returns
    ///
    /// * `Ok(Some(XmlDocument))` if an XMP document is found and parses
    /// * `Ok(None)` if the stream carries no XMP
    /// * `Err(MphotoError)` if XMP is present but unusable, or the stream is
    ///   malformed
    fn read_xmp<R: Read + Seek>(&self, reader: &mut R) -> MphotoResult<Option<XmlDocument>>;

    /// Write a copy of the stream with its XMP replaced by `doc`
    ///
    /// # Arguments
    ///
    /// * `reader` - The source stream
    /// * `writer` - Receives the updated stream
    /// * `doc` - The XMP document to embed
    fn write_xmp<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        doc: &XmlDocument,
    ) -> MphotoResult<()>;

    /// Get the name of the format this handler supports (e.g., "JPEG")
    fn format_name(&self) -> &'static str;

    /// Get the mime type of the streams this handler supports
    fn mime_type(&self) -> MimeType;
}

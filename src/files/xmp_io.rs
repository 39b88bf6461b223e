//! XMP access for still images held in memory
//!
//! `XmpIoHelper` picks the format handler once per stream, from the sniffed
//! mime type, and adapts the stream-based `XmpHandler` interface to byte
//! buffers.

use crate::core::error::MphotoResult;
use crate::core::node::XmlDocument;
#[cfg(feature = "heif")]
use crate::files::formats::bmff::HeifHandler;
#[cfg(feature = "jpeg")]
use crate::files::formats::jpeg::JpegHandler;
use crate::files::handler::XmpHandler;
use crate::files::mime::classify;
use crate::types::MimeType;
use std::io::{Cursor, Read, Seek, Write};

/// XMP handler for one of the still image formats a motion photo may use
#[derive(Debug, Clone, Copy)]
pub enum XmpIoHelper {
    #[cfg(feature = "jpeg")]
    Jpeg(JpegHandler),
    #[cfg(feature = "heif")]
    Heic(HeifHandler),
}

impl XmpIoHelper {
    /// Select the handler for a mime type
    ///
    /// Returns `None` for video, unknown types, and formats whose feature is
    /// disabled.
    pub fn for_mime(mime: MimeType) -> Option<Self> {
        match mime {
            #[cfg(feature = "jpeg")]
            MimeType::ImageJpeg => Some(XmpIoHelper::Jpeg(JpegHandler)),
            #[cfg(feature = "heif")]
            MimeType::ImageHeic => Some(XmpIoHelper::Heic(HeifHandler)),
            _ => None,
        }
    }

    /// Select the handler for a stream from its leading bytes
    pub fn for_stream(bytes: &[u8]) -> Option<Self> {
        let helper = Self::for_mime(classify(bytes));
        tracing::debug!(helper = ?helper, "selected XMP helper");
        helper
    }

    /// Read the XMP document embedded in `bytes`
    pub fn get_xmp(&self, bytes: &[u8]) -> MphotoResult<Option<XmlDocument>> {
        self.read_xmp(&mut Cursor::new(bytes))
    }

    /// Return a copy of `bytes` whose XMP is replaced by `doc`
    pub fn set_xmp(&self, doc: &XmlDocument, bytes: &[u8]) -> MphotoResult<Vec<u8>> {
        let mut output = Vec::with_capacity(bytes.len());
        self.write_xmp(&mut Cursor::new(bytes), &mut output, doc)?;
        Ok(output)
    }

    /// Mime type of the streams this helper handles
    pub fn mime_type(&self) -> MimeType {
        <Self as XmpHandler>::mime_type(self)
    }
}

impl XmpHandler for XmpIoHelper {
    fn read_xmp<R: Read + Seek>(&self, reader: &mut R) -> MphotoResult<Option<XmlDocument>> {
        match *self {
            #[cfg(feature = "jpeg")]
            XmpIoHelper::Jpeg(ref h) => XmpHandler::read_xmp(h, reader),
            #[cfg(feature = "heif")]
            XmpIoHelper::Heic(ref h) => XmpHandler::read_xmp(h, reader),
        }
    }

    fn write_xmp<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        doc: &XmlDocument,
    ) -> MphotoResult<()> {
        match *self {
            #[cfg(feature = "jpeg")]
            XmpIoHelper::Jpeg(ref h) => XmpHandler::write_xmp(h, reader, writer, doc),
            #[cfg(feature = "heif")]
            XmpIoHelper::Heic(ref h) => XmpHandler::write_xmp(h, reader, writer, doc),
        }
    }

    fn format_name(&self) -> &'static str {
        match *self {
            #[cfg(feature = "jpeg")]
            XmpIoHelper::Jpeg(ref h) => h.format_name(),
            #[cfg(feature = "heif")]
            XmpIoHelper::Heic(ref h) => h.format_name(),
        }
    }

    fn mime_type(&self) -> MimeType {
        match *self {
            #[cfg(feature = "jpeg")]
            XmpIoHelper::Jpeg(ref h) => XmpHandler::mime_type(h),
            #[cfg(feature = "heif")]
            XmpIoHelper::Heic(ref h) => XmpHandler::mime_type(h),
        }
    }
}

#[cfg(all(test, feature = "jpeg", feature = "heif"))]
mod tests {
    use super::*;
    use crate::core::error::MphotoError;

    const XMP: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description xmlns:Camera="http://ns.google.com/photos/1.0/camera/" Camera:MotionPhoto="1"/></rdf:RDF></x:xmpmeta>"#;

    fn minimal_jpeg() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34, 0xFF, 0xD9]
    }

    #[test]
    fn test_for_mime() {
        assert_eq!(
            XmpIoHelper::for_mime(MimeType::ImageJpeg).map(|h| h.mime_type()),
            Some(MimeType::ImageJpeg)
        );
        assert_eq!(
            XmpIoHelper::for_mime(MimeType::ImageHeic).map(|h| h.format_name()),
            Some("HEIF")
        );
        assert!(XmpIoHelper::for_mime(MimeType::VideoMp4).is_none());
        assert!(XmpIoHelper::for_mime(MimeType::Unknown).is_none());
    }

    #[test]
    fn test_for_stream() {
        assert!(matches!(
            XmpIoHelper::for_stream(&minimal_jpeg()),
            Some(XmpIoHelper::Jpeg(_))
        ));
        assert!(XmpIoHelper::for_stream(b"not an image at all").is_none());
    }

    #[test]
    fn test_set_then_get_jpeg() {
        let helper = XmpIoHelper::Jpeg(JpegHandler);
        assert!(helper.get_xmp(&minimal_jpeg()).unwrap().is_none());

        let doc = XmlDocument::parse(XMP).unwrap();
        let updated = helper.set_xmp(&doc, &minimal_jpeg()).unwrap();
        assert_eq!(&updated[..2], &[0xFF, 0xD8]);
        assert!(updated.ends_with(&[0xFF, 0xD9]));

        let read = helper.get_xmp(&updated).unwrap().unwrap();
        assert_eq!(read, doc);
    }

    #[test]
    fn test_set_heic_unimplemented() {
        let doc = XmlDocument::parse(XMP).unwrap();
        let result = XmpIoHelper::Heic(HeifHandler).set_xmp(&doc, &[0u8; 32]);
        assert!(matches!(result, Err(MphotoError::Unimplemented(_))));
    }
}

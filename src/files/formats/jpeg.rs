//! JPEG file format handler
//!
//! This module provides functionality for reading and writing XMP metadata
//! in JPEG streams.
//!
//! JPEG XMP Storage:
//! - XMP Packet is stored in APP1 segment with identifier `<http://ns.adobe.com/xap/1.0/>\0`
//! - Extended XMP (if needed) uses GUID-based chunking in additional APP1 segments
//! - Standard APP1 segment size limit: 64KB (65535 bytes including header)
//!
//! Reading does not walk segments: the first `<x:xmpmeta` ... `</x:xmpmeta>`
//! island anywhere in the stream is taken as the XMP document. Motion photos
//! append a video after the JPEG, so segment parsing would stop too early
//! for some writers anyway.

use crate::core::error::{MphotoError, MphotoResult};
use crate::core::node::XmlDocument;
use crate::files::handler::XmpHandler;
use crate::types::MimeType;
use std::io::{self, Read, Seek, Write};

/// JPEG segment markers
const MARKER_TEM: u8 = 0x01;
const MARKER_RST0: u8 = 0xD0;
const MARKER_RST7: u8 = 0xD7;
const MARKER_SOI: u8 = 0xD8; // Start of Image
const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
const MARKER_SOS: u8 = 0xDA; // Start of Scan
const MARKER_EOI: u8 = 0xD9; // End of Image

/// XMP namespace identifier in APP1 segment
const XMP_NAMESPACE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Extended XMP namespace identifier
const EXTENDED_XMP_NAMESPACE: &[u8] = b"http://ns.adobe.com/xap/1.0/ext/\0";

/// Maximum size of a standard APP1 segment (64KB - 2 bytes for length)
const MAX_APP1_SIZE: usize = 65533;

/// Opening tag of the XMP root element
const XMP_START: &[u8] = b"<x:xmpmeta";

/// Closing tag of the XMP root element
const XMP_END: &[u8] = b"</x:xmpmeta>";

/// JPEG file handler for XMP metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegHandler;

impl XmpHandler for JpegHandler {
    fn read_xmp<R: Read + Seek>(&self, reader: &mut R) -> MphotoResult<Option<XmlDocument>> {
        Self::read_xmp(reader)
    }

    fn write_xmp<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        doc: &XmlDocument,
    ) -> MphotoResult<()> {
        Self::write_xmp(reader, writer, doc)
    }

    fn format_name(&self) -> &'static str {
        "JPEG"
    }

    fn mime_type(&self) -> MimeType {
        MimeType::ImageJpeg
    }
}

impl JpegHandler {
    /// Read the XMP document from a JPEG stream
    ///
    /// # Returns
    ///
    /// * `Ok(Some(XmlDocument))` if an XMP island is found and parses
    /// * `Ok(None)` if either tag is missing, or the closing tag comes first
    /// * `Err(MphotoError::ParseError)` if the island is not well-formed XML
    pub fn read_xmp<R: Read + Seek>(mut reader: R) -> MphotoResult<Option<XmlDocument>> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let Some(xmp) = Self::find_xmp_island(&data) else {
            return Ok(None);
        };

        XmlDocument::parse_bytes(xmp).map(Some)
    }

    /// Write a copy of a JPEG stream with its XMP replaced
    ///
    /// SOI and any leading APP0 segments are copied first, followed by a new
    /// XMP APP1 segment. Old XMP and Extended XMP segments are dropped; every
    /// other segment, the scan data and anything after it are copied as-is.
    pub fn write_xmp<R: Read + Seek, W: Write>(
        mut reader: R,
        mut writer: W,
        doc: &XmlDocument,
    ) -> MphotoResult<()> {
        let xmp_packet = doc.serialize_packet()?;
        let xmp_bytes = xmp_packet.as_bytes();

        // Check if we need Extended XMP
        if XMP_NAMESPACE.len() + xmp_bytes.len() > MAX_APP1_SIZE {
            return Err(MphotoError::Unimplemented(
                "Extended XMP writing is not supported".to_string(),
            ));
        }

        let mut header = [0u8; 2];
        reader.read_exact(&mut header).map_err(truncated)?;
        if header[0] != 0xFF || header[1] != MARKER_SOI {
            return Err(MphotoError::InvalidArgument(
                "Not a valid JPEG stream".to_string(),
            ));
        }
        writer.write_all(&header)?;

        // Copy any leading APP0 marker segments
        let mut marker = Self::find_marker(&mut reader)?;
        while marker == Some(MARKER_APP0) {
            Self::copy_segment(&mut reader, &mut writer, MARKER_APP0)?;
            marker = Self::find_marker(&mut reader)?;
        }

        Self::write_app1_xmp_segment(&mut writer, xmp_bytes)?;

        // Copy remaining segments, skipping old XMP segments, until SOS or EOI
        while let Some(current) = marker {
            match current {
                MARKER_SOS | MARKER_EOI => {
                    writer.write_all(&[0xFF, current])?;
                    io::copy(&mut reader, &mut writer)?;
                    break;
                }
                MARKER_TEM | MARKER_RST0..=MARKER_RST7 => {
                    writer.write_all(&[0xFF, current])?;
                }
                MARKER_APP1 => {
                    let segment = Self::read_segment(&mut reader)?;
                    if !Self::is_xmp_segment(&segment) && !Self::is_extended_xmp_segment(&segment)
                    {
                        Self::write_segment(&mut writer, current, &segment)?;
                    }
                }
                _ => Self::copy_segment(&mut reader, &mut writer, current)?,
            }
            marker = Self::find_marker(&mut reader)?;
        }

        Ok(())
    }

    /// Locate the first `<x:xmpmeta` ... `</x:xmpmeta>` island, closing tag
    /// included
    fn find_xmp_island(data: &[u8]) -> Option<&[u8]> {
        let start = find_subslice(data, XMP_START)?;
        let end = find_subslice(data, XMP_END)? + XMP_END.len();
        if end <= start {
            return None;
        }
        Some(&data[start..end])
    }

    /// Find the next JPEG marker, skipping fill bytes and stray data.
    /// Returns `None` at the end of the stream.
    fn find_marker<R: Read>(reader: &mut R) -> MphotoResult<Option<u8>> {
        loop {
            let Some(byte) = read_byte(reader)? else {
                return Ok(None);
            };
            if byte != 0xFF {
                continue;
            }

            let mut next = 0xFF;
            while next == 0xFF {
                match read_byte(reader)? {
                    Some(b) => next = b,
                    None => return Ok(None),
                }
            }
            if next != 0x00 {
                return Ok(Some(next));
            }
        }
    }

    /// Read segment length (2 bytes, big-endian)
    fn read_segment_length<R: Read>(reader: &mut R) -> MphotoResult<u16> {
        let mut length_bytes = [0u8; 2];
        reader.read_exact(&mut length_bytes).map_err(truncated)?;
        let length = u16::from_be_bytes(length_bytes);
        if length < 2 {
            return Err(MphotoError::InvalidArgument(format!(
                "Invalid JPEG segment length: {}",
                length
            )));
        }
        Ok(length)
    }

    /// Read a segment's content (after its length field)
    fn read_segment<R: Read>(reader: &mut R) -> MphotoResult<Vec<u8>> {
        let length = Self::read_segment_length(reader)?;
        let mut data = vec![0u8; length as usize - 2];
        reader.read_exact(&mut data).map_err(truncated)?;
        Ok(data)
    }

    /// Copy a whole segment unchanged
    fn copy_segment<R: Read, W: Write>(reader: &mut R, writer: &mut W, marker: u8) -> MphotoResult<()> {
        let segment = Self::read_segment(reader)?;
        Self::write_segment(writer, marker, &segment)
    }

    fn write_segment<W: Write>(writer: &mut W, marker: u8, content: &[u8]) -> MphotoResult<()> {
        let length = (content.len() + 2) as u16;
        writer.write_all(&[0xFF, marker])?;
        writer.write_all(&length.to_be_bytes())?;
        writer.write_all(content)?;
        Ok(())
    }

    /// Check if a segment is an XMP segment
    fn is_xmp_segment(segment_data: &[u8]) -> bool {
        segment_data.starts_with(XMP_NAMESPACE)
    }

    /// Check if a segment is an Extended XMP segment
    fn is_extended_xmp_segment(segment_data: &[u8]) -> bool {
        segment_data.starts_with(EXTENDED_XMP_NAMESPACE)
    }

    /// Write APP1 XMP segment
    fn write_app1_xmp_segment<W: Write>(writer: &mut W, xmp_data: &[u8]) -> MphotoResult<()> {
        // Write marker
        writer.write_all(&[0xFF, MARKER_APP1])?;

        // Calculate segment length (namespace + data + 2 bytes for length)
        let segment_length = (XMP_NAMESPACE.len() + xmp_data.len() + 2) as u16;
        writer.write_all(&segment_length.to_be_bytes())?;

        // Write namespace identifier
        writer.write_all(XMP_NAMESPACE)?;

        // Write XMP data
        writer.write_all(xmp_data)?;

        Ok(())
    }
}

/// Read one byte, `None` at the end of the stream
fn read_byte<R: Read>(reader: &mut R) -> MphotoResult<Option<u8>> {
    let mut buffer = [0u8; 1];
    match reader.read_exact(&mut buffer) {
        Ok(()) => Ok(Some(buffer[0])),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Map an early end of stream to a malformed-input error
fn truncated(e: io::Error) -> MphotoError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        MphotoError::InvalidArgument("Truncated JPEG segment".to_string())
    } else {
        e.into()
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const XMP: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="" xmlns:Camera="http://ns.google.com/photos/1.0/camera/" Camera:MotionPhoto="1"/></rdf:RDF></x:xmpmeta>"#;

    fn segment(marker: u8, content: &[u8]) -> Vec<u8> {
        let mut data = vec![0xFF, marker];
        data.extend_from_slice(&((content.len() + 2) as u16).to_be_bytes());
        data.extend_from_slice(content);
        data
    }

    fn xmp_segment(xmp: &str) -> Vec<u8> {
        let mut content = XMP_NAMESPACE.to_vec();
        content.extend_from_slice(xmp.as_bytes());
        segment(MARKER_APP1, &content)
    }

    // SOI, APP0, Exif APP1, XMP APP1, DQT, SOS + scan data, EOI
    fn create_jpeg(xmp: Option<&str>) -> Vec<u8> {
        let mut data = vec![0xFF, MARKER_SOI];
        data.extend(segment(MARKER_APP0, b"JFIF\0\x01\x01"));
        data.extend(segment(MARKER_APP1, b"Exif\0\0MM"));
        if let Some(xmp) = xmp {
            data.extend(xmp_segment(xmp));
        }
        data.extend(segment(0xDB, &[0u8; 5]));
        data.extend(segment(MARKER_SOS, &[1, 2, 3]));
        data.extend_from_slice(&[0x12, 0xFF, 0x00, 0x34]);
        data.extend_from_slice(&[0xFF, MARKER_EOI]);
        data
    }

    #[test]
    fn test_read_xmp_no_xmp() {
        let result = JpegHandler::read_xmp(Cursor::new(create_jpeg(None))).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_xmp() {
        let doc = JpegHandler::read_xmp(Cursor::new(create_jpeg(Some(XMP))))
            .unwrap()
            .unwrap();
        assert_eq!(doc.root().name.local, "xmpmeta");
    }

    #[test]
    fn test_read_xmp_outside_segments() {
        // An island after EOI is still found
        let mut data = create_jpeg(None);
        data.extend_from_slice(XMP.as_bytes());
        assert!(JpegHandler::read_xmp(Cursor::new(data)).unwrap().is_some());
    }

    #[test]
    fn test_read_xmp_end_before_start() {
        let data = b"\xFF\xD8</x:xmpmeta><x:xmpmeta>".to_vec();
        assert!(JpegHandler::read_xmp(Cursor::new(data)).unwrap().is_none());
    }

    #[test]
    fn test_read_xmp_parse_error() {
        let data = b"\xFF\xD8<x:xmpmeta><a></x:xmpmeta>".to_vec();
        assert!(matches!(
            JpegHandler::read_xmp(Cursor::new(data)),
            Err(MphotoError::ParseError(_))
        ));
    }

    #[test]
    fn test_write_xmp_replaces_segment() {
        let old = XMP.replace("Camera:MotionPhoto=\"1\"", "Camera:MotionPhoto=\"0\"");
        let source = create_jpeg(Some(&old));
        let doc = XmlDocument::parse(XMP).unwrap();

        let mut out = Vec::new();
        JpegHandler::write_xmp(Cursor::new(source.clone()), &mut out, &doc).unwrap();

        // SOI + APP0 first, then the new XMP segment
        let app0 = segment(MARKER_APP0, b"JFIF\0\x01\x01");
        assert_eq!(&out[..2], &[0xFF, MARKER_SOI]);
        assert_eq!(&out[2..2 + app0.len()], app0.as_slice());
        assert_eq!(out[2 + app0.len() + 1], MARKER_APP1);

        // Exactly one XMP island, the new one
        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.matches("<x:xmpmeta").count(), 1);
        assert!(text.contains("Camera:MotionPhoto=\"1\""));

        // Everything from Exif on is preserved, minus the old XMP segment
        let exif = segment(MARKER_APP1, b"Exif\0\0MM");
        let source_tail = &source[2 + app0.len() + exif.len() + xmp_segment(&old).len()..];
        assert!(out.ends_with(source_tail));
        assert!(find_subslice(&out, &exif).is_some());

        let reread = JpegHandler::read_xmp(Cursor::new(out)).unwrap().unwrap();
        assert_eq!(reread, doc);
    }

    #[test]
    fn test_write_xmp_minimal_jpeg() {
        let doc = XmlDocument::parse(XMP).unwrap();
        let mut out = Vec::new();
        JpegHandler::write_xmp(Cursor::new(vec![0xFF, MARKER_SOI, 0xFF, MARKER_EOI]), &mut out, &doc)
            .unwrap();
        assert!(out.ends_with(&[0xFF, MARKER_EOI]));
        assert!(JpegHandler::read_xmp(Cursor::new(out)).unwrap().is_some());
    }

    #[test]
    fn test_write_xmp_truncated() {
        let doc = XmlDocument::parse(XMP).unwrap();
        let source = create_jpeg(None);
        // Cut inside the DQT segment
        let cut = source.len() - 20;
        let result = JpegHandler::write_xmp(Cursor::new(source[..cut].to_vec()), Vec::new(), &doc);
        assert!(matches!(result, Err(MphotoError::InvalidArgument(_))));

        let result = JpegHandler::write_xmp(Cursor::new(vec![0x00, 0x01]), Vec::new(), &doc);
        assert!(matches!(result, Err(MphotoError::InvalidArgument(_))));
    }

    #[test]
    fn test_write_xmp_too_large() {
        let big = format!(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><!--{}--></x:xmpmeta>"#,
            "a".repeat(MAX_APP1_SIZE)
        );
        let doc = XmlDocument::parse(&big).unwrap();
        let result = JpegHandler::write_xmp(Cursor::new(create_jpeg(None)), Vec::new(), &doc);
        assert!(matches!(result, Err(MphotoError::Unimplemented(_))));
    }

    #[test]
    fn test_is_xmp_segment() {
        let mut segment = XMP_NAMESPACE.to_vec();
        segment.extend_from_slice(b"<x:xmpmeta/>");
        assert!(JpegHandler::is_xmp_segment(&segment));
        assert!(!JpegHandler::is_xmp_segment(b"JFIF\0"));

        let extended = EXTENDED_XMP_NAMESPACE.to_vec();
        assert!(JpegHandler::is_extended_xmp_segment(&extended));
        assert!(!JpegHandler::is_xmp_segment(&extended));
    }
}

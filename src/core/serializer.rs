//! XML serializer
//!
//! This module writes an [`XmlDocument`] back to text. Element and attribute
//! names are written with the prefixes they carry, and text nodes are
//! written exactly as they were read, so an untouched document serializes to
//! equivalent XML.

use crate::core::error::{MphotoError, MphotoResult};
use crate::core::node::{Element, XmlDocument, XmlNode};
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// XMP Packet header, with the byte order mark in `begin`
const PACKET_HEADER: &str = "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>";

/// XMP Packet trailer (writable packet)
const PACKET_TRAILER: &str = "<?xpacket end=\"w\"?>";

/// Serializer for XML documents
#[derive(Debug, Default)]
pub struct XmlSerializer;

impl XmlSerializer {
    /// Create a new XML serializer
    pub fn new() -> Self {
        Self
    }

    /// Serialize a document to XML text
    pub fn serialize(&self, doc: &XmlDocument) -> MphotoResult<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_element(&mut writer, doc.root())?;

        let result = writer.into_inner().into_inner();
        String::from_utf8(result)
            .map_err(|e| MphotoError::InternalError(format!("UTF-8 encoding error: {}", e)))
    }

    /// Serialize to XMP Packet format
    pub fn serialize_packet(&self, doc: &XmlDocument) -> MphotoResult<String> {
        let content = self.serialize(doc)?;
        Ok(format!("{}\n{}\n{}", PACKET_HEADER, content, PACKET_TRAILER))
    }

    fn write_element(
        &self,
        writer: &mut Writer<Cursor<Vec<u8>>>,
        element: &Element,
    ) -> MphotoResult<()> {
        let name = element.name.to_string();
        let mut start = BytesStart::new(name.as_str());
        for attr in &element.attributes {
            let key = attr.name.to_string();
            start.push_attribute((key.as_str(), attr.value.as_str()));
        }

        if element.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &element.children {
            match child {
                XmlNode::Element(nested) => self.write_element(writer, nested)?,
                XmlNode::Text(raw) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?
                }
                XmlNode::CData(data) => {
                    writer.write_event(Event::CData(BytesCData::new(data.as_str())))?
                }
                XmlNode::Comment(text) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }
}

//! XML parser
//!
//! This module builds an [`XmlDocument`] from XML text. Element and
//! attribute prefixes are resolved against the `xmlns` declarations in scope
//! at the point they appear, so later queries can match by namespace URI.

use crate::core::error::{MphotoError, MphotoResult};
use crate::core::namespace::ns;
use crate::core::node::{Attribute, Element, QName, XmlDocument, XmlNode};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Deepest element nesting accepted, counting the root as 1
pub const MAX_DEPTH: usize = 256;

/// Parser for XML documents
#[derive(Debug, Default)]
pub struct XmlParser {
    /// Namespace bindings per open element, innermost last
    scopes: Vec<Vec<(String, String)>>,
}

impl XmlParser {
    /// Create a new XML parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document
    ///
    /// Processing instructions (such as the `<?xpacket ...?>` wrapper),
    /// declarations and doctypes are skipped. Whitespace outside the root
    /// element is ignored; any other content there is an error.
    pub fn parse(&mut self, xml: &str) -> MphotoResult<XmlDocument> {
        self.scopes.clear();

        let xml = xml.trim_start_matches('\u{feff}').trim_end_matches('\0');
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    Self::check_depth(&stack)?;
                    let element = self.open_element(&e)?;
                    stack.push(element);
                }
                Ok(Event::Empty(e)) => {
                    Self::check_depth(&stack)?;
                    let element = self.open_element(&e)?;
                    self.scopes.pop();
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| {
                        MphotoError::ParseError("Unexpected closing tag".to_string())
                    })?;
                    self.scopes.pop();
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref()).to_string();
                    Self::push_text(&mut stack, &raw)?;
                }
                Ok(Event::GeneralRef(e)) => {
                    // Entity and character references arrive separately from
                    // the surrounding text; keep them escaped
                    let raw = format!("&{};", String::from_utf8_lossy(e.as_ref()));
                    Self::push_text(&mut stack, &raw)?;
                }
                Ok(Event::CData(e)) => {
                    let data = String::from_utf8_lossy(e.as_ref()).to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::CData(data));
                    }
                }
                Ok(Event::Comment(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Comment(text));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(MphotoError::ParseError(format!("XML parsing error: {}", e)));
                }
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(MphotoError::ParseError(format!(
                "Unclosed element <{}>",
                stack[stack.len() - 1].name
            )));
        }

        root.map(XmlDocument::new)
            .ok_or_else(|| MphotoError::ParseError("Document has no root element".to_string()))
    }

    /// Fail before opening an element below `MAX_DEPTH`
    fn check_depth(stack: &[Element]) -> MphotoResult<()> {
        if stack.len() >= MAX_DEPTH {
            return Err(MphotoError::ParseError(format!(
                "Elements nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    /// Build an element from a start tag and open its namespace scope
    fn open_element(&mut self, e: &BytesStart<'_>) -> MphotoResult<Element> {
        let raw_attrs = Self::collect_attributes(e)?;

        let declarations = raw_attrs
            .iter()
            .filter(|(name, _)| name.is_namespace_declaration())
            .map(|(name, value)| {
                let prefix = match &name.prefix {
                    Some(_) => name.local.clone(),
                    None => String::new(),
                };
                (prefix, value.clone())
            })
            .collect();
        self.scopes.push(declarations);

        let name = QName::parse(&String::from_utf8_lossy(e.name().as_ref()));
        let namespace = self.resolve(name.prefix.as_deref().unwrap_or(""));
        let mut element = Element::new(name, namespace.as_deref());

        for (attr_name, value) in raw_attrs {
            let namespace = match (&attr_name.prefix, attr_name.is_namespace_declaration()) {
                (Some(prefix), false) => self.resolve(prefix),
                _ => None,
            };
            element.attributes.push(Attribute {
                name: attr_name,
                namespace,
                value,
            });
        }

        Ok(element)
    }

    /// Resolve a prefix against the open scopes. An empty prefix is the
    /// default namespace. Undeclared prefixes resolve to no namespace.
    fn resolve(&self, prefix: &str) -> Option<String> {
        if prefix == ns::XML_PREFIX {
            return Some(ns::XML.to_string());
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    /// Collect attributes with unescaped values
    fn collect_attributes(e: &BytesStart<'_>) -> MphotoResult<Vec<(QName, String)>> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr
                .map_err(|e| MphotoError::ParseError(format!("Malformed attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let raw_value = String::from_utf8_lossy(attr.value.as_ref());
            let value = unescape(&raw_value)
                .map_err(|e| {
                    MphotoError::ParseError(format!("Bad escape in attribute '{}': {}", key, e))
                })?
                .to_string();
            attrs.push((QName::parse(&key), value));
        }
        Ok(attrs)
    }

    /// Add a finished element to its parent, or make it the root
    fn attach(
        stack: &mut [Element],
        root: &mut Option<Element>,
        element: Element,
    ) -> MphotoResult<()> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(XmlNode::Element(element));
            return Ok(());
        }
        if root.is_some() {
            return Err(MphotoError::ParseError(
                "Document has more than one root element".to_string(),
            ));
        }
        *root = Some(element);
        Ok(())
    }

    /// Append raw text to the innermost open element, merging with a
    /// preceding text node
    fn push_text(stack: &mut [Element], raw: &str) -> MphotoResult<()> {
        let Some(parent) = stack.last_mut() else {
            if raw.trim().is_empty() {
                return Ok(());
            }
            return Err(MphotoError::ParseError(
                "Text outside of the root element".to_string(),
            ));
        };
        match parent.children.last_mut() {
            Some(XmlNode::Text(existing)) => existing.push_str(raw),
            _ => parent.children.push(XmlNode::Text(raw.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOTION_PHOTO_XMP: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Adobe XMP Core 5.1.0-jc003">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:GCamera="http://ns.google.com/photos/1.0/camera/"
        xmlns:Container="http://ns.google.com/photos/1.0/container/"
        xmlns:Item="http://ns.google.com/photos/1.0/container/item/"
      GCamera:MotionPhoto="1"
      GCamera:MotionPhotoVersion="1">
      <Container:Directory>
        <rdf:Seq>
          <rdf:li rdf:parseType="Resource">
            <Container:Item Item:Mime="image/jpeg" Item:Semantic="Primary"/>
          </rdf:li>
        </rdf:Seq>
      </Container:Directory>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#;

    fn nested(depth: usize, leaf: &str) -> String {
        format!("{}{}{}", "<a>".repeat(depth - 1), leaf, "</a>".repeat(depth - 1))
    }

    #[test]
    fn test_parse_depth_limit() {
        let doc = XmlParser::new().parse(&nested(MAX_DEPTH, "<b/>")).unwrap();
        assert_eq!(doc.root().name.local, "a");

        let err = XmlParser::new().parse(&nested(MAX_DEPTH + 1, "<b/>")).unwrap_err();
        assert!(matches!(err, MphotoError::ParseError(_)));
        let err = XmlParser::new().parse(&nested(MAX_DEPTH + 1, "<b></b>")).unwrap_err();
        assert!(matches!(err, MphotoError::ParseError(_)));

        // Rejected long before the document is complete
        let err = XmlParser::new().parse(&"<a>".repeat(100_000)).unwrap_err();
        assert!(matches!(err, MphotoError::ParseError(_)));
    }

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = XmlParser::new().parse(MOTION_PHOTO_XMP).unwrap();
        let root = doc.root();
        assert!(root.matches(ns::X, "xmpmeta"));

        let desc = doc.element_at(&[1, 1]).unwrap();
        assert!(desc.matches(ns::RDF, "Description"));
        // GCamera prefix resolves to the camera namespace
        let flag = desc.attribute(ns::CAMERA, "MotionPhoto").unwrap();
        assert_eq!(flag.value, "1");
        assert_eq!(flag.name.to_string(), "GCamera:MotionPhoto");
    }

    #[test]
    fn test_parse_packet_wrapper() {
        let xml = format!(
            "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n{}\n<?xpacket end=\"w\"?>",
            MOTION_PHOTO_XMP
        );
        let doc = XmlParser::new().parse(&xml).unwrap();
        assert!(doc.root().matches(ns::X, "xmpmeta"));
    }

    #[test]
    fn test_parse_unescapes_attributes_and_keeps_text() {
        let xml = r#"<a xmlns:p="urn:p" p:v="x &amp; y">1 &lt; 2</a>"#;
        let doc = XmlParser::new().parse(xml).unwrap();
        assert_eq!(doc.root().attribute("urn:p", "v").unwrap().value, "x & y");
        assert_eq!(doc.root().text_content(), "1 < 2");
    }

    #[test]
    fn test_undeclared_prefix_has_no_namespace() {
        let doc = XmlParser::new().parse(r#"<a Camera:MotionPhoto="1"/>"#).unwrap();
        let attr = &doc.root().attributes[0];
        assert_eq!(attr.namespace, None);
        assert!(doc.root().attribute(ns::CAMERA, "MotionPhoto").is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            XmlParser::new().parse("<a><b></a>"),
            Err(MphotoError::ParseError(_))
        ));
        assert!(matches!(
            XmlParser::new().parse("<a>"),
            Err(MphotoError::ParseError(_))
        ));
        assert!(matches!(
            XmlParser::new().parse(""),
            Err(MphotoError::ParseError(_))
        ));
        assert!(matches!(
            XmlParser::new().parse("<a/><b/>"),
            Err(MphotoError::ParseError(_))
        ));
    }
}

//! XML node types
//!
//! This module defines the element tree used for XMP documents:
//! - XmlDocument: a document with a single root element
//! - Element: a named element with attributes and child nodes
//! - XmlNode: a child of an element (element, text, CDATA or comment)
//!
//! Element and attribute names keep the prefix they were written with, and
//! additionally carry the namespace URI that prefix resolved to. Queries
//! match on the URI, so documents are free to use any prefix.

use crate::core::error::MphotoResult;
use crate::core::namespace::ns;
use quick_xml::escape::unescape;
use std::fmt;
use std::str::FromStr;

/// A possibly prefixed XML name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// The prefix, if any (`rdf` in `rdf:li`)
    pub prefix: Option<String>,
    /// The local part (`li` in `rdf:li`)
    pub local: String,
}

impl QName {
    /// Create a new name
    pub fn new(prefix: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: local.into(),
        }
    }

    /// Split a raw `prefix:local` name
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self::new(Some(prefix), local),
            None => Self::new(None, raw),
        }
    }

    /// Check if this name is a namespace declaration (`xmlns` or `xmlns:p`)
    pub fn is_namespace_declaration(&self) -> bool {
        match &self.prefix {
            Some(prefix) => prefix == "xmlns",
            None => self.local == "xmlns",
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An attribute of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name as written
    pub name: QName,
    /// The namespace URI the prefix resolved to (`None` for unprefixed names)
    pub namespace: Option<String>,
    /// The unescaped attribute value
    pub value: String,
}

impl Attribute {
    /// Create a new attribute
    pub fn new(name: QName, namespace: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            name,
            namespace: namespace.map(str::to_string),
            value: value.into(),
        }
    }

    /// Check if this attribute has the given namespace URI and local name
    pub fn matches(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.name.local == local
    }
}

/// A child node of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// A nested element
    Element(Element),
    /// Character data, stored escaped exactly as read
    Text(String),
    /// A CDATA section
    CData(String),
    /// A comment
    Comment(String),
}

impl XmlNode {
    /// Get the element, if this node is an element
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Get a mutable reference to the element, if this node is an element
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// An XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The element name as written
    pub name: QName,
    /// The namespace URI the name resolved to
    pub namespace: Option<String>,
    /// Attributes in document order, namespace declarations included
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl Element {
    /// Create a new element without attributes or children
    pub fn new(name: QName, namespace: Option<&str>) -> Self {
        Self {
            name,
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Check if this element has the given namespace URI and local name
    pub fn matches(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.name.local == local
    }

    /// Get an attribute by namespace URI and local name
    pub fn attribute(&self, namespace: &str, local: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.matches(namespace, local))
    }

    /// Set an attribute, replacing the value of an existing one with the
    /// same namespace and local name (its written prefix is kept)
    pub fn set_attribute(&mut self, name: QName, namespace: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.matches(namespace, &name.local))
        {
            Some(existing) => existing.value = value,
            None => self
                .attributes
                .push(Attribute::new(name, Some(namespace), value)),
        }
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attribute(&mut self, namespace: &str, local: &str) -> bool {
        let initial_len = self.attributes.len();
        self.attributes
            .retain(|attr| !attr.matches(namespace, local));
        self.attributes.len() < initial_len
    }

    /// Namespace declarations made on this element as `(prefix, uri)`.
    /// The default namespace is reported with an empty prefix.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|attr| {
            if !attr.name.is_namespace_declaration() {
                return None;
            }
            let prefix = match &attr.name.prefix {
                Some(_) => attr.name.local.as_str(),
                None => "",
            };
            Some((prefix, attr.value.as_str()))
        })
    }

    /// Declare a namespace prefix on this element
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        let declared = self
            .namespace_declarations()
            .any(|(p, u)| p == prefix && u == uri);
        if !declared {
            self.attributes.push(Attribute::new(
                QName::new(Some("xmlns"), prefix),
                None,
                uri,
            ));
        }
    }

    /// Iterate over child elements
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Find the first child element with the given namespace and local name,
    /// returning its index in `children`
    pub fn find_child(&self, namespace: &str, local: &str) -> Option<usize> {
        self.children.iter().position(|child| {
            child
                .as_element()
                .is_some_and(|element| element.matches(namespace, local))
        })
    }

    /// Append a child element, returning its index in `children`
    pub fn append_element(&mut self, element: Element) -> usize {
        self.children.push(XmlNode::Element(element));
        self.children.len() - 1
    }

    /// Concatenated, unescaped character data of this element and its
    /// descendants
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.collect_text(out),
                XmlNode::Text(raw) => match unescape(raw) {
                    Ok(unescaped) => out.push_str(&unescaped),
                    Err(_) => out.push_str(raw),
                },
                XmlNode::CData(data) => out.push_str(data),
                XmlNode::Comment(_) => {}
            }
        }
    }
}

/// Location of an element inside a document: the child indices to follow
/// from the root element
pub type ElementPath = Vec<usize>;

/// An XML document with a single root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    /// Create a document from its root element
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse a document from a string
    pub fn parse(xml: &str) -> MphotoResult<Self> {
        crate::core::parser::XmlParser::new().parse(xml)
    }

    /// Parse a document from bytes, which must be valid UTF-8
    pub fn parse_bytes(xml: &[u8]) -> MphotoResult<Self> {
        let xml = std::str::from_utf8(xml).map_err(|e| {
            crate::core::error::MphotoError::ParseError(format!("Invalid UTF-8 in XML: {}", e))
        })?;
        Self::parse(xml)
    }

    /// Serialize the document to a string
    pub fn serialize(&self) -> MphotoResult<String> {
        crate::core::serializer::XmlSerializer::new().serialize(self)
    }

    /// Serialize the document wrapped in an XMP Packet (`<?xpacket ...?>`)
    pub fn serialize_packet(&self) -> MphotoResult<String> {
        crate::core::serializer::XmlSerializer::new().serialize_packet(self)
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Get a mutable reference to the root element
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Get the element at a path
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut element = &self.root;
        for &index in path {
            element = element.children.get(index)?.as_element()?;
        }
        Some(element)
    }

    /// Get a mutable reference to the element at a path
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut element = &mut self.root;
        for &index in path {
            element = element.children.get_mut(index)?.as_element_mut()?;
        }
        Some(element)
    }

    /// Find a prefix bound to `uri` that is in scope at the element at `path`
    pub fn prefix_in_scope(&self, path: &[usize], uri: &str) -> Option<String> {
        if uri == ns::XML {
            return Some(ns::XML_PREFIX.to_string());
        }

        // Attributes never pick up the default namespace
        self.bindings_at(path)
            .into_iter()
            .rev()
            .find(|(prefix, bound)| !prefix.is_empty() && bound == uri)
            .map(|(prefix, _)| prefix)
    }

    /// Get the URI `prefix` is bound to at the element at `path`
    pub fn namespace_in_scope(&self, path: &[usize], prefix: &str) -> Option<String> {
        if prefix == ns::XML_PREFIX {
            return Some(ns::XML.to_string());
        }
        self.bindings_at(path)
            .into_iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri)
    }

    /// Namespace bindings visible at the element at `path`, one per prefix,
    /// most recently declared last
    fn bindings_at(&self, path: &[usize]) -> Vec<(String, String)> {
        let mut bindings: Vec<(String, String)> = Vec::new();
        let mut element = Some(&self.root);
        let mut remaining = path.iter();
        while let Some(current) = element {
            for (prefix, bound) in current.namespace_declarations() {
                bindings.retain(|(p, _)| p != prefix);
                bindings.push((prefix.to_string(), bound.to_string()));
            }
            element = remaining
                .next()
                .and_then(|&index| current.children.get(index))
                .and_then(XmlNode::as_element);
        }
        bindings
    }
}

impl FromStr for XmlDocument {
    type Err = crate::core::error::MphotoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

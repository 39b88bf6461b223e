//! Core module
//!
//! This module contains the XML capability the motion photo logic is built
//! on: an element tree, parsing, namespace-aware XPath queries and mutation,
//! and serialization.

pub mod error;
pub mod namespace;
pub mod node;
pub mod parser;
pub mod serializer;
pub mod xpath;

pub use error::{ErrorKind, MphotoError, MphotoResult};
pub use namespace::{ns, NamespaceMap, MOTION_PHOTO_NAMESPACES};
pub use node::{Attribute, Element, ElementPath, QName, XmlDocument, XmlNode};
pub use parser::XmlParser;
pub use serializer::XmlSerializer;
pub use xpath::{parse_path, Step, XPath, XPathContext};

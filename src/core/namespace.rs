//! Namespace management for XPath evaluation
//!
//! Motion photo metadata is addressed through prefixed XPath expressions.
//! The prefixes used in those expressions are bound here, independently of
//! whatever prefixes a particular document happens to declare.

use crate::core::error::{MphotoError, MphotoResult};
use std::collections::HashMap;

/// Namespaces used by motion photo metadata
pub mod ns {
    /// Adobe XMP meta wrapper namespace
    pub const X: &str = "adobe:ns:meta/";
    /// RDF namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// Google camera namespace (Motion Photo and Microvideo fields)
    pub const CAMERA: &str = "http://ns.google.com/photos/1.0/camera/";
    /// Google container namespace
    pub const CONTAINER: &str = "http://ns.google.com/photos/1.0/container/";
    /// Google container item namespace
    pub const ITEM: &str = "http://ns.google.com/photos/1.0/container/item/";
    /// XML namespace (for xml:lang, etc.)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

    /// XMP meta prefix
    pub const X_PREFIX: &str = "x";
    /// RDF prefix
    pub const RDF_PREFIX: &str = "rdf";
    /// Camera prefix
    pub const CAMERA_PREFIX: &str = "Camera";
    /// Container prefix
    pub const CONTAINER_PREFIX: &str = "Container";
    /// Item prefix
    pub const ITEM_PREFIX: &str = "Item";
    /// Legacy camera prefix, bound to the same URI as [`CAMERA_PREFIX`]
    pub const GCAMERA_PREFIX: &str = "GCamera";
    /// XML prefix
    pub const XML_PREFIX: &str = "xml";
}

/// The fixed prefix table registered on every motion photo XPath context.
pub const MOTION_PHOTO_NAMESPACES: &[(&str, &str)] = &[
    (ns::X_PREFIX, ns::X),
    (ns::RDF_PREFIX, ns::RDF),
    (ns::CAMERA_PREFIX, ns::CAMERA),
    (ns::CONTAINER_PREFIX, ns::CONTAINER),
    (ns::ITEM_PREFIX, ns::ITEM),
    (ns::GCAMERA_PREFIX, ns::CAMERA),
];

/// Map of namespace prefix to URI
///
/// Several prefixes may be bound to the same URI (`Camera` and `GCamera`),
/// so only the prefix direction is unique.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    prefix_to_uri: HashMap<String, String>,
}

impl NamespaceMap {
    /// Create an empty namespace map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace URI with a prefix
    ///
    /// # Returns
    ///
    /// Returns an error if the prefix is already registered to a different URI
    pub fn register(&mut self, prefix: &str, uri: &str) -> MphotoResult<()> {
        if prefix.is_empty() || uri.is_empty() {
            return Err(MphotoError::InternalError(format!(
                "Cannot register namespace '{}' -> '{}'",
                prefix, uri
            )));
        }

        if let Some(existing_uri) = self.prefix_to_uri.get(prefix) {
            if existing_uri != uri {
                return Err(MphotoError::InternalError(format!(
                    "Prefix '{}' is already registered to '{}'",
                    prefix, existing_uri
                )));
            }
            return Ok(());
        }

        self.prefix_to_uri
            .insert(prefix.to_string(), uri.to_string());
        Ok(())
    }

    /// Register every `(prefix, uri)` pair of a table
    pub fn register_all(&mut self, table: &[(&str, &str)]) -> MphotoResult<()> {
        for (prefix, uri) in table {
            self.register(prefix, uri)?;
        }
        Ok(())
    }

    /// Get the URI for a namespace prefix
    pub fn get_uri(&self, prefix: &str) -> Option<&str> {
        if prefix == ns::XML_PREFIX {
            return Some(ns::XML);
        }
        self.prefix_to_uri.get(prefix).map(|s| s.as_str())
    }

    /// Check if a namespace prefix is registered
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.get_uri(prefix).is_some()
    }

    /// Number of registered prefixes
    pub fn len(&self) -> usize {
        self.prefix_to_uri.len()
    }

    /// Check if no prefix is registered
    pub fn is_empty(&self) -> bool {
        self.prefix_to_uri.is_empty()
    }
}

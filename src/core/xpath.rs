//! XPath handling for XMP
//!
//! This module parses and evaluates the absolute XPath subset used to
//! address motion photo metadata:
//! - `/x:xmpmeta/rdf:RDF/rdf:Description` - element steps
//! - `rdf:li[2]` - 1-based position among matching siblings
//! - `.../@Camera:MotionPhoto` - a final attribute step
//!
//! Prefixes in an expression are resolved through the context's
//! [`NamespaceMap`], never through the document's own declarations.

use crate::core::error::{MphotoError, MphotoResult};
use crate::core::namespace::NamespaceMap;
use crate::core::node::{ElementPath, QName, XmlDocument};

/// Parse an XPath expression
///
/// Supports formats like:
/// - `/x:xmpmeta/rdf:RDF` - element steps
/// - `/x:xmpmeta/rdf:RDF/rdf:Seq/rdf:li[1]` - positional predicate
/// - `/x:xmpmeta/rdf:RDF/rdf:Description/@Camera:MotionPhoto` - attribute
pub fn parse_path(path: &str) -> MphotoResult<XPath> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(MphotoError::BadXPath(format!(
            "Only absolute paths are supported: {}",
            path
        )));
    };

    let mut components = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;

    for ch in rest.chars() {
        match ch {
            '[' => {
                if in_brackets || current.is_empty() {
                    return Err(MphotoError::BadXPath("Unexpected '['".to_string()));
                }
                components.push(PathComponent::Name(std::mem::take(&mut current)));
                in_brackets = true;
            }
            ']' => {
                if !in_brackets {
                    return Err(MphotoError::BadXPath("Unexpected ']'".to_string()));
                }
                let index = current.parse::<usize>().map_err(|_| {
                    MphotoError::BadXPath(format!("Invalid position: {}", current))
                })?;
                if index == 0 {
                    return Err(MphotoError::BadXPath("Positions start at 1".to_string()));
                }
                components.push(PathComponent::Index(index));
                current.clear();
                in_brackets = false;
            }
            '/' => {
                if in_brackets {
                    return Err(MphotoError::BadXPath("Unclosed bracket".to_string()));
                }
                if !current.is_empty() {
                    components.push(PathComponent::Name(std::mem::take(&mut current)));
                } else if !matches!(components.last(), Some(PathComponent::Index(_))) {
                    return Err(MphotoError::BadXPath(format!("Empty step in: {}", path)));
                }
            }
            _ => {
                if !in_brackets || ch.is_ascii_digit() {
                    current.push(ch);
                } else {
                    return Err(MphotoError::BadXPath(format!(
                        "Invalid character in position: {}",
                        ch
                    )));
                }
            }
        }
    }

    if in_brackets {
        return Err(MphotoError::BadXPath("Unclosed bracket".to_string()));
    }
    if !current.is_empty() {
        components.push(PathComponent::Name(current));
    }

    XPath::from_components(path, components)
}

/// A raw component of an XPath expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathComponent {
    /// A step name, `@` included for attributes
    Name(String),
    /// A 1-based position predicate
    Index(usize),
}

/// A single location step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Child element step with an optional 1-based position
    Element { name: QName, position: Option<usize> },
    /// Attribute step, always last
    Attribute { name: QName },
}

/// A parsed absolute XPath expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    steps: Vec<Step>,
}

impl XPath {
    fn from_components(path: &str, components: Vec<PathComponent>) -> MphotoResult<Self> {
        let mut steps: Vec<Step> = Vec::new();
        for component in components {
            if matches!(steps.last(), Some(Step::Attribute { .. })) {
                return Err(MphotoError::BadXPath(format!(
                    "Attribute step must be last: {}",
                    path
                )));
            }
            match component {
                PathComponent::Name(name) => {
                    let step = match name.strip_prefix('@') {
                        Some(attr) => Step::Attribute {
                            name: Self::qualified(path, attr)?,
                        },
                        None => Step::Element {
                            name: Self::qualified(path, &name)?,
                            position: None,
                        },
                    };
                    steps.push(step);
                }
                PathComponent::Index(index) => match steps.last_mut() {
                    Some(Step::Element { position, .. }) if position.is_none() => {
                        *position = Some(index)
                    }
                    _ => {
                        return Err(MphotoError::BadXPath(format!(
                            "Misplaced position predicate: {}",
                            path
                        )))
                    }
                },
            }
        }

        if !matches!(steps.first(), Some(Step::Element { .. })) {
            return Err(MphotoError::BadXPath(format!(
                "Path selects no element: {}",
                path
            )));
        }

        Ok(Self { steps })
    }

    fn qualified(path: &str, raw: &str) -> MphotoResult<QName> {
        let name = QName::parse(raw);
        match &name.prefix {
            Some(prefix) if !prefix.is_empty() && !name.local.is_empty() => Ok(name),
            _ => Err(MphotoError::BadXPath(format!(
                "Step '{}' needs a prefixed name in: {}",
                raw, path
            ))),
        }
    }

    /// The location steps
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The final attribute step, if any
    pub fn attribute(&self) -> Option<&QName> {
        match self.steps.last() {
            Some(Step::Attribute { name }) => Some(name),
            _ => None,
        }
    }

    fn element_steps(&self) -> impl Iterator<Item = (&QName, Option<usize>)> {
        self.steps.iter().filter_map(|step| match step {
            Step::Element { name, position } => Some((name, *position)),
            Step::Attribute { .. } => None,
        })
    }
}

/// XPath evaluation context holding the prefix bindings for expressions
#[derive(Debug, Clone, Default)]
pub struct XPathContext {
    namespaces: NamespaceMap,
}

impl XPathContext {
    /// Create a context with no registered prefixes
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a table of `(prefix, uri)` bindings registered
    pub fn with_namespaces(table: &[(&str, &str)]) -> MphotoResult<Self> {
        let mut context = Self::new();
        context.namespaces.register_all(table)?;
        Ok(context)
    }

    /// Register a namespace prefix for use in expressions
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) -> MphotoResult<()> {
        self.namespaces.register(prefix, uri)
    }

    /// Select the elements addressed by the element steps of `path`, in
    /// document order
    pub fn select(&self, doc: &XmlDocument, path: &str) -> MphotoResult<Vec<ElementPath>> {
        let xpath = parse_path(path)?;
        self.select_elements(doc, &xpath)
    }

    /// Evaluate `path` to a string value
    ///
    /// For an attribute path this is the value of the first selected element
    /// carrying the attribute; otherwise the text content of the first
    /// selected element. An empty result is reported as `NotFound`.
    pub fn get(&self, doc: &XmlDocument, path: &str) -> MphotoResult<String> {
        let xpath = parse_path(path)?;
        let elements = self.select_elements(doc, &xpath)?;

        let value = match xpath.attribute() {
            Some(attr) => {
                let uri = self.resolve(attr)?;
                elements
                    .iter()
                    .filter_map(|p| doc.element_at(p))
                    .find_map(|element| element.attribute(uri, &attr.local))
                    .map(|a| a.value.clone())
            }
            None => elements
                .first()
                .and_then(|p| doc.element_at(p))
                .map(|element| element.text_content()),
        };

        match value {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(MphotoError::NotFound(path.to_string())),
        }
    }

    /// Check whether `path` selects a non-empty value
    pub fn exists(&self, doc: &XmlDocument, path: &str) -> MphotoResult<bool> {
        match self.get(doc, path) {
            Ok(_) => Ok(true),
            Err(MphotoError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Set the attribute addressed by `path`
    ///
    /// The element part of the path must already exist. When the attribute
    /// is absent it is created on the first selected element, declaring its
    /// namespace there if no prefix for it is in scope.
    pub fn set(&self, doc: &mut XmlDocument, path: &str, value: &str) -> MphotoResult<()> {
        let xpath = parse_path(path)?;
        let attr = xpath.attribute().ok_or_else(|| {
            MphotoError::BadXPath(format!("Path does not select an attribute: {}", path))
        })?;
        let uri = self.resolve(attr)?;
        let elements = self.select_elements(doc, &xpath)?;

        let target = elements
            .iter()
            .find(|p| {
                doc.element_at(p)
                    .is_some_and(|element| element.attribute(uri, &attr.local).is_some())
            })
            .or_else(|| elements.first())
            .ok_or_else(|| MphotoError::NotFound(path.to_string()))?
            .clone();

        let existing = doc
            .element_at(&target)
            .and_then(|element| element.attribute(uri, &attr.local))
            .is_some();
        let prefix = match doc.prefix_in_scope(&target, uri) {
            Some(prefix) => prefix,
            None if existing => attr.prefix.clone().unwrap_or_default(),
            None => {
                let prefix = Self::free_prefix(doc, &target, attr.prefix.as_deref().unwrap_or(""));
                doc.element_at_mut(&target)
                    .ok_or_else(|| MphotoError::InternalError(path.to_string()))?
                    .declare_namespace(&prefix, uri);
                prefix
            }
        };

        let element = doc
            .element_at_mut(&target)
            .ok_or_else(|| MphotoError::InternalError(path.to_string()))?;
        element.set_attribute(QName::new(Some(&prefix), attr.local.clone()), uri, value);
        Ok(())
    }

    /// Remove the attribute addressed by `path` from every selected element,
    /// returning whether anything was removed. Missing elements are not an
    /// error.
    pub fn remove(&self, doc: &mut XmlDocument, path: &str) -> MphotoResult<bool> {
        let xpath = parse_path(path)?;
        let attr = xpath.attribute().ok_or_else(|| {
            MphotoError::BadXPath(format!("Path does not select an attribute: {}", path))
        })?;
        let uri = self.resolve(attr)?.to_string();

        let mut removed = false;
        for target in self.select_elements(doc, &xpath)? {
            if let Some(element) = doc.element_at_mut(&target) {
                removed |= element.remove_attribute(&uri, &attr.local);
            }
        }
        Ok(removed)
    }

    fn resolve(&self, name: &QName) -> MphotoResult<&str> {
        let prefix = name.prefix.as_deref().unwrap_or("");
        self.namespaces.get_uri(prefix).ok_or_else(|| {
            MphotoError::BadXPath(format!("Unregistered namespace prefix: {}", prefix))
        })
    }

    fn select_elements(&self, doc: &XmlDocument, xpath: &XPath) -> MphotoResult<Vec<ElementPath>> {
        let mut steps = xpath.element_steps();
        let Some((root_name, root_position)) = steps.next() else {
            return Ok(Vec::new());
        };

        let root_uri = self.resolve(root_name)?;
        let root_selected = doc.root().matches(root_uri, &root_name.local)
            && root_position.unwrap_or(1) == 1;
        let mut selected: Vec<ElementPath> = if root_selected {
            vec![Vec::new()]
        } else {
            Vec::new()
        };

        for (name, position) in steps {
            let uri = self.resolve(name)?;
            let mut next = Vec::new();
            for context in &selected {
                let Some(element) = doc.element_at(context) else {
                    continue;
                };
                let matching = element
                    .children
                    .iter()
                    .enumerate()
                    .filter(|(_, child)| {
                        child
                            .as_element()
                            .is_some_and(|e| e.matches(uri, &name.local))
                    })
                    .map(|(index, _)| index);
                let chosen: Vec<usize> = match position {
                    Some(position) => matching.skip(position - 1).take(1).collect(),
                    None => matching.collect(),
                };
                for index in chosen {
                    let mut child_path = context.clone();
                    child_path.push(index);
                    next.push(child_path);
                }
            }
            selected = next;
        }

        Ok(selected)
    }

    /// Pick a prefix for a new declaration on the element at `path` that does
    /// not shadow an existing binding
    fn free_prefix(doc: &XmlDocument, path: &[usize], wanted: &str) -> String {
        if doc.namespace_in_scope(path, wanted).is_none() {
            return wanted.to_string();
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{}{}", wanted, counter);
            if doc.namespace_in_scope(path, &candidate).is_none() {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::{ns, MOTION_PHOTO_NAMESPACES};

    const DESCRIPTION: &str = "/x:xmpmeta/rdf:RDF/rdf:Description";

    const XMP: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about="" xmlns:GCamera="http://ns.google.com/photos/1.0/camera/"
        GCamera:MotionPhoto="1"/>
    <rdf:Description rdf:about=""
        xmlns:Container="http://ns.google.com/photos/1.0/container/"
        xmlns:Item="http://ns.google.com/photos/1.0/container/item/">
      <Container:Directory>
        <rdf:Seq>
          <rdf:li><Container:Item Item:Mime="image/jpeg"/></rdf:li>
          <rdf:li><Container:Item Item:Mime="video/mp4" Item:Length="42"/></rdf:li>
        </rdf:Seq>
      </Container:Directory>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#;

    fn context() -> XPathContext {
        XPathContext::with_namespaces(MOTION_PHOTO_NAMESPACES).unwrap()
    }

    fn item(n: usize, attr: &str) -> String {
        format!(
            "{}/Container:Directory/rdf:Seq/rdf:li[{}]/Container:Item/@Item:{}",
            DESCRIPTION, n, attr
        )
    }

    #[test]
    fn test_parse_path() {
        let xpath = parse_path("/x:xmpmeta/rdf:RDF/rdf:li[2]/@Item:Mime").unwrap();
        assert_eq!(xpath.steps().len(), 4);
        assert_eq!(
            xpath.steps()[2],
            Step::Element {
                name: QName::parse("rdf:li"),
                position: Some(2)
            }
        );
        assert_eq!(xpath.attribute(), Some(&QName::parse("Item:Mime")));
    }

    #[test]
    fn test_parse_path_errors() {
        for bad in [
            "x:xmpmeta",
            "/x:xmpmeta//rdf:RDF",
            "/x:xmpmeta[0]",
            "/x:xmpmeta[a]",
            "/x:xmpmeta[1",
            "/x:xmpmeta/@rdf:about/rdf:RDF",
            "/xmpmeta",
            "/@rdf:about",
            "/",
        ] {
            assert!(
                matches!(parse_path(bad), Err(MphotoError::BadXPath(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_get_across_descriptions() {
        let doc = XmlDocument::parse(XMP).unwrap();
        let ctx = context();
        // Camera and GCamera share a URI, so either prefix finds the attribute
        let camera = format!("{}/@Camera:MotionPhoto", DESCRIPTION);
        let gcamera = format!("{}/@GCamera:MotionPhoto", DESCRIPTION);
        assert_eq!(ctx.get(&doc, &camera).unwrap(), "1");
        assert_eq!(ctx.get(&doc, &gcamera).unwrap(), "1");

        assert_eq!(ctx.get(&doc, &item(1, "Mime")).unwrap(), "image/jpeg");
        assert_eq!(ctx.get(&doc, &item(2, "Mime")).unwrap(), "video/mp4");
        assert_eq!(ctx.get(&doc, &item(2, "Length")).unwrap(), "42");
    }

    #[test]
    fn test_get_missing() {
        let doc = XmlDocument::parse(XMP).unwrap();
        let ctx = context();
        assert!(matches!(
            ctx.get(&doc, &item(1, "Padding")),
            Err(MphotoError::NotFound(_))
        ));
        assert!(matches!(
            ctx.get(&doc, &item(3, "Mime")),
            Err(MphotoError::NotFound(_))
        ));
        assert!(!ctx.exists(&doc, &item(3, "Mime")).unwrap());
        assert!(matches!(
            ctx.get(&doc, "/x:xmpmeta/dc:title"),
            Err(MphotoError::BadXPath(_))
        ));
    }

    #[test]
    fn test_set_existing_and_new_attribute() {
        let mut doc = XmlDocument::parse(XMP).unwrap();
        let ctx = context();

        ctx.set(&mut doc, &item(2, "Length"), "1000").unwrap();
        ctx.set(&mut doc, &item(1, "Padding"), "16").unwrap();
        assert_eq!(ctx.get(&doc, &item(2, "Length")).unwrap(), "1000");
        assert_eq!(ctx.get(&doc, &item(1, "Padding")).unwrap(), "16");

        // Existing attribute on the first Description is updated in place
        ctx.set(&mut doc, &format!("{}/@Camera:MotionPhoto", DESCRIPTION), "0")
            .unwrap();
        let first = doc.element_at(&[1, 1]).unwrap();
        let flag = first.attribute(ns::CAMERA, "MotionPhoto").unwrap();
        assert_eq!(flag.value, "0");
        assert_eq!(flag.name.to_string(), "GCamera:MotionPhoto");

        let reparsed = XmlDocument::parse(&doc.serialize().unwrap()).unwrap();
        assert_eq!(ctx.get(&reparsed, &item(1, "Padding")).unwrap(), "16");
    }

    #[test]
    fn test_set_declares_namespace() {
        let mut doc = XmlDocument::parse(XMP).unwrap();
        let ctx = context();
        let path = format!("{}/@Camera:MotionPhotoVersion", DESCRIPTION);
        ctx.set(&mut doc, &path, "1").unwrap();

        // Created on the first Description, which already binds GCamera
        let first = doc.element_at(&[1, 1]).unwrap();
        let version = first.attribute(ns::CAMERA, "MotionPhotoVersion").unwrap();
        assert_eq!(version.name.to_string(), "GCamera:MotionPhotoVersion");

        let reparsed = XmlDocument::parse(&doc.serialize().unwrap()).unwrap();
        assert_eq!(ctx.get(&reparsed, &path).unwrap(), "1");
    }

    #[test]
    fn test_set_requires_element() {
        let mut doc = XmlDocument::parse(XMP).unwrap();
        let ctx = context();
        assert!(matches!(
            ctx.set(&mut doc, &item(3, "Mime"), "image/jpeg"),
            Err(MphotoError::NotFound(_))
        ));
        assert!(matches!(
            ctx.set(&mut doc, DESCRIPTION, "x"),
            Err(MphotoError::BadXPath(_))
        ));
    }

    #[test]
    fn test_remove() {
        let mut doc = XmlDocument::parse(XMP).unwrap();
        let ctx = context();
        assert!(ctx.remove(&mut doc, &item(2, "Length")).unwrap());
        assert!(!ctx.remove(&mut doc, &item(2, "Length")).unwrap());
        assert!(!ctx.exists(&doc, &item(2, "Length")).unwrap());
    }
}

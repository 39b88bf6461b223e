//! XPath field tables for the motion photo metadata schemas
//!
//! Every path is absolute and written with the prefixes of
//! [`MOTION_PHOTO_NAMESPACES`](crate::core::MOTION_PHOTO_NAMESPACES), which
//! are registered on every context evaluating them.

/// Logical metadata fields shared by both schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Motion photo flag (1 for a motion photo)
    MotionPhoto,
    /// Format version
    Version,
    /// Presentation timestamp of the still, in microseconds
    PresentationTimestampUs,
    /// Mime type of the still image
    StillMimeType,
    /// Mime type of the video
    VideoMimeType,
    /// Byte length of the video (the video offset from the end, for
    /// Microvideo)
    VideoLength,
    /// Bytes between the still and the video
    StillPadding,
}

/// A field and the XPath locating its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
    pub field: Field,
    pub path: &'static str,
}

/// Motion Photo fields
pub const MOTION_PHOTO_FIELDS: &[FieldPath] = &[
    FieldPath {
        field: Field::MotionPhoto,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/@Camera:MotionPhoto",
    },
    FieldPath {
        field: Field::Version,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/@Camera:MotionPhotoVersion",
    },
    FieldPath {
        field: Field::PresentationTimestampUs,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/@Camera:MotionPhotoPresentationTimestampUs",
    },
    FieldPath {
        field: Field::StillMimeType,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/Container:Directory/rdf:Seq/rdf:li[1]/Container:Item/@Item:Mime",
    },
    FieldPath {
        field: Field::VideoMimeType,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/Container:Directory/rdf:Seq/rdf:li[2]/Container:Item/@Item:Mime",
    },
    FieldPath {
        field: Field::VideoLength,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/Container:Directory/rdf:Seq/rdf:li[2]/Container:Item/@Item:Length",
    },
    FieldPath {
        field: Field::StillPadding,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/Container:Directory/rdf:Seq/rdf:li[1]/Container:Item/@Item:Padding",
    },
];

/// Microvideo fields (deprecated schema)
///
/// Mime types and padding are fixed by the schema and have no path.
pub const MICROVIDEO_FIELDS: &[FieldPath] = &[
    FieldPath {
        field: Field::MotionPhoto,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/@GCamera:MicroVideo",
    },
    FieldPath {
        field: Field::Version,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/@GCamera:MicroVideoVersion",
    },
    FieldPath {
        field: Field::PresentationTimestampUs,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/@GCamera:MicroVideoPresentationTimestampUs",
    },
    FieldPath {
        field: Field::VideoLength,
        path: "/x:xmpmeta/rdf:RDF/rdf:Description/@GCamera:MicroVideoOffset",
    },
];

/// Item list of a Motion Photo
pub(crate) const ITEM_LIST_PATH: &str =
    "/x:xmpmeta/rdf:RDF/rdf:Description/Container:Directory/rdf:Seq";

/// Look up the path of a field in a table
pub fn field_path(table: &[FieldPath], field: Field) -> Option<&'static str> {
    table
        .iter()
        .find(|entry| entry.field == field)
        .map(|entry| entry.path)
}

/// Skeleton of a fresh Motion Photo XMP document, without its item list
pub(crate) const DEFAULT_XMP: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Adobe XMP Core 5.1.0-jc003">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:Camera="http://ns.google.com/photos/1.0/camera/"
        xmlns:Container="http://ns.google.com/photos/1.0/container/"
        xmlns:Item="http://ns.google.com/photos/1.0/container/item/"
        Camera:MotionPhoto="1"
        Camera:MotionPhotoVersion="1"
        Camera:MotionPhotoPresentationTimestampUs="0"
        Container:Version="1"/>
  </rdf:RDF>
</x:xmpmeta>"#;

/// Container element grafted under `x:xmpmeta` when it has none
pub(crate) const DEFAULT_RDF: &str =
    r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"/>"#;

/// Description grafted under `rdf:RDF` when it has none
pub(crate) const DEFAULT_DESCRIPTION: &str = r#"<rdf:Description rdf:about=""
    xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:Camera="http://ns.google.com/photos/1.0/camera/"
    xmlns:Container="http://ns.google.com/photos/1.0/container/"
    xmlns:Item="http://ns.google.com/photos/1.0/container/item/"/>"#;

/// Default item list: the primary still, then the video
pub(crate) const DEFAULT_ITEMS: &str = r#"<Container:Directory
    xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:Container="http://ns.google.com/photos/1.0/container/"
    xmlns:Item="http://ns.google.com/photos/1.0/container/item/">
  <rdf:Seq>
    <rdf:li>
      <Container:Item Item:Semantic="Primary" Item:Mime="image/jpeg"/>
    </rdf:li>
    <rdf:li>
      <Container:Item Item:Semantic="MotionPhoto" Item:Mime="video/mp4" Item:Length="0"/>
    </rdf:li>
  </rdf:Seq>
</Container:Directory>"#;

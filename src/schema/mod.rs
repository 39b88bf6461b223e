//! Motion photo metadata schemas
//!
//! Two XMP schemas describe where the video of a motion photo lives:
//! - Motion Photo: `Camera:*` attributes plus a `Container:Directory` item
//!   list giving the mime type and length of each stream
//! - Microvideo (deprecated): `GCamera:MicroVideo*` attributes with fixed
//!   JPEG/MP4 streams and no padding
//!
//! [`SchemaResolver`] detects which one a document uses and converts between
//! the document and an [`ImageInfo`].

pub mod fields;

pub use fields::{field_path, Field, FieldPath, MICROVIDEO_FIELDS, MOTION_PHOTO_FIELDS};

use crate::core::error::{MphotoError, MphotoResult};
use crate::core::namespace::{ns, MOTION_PHOTO_NAMESPACES};
use crate::core::node::{ElementPath, XmlDocument};
use crate::core::xpath::XPathContext;
use crate::types::{ImageInfo, MimeType};
use fields::{DEFAULT_DESCRIPTION, DEFAULT_ITEMS, DEFAULT_RDF, DEFAULT_XMP, ITEM_LIST_PATH};
use std::fmt;
use std::str::FromStr;

/// Metadata schema used by a motion photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MPhotoFormat {
    /// No motion photo metadata
    #[default]
    None,
    /// Motion Photo schema
    MotionPhoto,
    /// Deprecated Microvideo schema
    Microvideo,
}

impl MPhotoFormat {
    /// Field table of the schema (empty for `None`)
    pub fn fields(&self) -> &'static [FieldPath] {
        match self {
            MPhotoFormat::None => &[],
            MPhotoFormat::MotionPhoto => MOTION_PHOTO_FIELDS,
            MPhotoFormat::Microvideo => MICROVIDEO_FIELDS,
        }
    }
}

impl fmt::Display for MPhotoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MPhotoFormat::None => "none",
            MPhotoFormat::MotionPhoto => "Motion Photo",
            MPhotoFormat::Microvideo => "Microvideo",
        };
        f.write_str(name)
    }
}

/// Reads and writes motion photo fields in an XMP document
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    context: XPathContext,
}

impl SchemaResolver {
    /// Create a resolver with the motion photo prefixes registered
    pub fn new() -> MphotoResult<Self> {
        Ok(Self {
            context: XPathContext::with_namespaces(MOTION_PHOTO_NAMESPACES)?,
        })
    }

    /// Detect the schema of a document
    ///
    /// A Motion Photo flag takes precedence over a Microvideo flag.
    pub fn detect_format(&self, doc: &XmlDocument) -> MphotoResult<MPhotoFormat> {
        let format = if self.has_field(doc, MPhotoFormat::MotionPhoto)? {
            MPhotoFormat::MotionPhoto
        } else if self.has_field(doc, MPhotoFormat::Microvideo)? {
            MPhotoFormat::Microvideo
        } else {
            MPhotoFormat::None
        };
        tracing::debug!(%format, "detected motion photo schema");
        Ok(format)
    }

    /// Read the fields of `format` into an [`ImageInfo`]
    ///
    /// # Errors
    ///
    /// * `NotFound` if a required field is absent or empty
    /// * `IncorrectType` if a numeric field does not parse
    /// * `InvalidArgument` for [`MPhotoFormat::None`]
    pub fn read_fields(&self, doc: &XmlDocument, format: MPhotoFormat) -> MphotoResult<ImageInfo> {
        let table = format.fields();
        match format {
            MPhotoFormat::None => Err(MphotoError::InvalidArgument(
                "No motion photo metadata to read".to_string(),
            )),
            MPhotoFormat::MotionPhoto => {
                let still_padding = match self.read_int(doc, table, Field::StillPadding) {
                    Err(MphotoError::NotFound(_)) => 0,
                    result => result?,
                };
                Ok(ImageInfo {
                    motion_photo: self.read_int(doc, table, Field::MotionPhoto)?,
                    motion_photo_version: self.read_int(doc, table, Field::Version)?,
                    presentation_timestamp_us: self.read_int(
                        doc,
                        table,
                        Field::PresentationTimestampUs,
                    )?,
                    still_mime_type: self.read_mime(doc, table, Field::StillMimeType)?,
                    video_mime_type: self.read_mime(doc, table, Field::VideoMimeType)?,
                    video_length: self.read_int(doc, table, Field::VideoLength)?,
                    still_padding,
                })
            }
            MPhotoFormat::Microvideo => Ok(ImageInfo {
                motion_photo: self.read_int(doc, table, Field::MotionPhoto)?,
                motion_photo_version: self.read_int(doc, table, Field::Version)?,
                presentation_timestamp_us: self.read_int(
                    doc,
                    table,
                    Field::PresentationTimestampUs,
                )?,
                still_mime_type: MimeType::ImageJpeg,
                video_mime_type: MimeType::VideoMp4,
                video_length: self.read_int(doc, table, Field::VideoLength)?,
                still_padding: 0,
            }),
        }
    }

    /// Write the fields of `info` into `doc` using the schema `format`
    ///
    /// For Motion Photo the default item list is merged in first when the
    /// document has none. `Item:Padding` is removed when the padding is 0.
    /// On error `doc` is left unchanged.
    pub fn write_fields(
        &self,
        doc: &mut XmlDocument,
        format: MPhotoFormat,
        info: &ImageInfo,
    ) -> MphotoResult<()> {
        let table = format.fields();
        let mut updated = doc.clone();

        match format {
            MPhotoFormat::None => {
                return Err(MphotoError::InvalidArgument(
                    "No motion photo schema to write".to_string(),
                ))
            }
            MPhotoFormat::MotionPhoto => {
                self.ensure_motion_photo_items(&mut updated)?;
                self.write_value(&mut updated, table, Field::MotionPhoto, info.motion_photo)?;
                self.write_value(&mut updated, table, Field::Version, info.motion_photo_version)?;
                self.write_value(
                    &mut updated,
                    table,
                    Field::PresentationTimestampUs,
                    info.presentation_timestamp_us,
                )?;
                self.write_value(
                    &mut updated,
                    table,
                    Field::StillMimeType,
                    info.still_mime_type,
                )?;
                self.write_value(
                    &mut updated,
                    table,
                    Field::VideoMimeType,
                    info.video_mime_type,
                )?;
                self.write_value(&mut updated, table, Field::VideoLength, info.video_length)?;
                if info.still_padding > 0 {
                    self.write_value(&mut updated, table, Field::StillPadding, info.still_padding)?;
                } else {
                    let path = Self::path(table, Field::StillPadding)?;
                    self.context.remove(&mut updated, path)?;
                }
            }
            MPhotoFormat::Microvideo => {
                self.write_value(&mut updated, table, Field::MotionPhoto, info.motion_photo)?;
                self.write_value(&mut updated, table, Field::Version, info.motion_photo_version)?;
                self.write_value(&mut updated, table, Field::VideoLength, info.video_length)?;
                self.write_value(
                    &mut updated,
                    table,
                    Field::PresentationTimestampUs,
                    info.presentation_timestamp_us,
                )?;
            }
        }

        *doc = updated;
        Ok(())
    }

    /// Merge the default Motion Photo item list into `doc` when it has none
    ///
    /// Missing `rdf:RDF` and `rdf:Description` elements are created on the
    /// way. Namespace declarations already in scope are not repeated.
    pub fn ensure_motion_photo_items(&self, doc: &mut XmlDocument) -> MphotoResult<()> {
        if !doc.root().matches(ns::X, "xmpmeta") {
            return Err(MphotoError::InvalidArgument(
                "XMP root element is not x:xmpmeta".to_string(),
            ));
        }
        if !self.context.select(doc, ITEM_LIST_PATH)?.is_empty() {
            return Ok(());
        }

        let rdf = match self.context.select(doc, "/x:xmpmeta/rdf:RDF")?.into_iter().next() {
            Some(path) => path,
            None => Self::graft(doc, &[], DEFAULT_RDF)?,
        };
        let existing = doc
            .element_at(&rdf)
            .and_then(|element| element.find_child(ns::RDF, "Description"));
        let description = match existing {
            Some(index) => {
                let mut path = rdf;
                path.push(index);
                path
            }
            None => Self::graft(doc, &rdf, DEFAULT_DESCRIPTION)?,
        };
        Self::graft(doc, &description, DEFAULT_ITEMS)?;

        tracing::debug!("merged default Motion Photo item list");
        Ok(())
    }

    /// Build the XMP document of a still that carries none
    pub fn default_document(&self) -> MphotoResult<XmlDocument> {
        let mut doc = XmlDocument::parse(DEFAULT_XMP)?;
        self.ensure_motion_photo_items(&mut doc)?;
        Ok(doc)
    }

    fn has_field(&self, doc: &XmlDocument, format: MPhotoFormat) -> MphotoResult<bool> {
        let path = Self::path(format.fields(), Field::MotionPhoto)?;
        self.context.exists(doc, path)
    }

    fn path(table: &[FieldPath], field: Field) -> MphotoResult<&'static str> {
        field_path(table, field)
            .ok_or_else(|| MphotoError::InternalError(format!("No path for field {:?}", field)))
    }

    fn read_int<T: FromStr>(
        &self,
        doc: &XmlDocument,
        table: &[FieldPath],
        field: Field,
    ) -> MphotoResult<T> {
        let path = Self::path(table, field)?;
        let value = self.context.get(doc, path)?;
        value
            .trim_matches(|c: char| c.is_ascii_whitespace())
            .parse()
            .map_err(|_| MphotoError::IncorrectType(format!("{} = {:?}", path, value)))
    }

    fn read_mime(
        &self,
        doc: &XmlDocument,
        table: &[FieldPath],
        field: Field,
    ) -> MphotoResult<MimeType> {
        let path = Self::path(table, field)?;
        Ok(MimeType::from_mime_str(&self.context.get(doc, path)?))
    }

    fn write_value(
        &self,
        doc: &mut XmlDocument,
        table: &[FieldPath],
        field: Field,
        value: impl ToString,
    ) -> MphotoResult<()> {
        let path = Self::path(table, field)?;
        self.context.set(doc, path, &value.to_string())
    }

    /// Append a self-contained fragment under the element at `parent`,
    /// dropping its namespace declarations that are already in scope there
    fn graft(doc: &mut XmlDocument, parent: &[usize], fragment: &str) -> MphotoResult<ElementPath> {
        let mut element = XmlDocument::parse(fragment)?.root().clone();
        element.attributes.retain(|attr| {
            if !attr.name.is_namespace_declaration() {
                return true;
            }
            let prefix = match &attr.name.prefix {
                Some(_) => attr.name.local.as_str(),
                None => "",
            };
            doc.namespace_in_scope(parent, prefix).as_deref() != Some(attr.value.as_str())
        });

        let index = doc
            .element_at_mut(parent)
            .ok_or_else(|| MphotoError::InternalError("Graft target vanished".to_string()))?
            .append_element(element);
        let mut path = parent.to_vec();
        path.push(index);
        Ok(path)
    }
}

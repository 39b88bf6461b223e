//! HEIF (High Efficiency Image File Format) support
//!
//! - Detect brands: `mif1`, `msf1`, `heic`, `heix`, `hevc`, `hevx`
//! - XMP Storage: an item of type `mime` with content type
//!   `application/rdf+xml`, linked to the primary image by a `cdsc`
//!   (content describes) reference
//! - Item data is located through `iloc`, either at file offsets or inside
//!   the `idat` box of `meta`
//! - Writing XMP back is not supported

use crate::core::error::{MphotoError, MphotoResult};
use crate::core::node::XmlDocument;
use crate::files::formats::bmff::{
    box_data, fourcc_str, read_box, read_boxes, ByteReader, FTYP_BOX, META_BOX,
};
use crate::files::handler::XmpHandler;
use crate::types::MimeType;
use std::io::{Read, Seek, Write};

/// Item type of metadata blocks carrying a mime-typed payload
pub const ITEM_TYPE_MIME: &str = "mime";

/// Content type of XMP metadata blocks
pub const XMP_CONTENT_TYPE: &str = "application/rdf+xml";

/// Box types used in HEIF item storage
const BOX_TYPE_PITM: &[u8; 4] = b"pitm";
const BOX_TYPE_IINF: &[u8; 4] = b"iinf";
const BOX_TYPE_INFE: &[u8; 4] = b"infe";
const BOX_TYPE_IREF: &[u8; 4] = b"iref";
const BOX_TYPE_ILOC: &[u8; 4] = b"iloc";
const BOX_TYPE_IDAT: &[u8; 4] = b"idat";

/// Reference type linking a metadata item to the item it describes
const REFERENCE_CDSC: &[u8; 4] = b"cdsc";

/// HEIF file handler for XMP metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct HeifHandler;

impl XmpHandler for HeifHandler {
    fn read_xmp<R: Read + Seek>(&self, reader: &mut R) -> MphotoResult<Option<XmlDocument>> {
        Self::read_xmp(reader)
    }

    fn write_xmp<R: Read + Seek, W: Write>(
        &self,
        _reader: &mut R,
        _writer: &mut W,
        _doc: &XmlDocument,
    ) -> MphotoResult<()> {
        Err(MphotoError::Unimplemented(
            "Writing XMP into HEIF is not supported".to_string(),
        ))
    }

    fn format_name(&self) -> &'static str {
        "HEIF"
    }

    fn mime_type(&self) -> MimeType {
        MimeType::ImageHeic
    }
}

impl HeifHandler {
    /// Read the XMP document attached to the primary image
    ///
    /// # Returns
    ///
    /// * `Ok(Some(XmlDocument))` if exactly one XMP block describes the
    ///   primary image
    /// * `Ok(None)` if there is no such block, or more than one
    /// * `Err(MphotoError)` if the container is malformed or the XMP does
    ///   not parse
    pub fn read_xmp<R: Read + Seek>(mut reader: R) -> MphotoResult<Option<XmlDocument>> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let heif = HeifDocument::from_bytes(&data)?;
        let candidates: Vec<u32> = heif
            .metadata_block_ids(ITEM_TYPE_MIME)
            .into_iter()
            .filter(|&id| heif.metadata_block_content_type(id) == Some(XMP_CONTENT_TYPE))
            .collect();

        let [id] = candidates[..] else {
            tracing::debug!(
                candidates = candidates.len(),
                "no unique XMP block for the primary item"
            );
            return Ok(None);
        };

        let block = heif.metadata_block(id)?;
        XmlDocument::parse_bytes(&block).map(Some)
    }
}

/// Entry of the item information box
#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemInfo {
    id: u32,
    item_type: [u8; 4],
    content_type: Option<String>,
}

/// Entry of the item reference box
#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemReference {
    reference_type: [u8; 4],
    from_item_id: u32,
    to_item_ids: Vec<u32>,
}

/// Entry of the item location box
#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemLocation {
    item_id: u32,
    construction_method: u8,
    base_offset: u64,
    /// `(offset, length)` pairs; a length of 0 runs to the end of the source
    extents: Vec<(u64, u64)>,
}

/// Read-only view of the item structure of a HEIF stream
///
/// Only the top-level `meta` box is interpreted; image data is never
/// decoded.
#[derive(Debug, Clone)]
pub struct HeifDocument<'a> {
    data: &'a [u8],
    idat: &'a [u8],
    primary_item_id: u32,
    items: Vec<ItemInfo>,
    references: Vec<ItemReference>,
    locations: Vec<ItemLocation>,
}

impl<'a> HeifDocument<'a> {
    /// Open a HEIF stream held in memory
    pub fn from_bytes(data: &'a [u8]) -> MphotoResult<Self> {
        let ftyp = read_box(data, 0)?;
        if ftyp.box_type != *FTYP_BOX {
            return Err(MphotoError::InvalidArgument(
                "Not a valid HEIF stream: missing ftyp box".to_string(),
            ));
        }

        // Top-level boxes after meta are never needed, and a motion photo
        // appends its video there
        let mut offset = ftyp.end_offset();
        let meta = loop {
            if offset >= data.len() as u64 {
                return Err(MphotoError::InvalidArgument(
                    "HEIF stream has no meta box".to_string(),
                ));
            }
            let current = read_box(data, offset)?;
            if current.box_type == *META_BOX {
                break current;
            }
            offset = current.end_offset();
        };

        let meta_data = box_data(data, &meta);
        let mut reader = ByteReader::new(meta_data);
        reader.read_full_box_header()?;
        let children_data = &meta_data[reader.position()..];

        let mut document = Self {
            data,
            idat: &[],
            primary_item_id: 0,
            items: Vec::new(),
            references: Vec::new(),
            locations: Vec::new(),
        };
        let mut primary = None;

        for child in read_boxes(children_data)? {
            let content = box_data(children_data, &child);
            match &child.box_type {
                BOX_TYPE_PITM => primary = Some(Self::parse_pitm(content)?),
                BOX_TYPE_IINF => document.items = Self::parse_iinf(content)?,
                BOX_TYPE_IREF => document.references = Self::parse_iref(content)?,
                BOX_TYPE_ILOC => document.locations = Self::parse_iloc(content)?,
                BOX_TYPE_IDAT => document.idat = content,
                _ => {}
            }
        }

        document.primary_item_id = primary.ok_or_else(|| {
            MphotoError::InvalidArgument("HEIF stream has no primary item".to_string())
        })?;

        tracing::debug!(
            primary_item = document.primary_item_id,
            items = document.items.len(),
            "opened HEIF item structure"
        );
        Ok(document)
    }

    /// ID of the primary image item
    pub fn primary_item_id(&self) -> u32 {
        self.primary_item_id
    }

    /// IDs of the items of `item_type` that describe the primary item
    pub fn metadata_block_ids(&self, item_type: &str) -> Vec<u32> {
        self.items
            .iter()
            .filter(|item| item.item_type == item_type.as_bytes())
            .filter(|item| self.describes_primary(item.id))
            .map(|item| item.id)
            .collect()
    }

    /// Content type of a metadata item, for `mime` items
    pub fn metadata_block_content_type(&self, item_id: u32) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .and_then(|item| item.content_type.as_deref())
    }

    /// Read the payload of an item, concatenating all of its extents
    pub fn metadata_block(&self, item_id: u32) -> MphotoResult<Vec<u8>> {
        let location = self
            .locations
            .iter()
            .find(|location| location.item_id == item_id)
            .ok_or_else(|| {
                MphotoError::InvalidArgument(format!("Item {} has no location", item_id))
            })?;

        let source = match location.construction_method {
            0 => self.data,
            1 => self.idat,
            method => {
                return Err(MphotoError::InvalidArgument(format!(
                    "Unsupported item construction method: {}",
                    method
                )))
            }
        };

        let mut block = Vec::new();
        for &(offset, length) in &location.extents {
            let start = location
                .base_offset
                .checked_add(offset)
                .filter(|&start| start <= source.len() as u64)
                .ok_or_else(|| Self::out_of_bounds(item_id))?;
            let end = if length == 0 {
                source.len() as u64
            } else {
                start
                    .checked_add(length)
                    .filter(|&end| end <= source.len() as u64)
                    .ok_or_else(|| Self::out_of_bounds(item_id))?
            };
            block.extend_from_slice(&source[start as usize..end as usize]);
        }
        Ok(block)
    }

    fn describes_primary(&self, item_id: u32) -> bool {
        self.references.iter().any(|reference| {
            reference.reference_type == *REFERENCE_CDSC
                && reference.from_item_id == item_id
                && reference.to_item_ids.contains(&self.primary_item_id)
        })
    }

    fn out_of_bounds(item_id: u32) -> MphotoError {
        MphotoError::InvalidArgument(format!("Item {} extends past its source", item_id))
    }

    /// Parse pitm (Primary Item Box)
    fn parse_pitm(content: &[u8]) -> MphotoResult<u32> {
        let mut reader = ByteReader::new(content);
        let (version, _) = reader.read_full_box_header()?;
        if version == 0 {
            reader.read_u16().map(u32::from)
        } else {
            reader.read_u32()
        }
    }

    /// Parse iinf (Item Information Box)
    fn parse_iinf(content: &[u8]) -> MphotoResult<Vec<ItemInfo>> {
        let mut reader = ByteReader::new(content);
        let (version, _) = reader.read_full_box_header()?;
        // entry_count is informative; the infe boxes themselves are authoritative
        if version == 0 {
            reader.read_u16()?;
        } else {
            reader.read_u32()?;
        }

        let entries_data = &content[reader.position()..];
        let mut items = Vec::new();
        for entry in read_boxes(entries_data)? {
            if entry.box_type == *BOX_TYPE_INFE {
                items.push(Self::parse_infe(box_data(entries_data, &entry))?);
            }
        }
        Ok(items)
    }

    /// Parse infe (Item Information Entry)
    fn parse_infe(content: &[u8]) -> MphotoResult<ItemInfo> {
        let mut reader = ByteReader::new(content);
        let (version, _) = reader.read_full_box_header()?;

        if version < 2 {
            // Version 0 and 1 entries carry no item type; every item is a
            // mime-typed payload
            let id = reader.read_u16()? as u32;
            reader.read_u16()?; // protection index
            reader.read_cstring()?; // item name
            let content_type = reader.read_cstring()?;
            return Ok(ItemInfo {
                id,
                item_type: *b"mime",
                content_type: Some(content_type),
            });
        }

        let id = if version == 2 {
            reader.read_u16()? as u32
        } else {
            reader.read_u32()?
        };
        reader.read_u16()?; // protection index
        let item_type = reader.read_fourcc()?;
        reader.read_cstring()?; // item name

        let content_type = if &item_type == b"mime" {
            Some(reader.read_cstring()?)
        } else {
            None
        };

        Ok(ItemInfo {
            id,
            item_type,
            content_type,
        })
    }

    /// Parse iref (Item Reference Box)
    fn parse_iref(content: &[u8]) -> MphotoResult<Vec<ItemReference>> {
        let mut reader = ByteReader::new(content);
        let (version, _) = reader.read_full_box_header()?;
        let read_id = |reader: &mut ByteReader<'_>| -> MphotoResult<u32> {
            if version == 0 {
                reader.read_u16().map(u32::from)
            } else {
                reader.read_u32()
            }
        };

        let references_data = &content[reader.position()..];
        let mut references = Vec::new();
        for reference in read_boxes(references_data)? {
            let mut entry = ByteReader::new(box_data(references_data, &reference));
            let from_item_id = read_id(&mut entry)?;
            let count = entry.read_u16()?;
            let mut to_item_ids = Vec::with_capacity(count as usize);
            for _ in 0..count {
                to_item_ids.push(read_id(&mut entry)?);
            }
            references.push(ItemReference {
                reference_type: reference.box_type,
                from_item_id,
                to_item_ids,
            });
        }
        Ok(references)
    }

    /// Parse iloc (Item Location Box)
    fn parse_iloc(content: &[u8]) -> MphotoResult<Vec<ItemLocation>> {
        let mut reader = ByteReader::new(content);
        let (version, _) = reader.read_full_box_header()?;
        if version > 2 {
            return Err(MphotoError::InvalidArgument(format!(
                "Unsupported iloc version: {}",
                version
            )));
        }

        // offset_size(4) + length_size(4) + base_offset_size(4) + index_size(4)
        let sizes = reader.read_u8()?;
        let offset_size = sizes >> 4;
        let length_size = sizes & 0x0F;
        let sizes = reader.read_u8()?;
        let base_offset_size = sizes >> 4;
        let index_size = if version == 0 { 0 } else { sizes & 0x0F };

        let item_count = if version < 2 {
            reader.read_u16()? as u32
        } else {
            reader.read_u32()?
        };

        let mut locations = Vec::new();
        for _ in 0..item_count {
            let item_id = if version < 2 {
                reader.read_u16()? as u32
            } else {
                reader.read_u32()?
            };
            let construction_method = if version == 0 {
                0
            } else {
                (reader.read_u16()? & 0x000F) as u8
            };
            reader.read_u16()?; // data reference index
            let base_offset = reader.read_sized_uint(base_offset_size)?;

            let extent_count = reader.read_u16()?;
            let mut extents = Vec::with_capacity(extent_count as usize);
            for _ in 0..extent_count {
                reader.read_sized_uint(index_size)?;
                let offset = reader.read_sized_uint(offset_size)?;
                let length = reader.read_sized_uint(length_size)?;
                extents.push((offset, length));
            }

            locations.push(ItemLocation {
                item_id,
                construction_method,
                base_offset,
                extents,
            });
        }

        Ok(locations)
    }
}

impl HeifDocument<'_> {
    /// Item types present in the stream, for diagnostics
    pub fn item_types(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| fourcc_str(&item.item_type))
            .collect()
    }
}

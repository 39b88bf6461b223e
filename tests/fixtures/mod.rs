//! Synthetic media builders shared by the integration tests
//!
//! The streams are structurally valid for everything the crate inspects
//! (markers, boxes, item tables) but carry no decodable image or video.

#![allow(dead_code)]

/// XMP identifier of a JPEG APP1 segment
pub const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Content type of HEIF XMP items
pub const XMP_CONTENT_TYPE: &str = "application/rdf+xml";

// ============================================================================
// JPEG
// ============================================================================

/// A JPEG marker segment
pub fn segment(marker: u8, content: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, marker];
    data.extend_from_slice(&((content.len() + 2) as u16).to_be_bytes());
    data.extend_from_slice(content);
    data
}

/// A JPEG without XMP: SOI, APP0, DQT, SOS with scan data, EOI
pub fn jpeg_still() -> Vec<u8> {
    jpeg_with_app1(None)
}

/// A JPEG whose APP1 segment carries `xmp`
pub fn jpeg_with_xmp(xmp: &str) -> Vec<u8> {
    let mut content = XMP_SIGNATURE.to_vec();
    content.extend_from_slice(xmp.as_bytes());
    jpeg_with_app1(Some(content))
}

fn jpeg_with_app1(app1: Option<Vec<u8>>) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend(segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
    if let Some(content) = app1 {
        data.extend(segment(0xE1, &content));
    }
    data.extend(segment(0xDB, &[0x01; 65]));
    data.extend(segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]));
    // Entropy-coded data, with a stuffed 0xFF
    data.extend_from_slice(&[0x12, 0x34, 0xFF, 0x00, 0x56, 0x78]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

// ============================================================================
// MP4
// ============================================================================

/// An MP4 of exactly `len` bytes (at least 32): `ftyp` then `mdat`
pub fn mp4_video(len: usize) -> Vec<u8> {
    assert!(len >= 32, "an MP4 needs at least 32 bytes");
    let mut data = Vec::with_capacity(len);
    data.extend_from_slice(&24u32.to_be_bytes());
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&0x200u32.to_be_bytes());
    data.extend_from_slice(b"isommp42");
    data.extend_from_slice(&((len - 24) as u32).to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend((0..len - 32).map(|i| (i % 251) as u8));
    data
}

// ============================================================================
// HEIC
// ============================================================================

fn make_box(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(box_type);
    data.extend_from_slice(payload);
    data
}

fn make_full_box(box_type: &[u8; 4], version: u8, payload: &[u8]) -> Vec<u8> {
    let mut content = vec![version, 0, 0, 0];
    content.extend_from_slice(payload);
    make_box(box_type, &content)
}

/// `meta` box with an `hvc1` primary item (ID 1) and, optionally, an XMP
/// item (ID 2) describing it. Both items live in `mdat` at `mdat_start`.
fn heic_meta(image_len: usize, xmp_len: Option<usize>, mdat_start: u32) -> Vec<u8> {
    let mut children = Vec::new();

    let mut hdlr = vec![0u8; 4];
    hdlr.extend_from_slice(b"pict");
    hdlr.extend_from_slice(&[0u8; 13]);
    children.extend(make_full_box(b"hdlr", 0, &hdlr));
    children.extend(make_full_box(b"pitm", 0, &1u16.to_be_bytes()));

    let item_count: u16 = if xmp_len.is_some() { 2 } else { 1 };
    let mut iinf = item_count.to_be_bytes().to_vec();
    let mut infe = vec![0, 1, 0, 0];
    infe.extend_from_slice(b"hvc1");
    infe.push(0);
    iinf.extend(make_full_box(b"infe", 2, &infe));
    if xmp_len.is_some() {
        let mut infe = vec![0, 2, 0, 0];
        infe.extend_from_slice(b"mime");
        infe.push(0);
        infe.extend_from_slice(XMP_CONTENT_TYPE.as_bytes());
        infe.push(0);
        iinf.extend(make_full_box(b"infe", 2, &infe));
    }
    children.extend(make_full_box(b"iinf", 0, &iinf));

    if xmp_len.is_some() {
        // cdsc: item 2 describes item 1
        let iref = make_box(b"cdsc", &[0, 2, 0, 1, 0, 1]);
        children.extend(make_full_box(b"iref", 0, &iref));
    }

    let mut iloc = vec![0x44, 0x00];
    iloc.extend_from_slice(&item_count.to_be_bytes());
    let mut push_location = |id: u16, offset: u32, length: usize| {
        iloc.extend_from_slice(&id.to_be_bytes());
        iloc.extend_from_slice(&[0, 0]); // data reference index
        iloc.extend_from_slice(&1u16.to_be_bytes());
        iloc.extend_from_slice(&offset.to_be_bytes());
        iloc.extend_from_slice(&(length as u32).to_be_bytes());
    };
    push_location(1, mdat_start, image_len);
    if let Some(xmp_len) = xmp_len {
        push_location(2, mdat_start + image_len as u32, xmp_len);
    }
    children.extend(make_full_box(b"iloc", 0, &iloc));

    make_full_box(b"meta", 0, &children)
}

/// A HEIC still, with `xmp` stored as a metadata item of the primary image
pub fn heic_still(xmp: Option<&str>) -> Vec<u8> {
    let image = vec![0x26u8; 64];

    let mut ftyp = b"heic".to_vec();
    ftyp.extend_from_slice(&[0, 0, 0, 0]);
    ftyp.extend_from_slice(b"mif1heic");
    let ftyp = make_box(b"ftyp", &ftyp);

    let xmp_len = xmp.map(str::len);
    // Offsets are fixed-width, so the meta size does not depend on them
    let meta_len = heic_meta(image.len(), xmp_len, 0).len();
    let mdat_start = (ftyp.len() + meta_len + 8) as u32;
    let meta = heic_meta(image.len(), xmp_len, mdat_start);

    let mut mdat = image;
    if let Some(xmp) = xmp {
        mdat.extend_from_slice(xmp.as_bytes());
    }

    let mut data = ftyp;
    data.extend(meta);
    data.extend(make_box(b"mdat", &mdat));
    data
}

/// Header of the `mpvd` box wrapping `video_len` bytes of video
pub fn mpvd_header(video_len: usize) -> Vec<u8> {
    let mut data = 1u32.to_be_bytes().to_vec();
    data.extend_from_slice(b"mpvd");
    data.extend_from_slice(&(16 + video_len as u64).to_be_bytes());
    data
}

// ============================================================================
// XMP
// ============================================================================

/// Motion Photo XMP, flag and version 1, timestamp 0
pub fn motion_photo_xmp(still_mime: &str, video_length: usize, padding: Option<usize>) -> String {
    let padding = padding
        .map(|padding| format!(r#" Item:Padding="{}""#, padding))
        .unwrap_or_default();
    format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Adobe XMP Core 5.1.0-jc003">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:Camera="http://ns.google.com/photos/1.0/camera/"
        xmlns:Container="http://ns.google.com/photos/1.0/container/"
        xmlns:Item="http://ns.google.com/photos/1.0/container/item/"
        Camera:MotionPhoto="1"
        Camera:MotionPhotoVersion="1"
        Camera:MotionPhotoPresentationTimestampUs="0">
      <Container:Directory>
        <rdf:Seq>
          <rdf:li rdf:parseType="Resource">
            <Container:Item Item:Semantic="Primary" Item:Mime="{still_mime}"{padding}/>
          </rdf:li>
          <rdf:li rdf:parseType="Resource">
            <Container:Item Item:Semantic="MotionPhoto" Item:Mime="video/mp4" Item:Length="{video_length}"/>
          </rdf:li>
        </rdf:Seq>
      </Container:Directory>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#
    )
}

/// Microvideo XMP, flag and version 1
pub fn microvideo_xmp(offset: usize, timestamp_us: i64) -> String {
    format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:GCamera="http://ns.google.com/photos/1.0/camera/"
        GCamera:MicroVideo="1"
        GCamera:MicroVideoVersion="1"
        GCamera:MicroVideoOffset="{offset}"
        GCamera:MicroVideoPresentationTimestampUs="{timestamp_us}"/>
  </rdf:RDF>
</x:xmpmeta>"#
    )
}

// ============================================================================
// Motion photos
// ============================================================================

/// A JPEG motion photo built around `xmp`
pub fn jpeg_motion_photo_with_xmp(xmp: &str, video: &[u8]) -> Vec<u8> {
    let mut data = jpeg_with_xmp(xmp);
    data.extend_from_slice(video);
    data
}

/// A JPEG Motion Photo with no padding
pub fn jpeg_motion_photo(video: &[u8]) -> Vec<u8> {
    let xmp = motion_photo_xmp("image/jpeg", video.len(), None);
    jpeg_motion_photo_with_xmp(&xmp, video)
}

/// A HEIC Motion Photo: still, `mpvd` header, video
pub fn heic_motion_photo(video: &[u8]) -> Vec<u8> {
    let xmp = motion_photo_xmp("image/heic", video.len(), Some(16));
    let mut data = heic_still(Some(&xmp));
    data.extend(mpvd_header(video.len()));
    data.extend_from_slice(video);
    data
}

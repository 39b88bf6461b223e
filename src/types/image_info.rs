//! Motion photo metadata record

use crate::types::mime_type::MimeType;
use std::fmt;

/// Metadata describing the layout of a motion photo
///
/// Built by [`crate::Demuxer`] from the embedded XMP and validated against
/// the container bytes before it is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageInfo {
    /// 1 if the file is a motion photo
    pub motion_photo: i32,
    /// File format version of the motion photo
    pub motion_photo_version: i32,
    /// Presentation timestamp, in microseconds, of the video frame matching
    /// the still. -1 means unset.
    pub presentation_timestamp_us: i64,
    /// Mime type of the still image
    pub still_mime_type: MimeType,
    /// Mime type of the video
    pub video_mime_type: MimeType,
    /// Byte length of the video, counted from the end of the file
    pub video_length: u64,
    /// Bytes between the end of the still and the start of the video
    pub still_padding: u64,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            motion_photo: 0,
            motion_photo_version: 0,
            presentation_timestamp_us: -1,
            still_mime_type: MimeType::Unknown,
            video_mime_type: MimeType::Unknown,
            video_length: 0,
            still_padding: 0,
        }
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Motion Photo: {}", self.motion_photo)?;
        writeln!(f, "Motion Photo Version: {}", self.motion_photo_version)?;
        writeln!(
            f,
            "Motion Photo Presentation Timestamp Us: {}",
            self.presentation_timestamp_us
        )?;
        writeln!(f, "Image Mime Type: {}", self.still_mime_type)?;
        writeln!(f, "Video Mime Type: {}", self.video_mime_type)?;
        writeln!(f, "Video Length: {}", self.video_length)?;
        writeln!(f, "Image Padding: {}", self.still_padding)
    }
}

//! Motion photo remuxer
//!
//! A [`Remuxer`] combines a still image and an MP4 video into a motion
//! photo: it updates (or creates) the XMP of the still so that it describes
//! the video, then lays the streams out as still, padding, video.

use crate::core::error::{MphotoError, MphotoResult};
use crate::files::formats::bmff::mpvd_box_header;
use crate::files::mime::classify;
use crate::files::xmp_io::XmpIoHelper;
use crate::schema::{MPhotoFormat, SchemaResolver};
use crate::types::{ImageInfo, MimeType};

/// Builds a motion photo from a still image and a video
///
/// # Example
///
/// ```no_run
/// use mphotokit::Remuxer;
///
/// let mut remuxer = Remuxer::new();
/// remuxer.set_still(std::fs::read("still.jpg")?, 500_000)?;
/// remuxer.set_video(std::fs::read("video.mp4")?)?;
/// std::fs::write("motion.jpg", remuxer.finalize()?)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct Remuxer {
    still: Option<Still>,
    video: Option<Vec<u8>>,
}

#[derive(Debug)]
struct Still {
    bytes: Vec<u8>,
    helper: XmpIoHelper,
    presentation_timestamp_us: i64,
}

impl Remuxer {
    /// Create a remuxer with no still or video set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the still image (JPEG or HEIC) and the presentation timestamp,
    /// in microseconds, of the video frame it corresponds to
    ///
    /// On error the previously set still is kept.
    pub fn set_still(
        &mut self,
        bytes: impl Into<Vec<u8>>,
        presentation_timestamp_us: i64,
    ) -> MphotoResult<()> {
        let bytes = bytes.into();
        let helper = XmpIoHelper::for_stream(&bytes).ok_or_else(|| {
            MphotoError::InvalidArgument("Still cannot be parsed as a JPEG or HEIC".to_string())
        })?;
        self.still = Some(Still {
            bytes,
            helper,
            presentation_timestamp_us,
        });
        Ok(())
    }

    /// Set the video, which must be an MP4
    ///
    /// On error the previously set video is kept.
    pub fn set_video(&mut self, bytes: impl Into<Vec<u8>>) -> MphotoResult<()> {
        let bytes = bytes.into();
        let mime = classify(&bytes);
        if mime != MimeType::VideoMp4 {
            return Err(MphotoError::InvalidArgument(format!(
                "Video must be {}, found {}",
                MimeType::VideoMp4,
                mime
            )));
        }
        self.video = Some(bytes);
        Ok(())
    }

    /// Build the motion photo
    ///
    /// # Errors
    ///
    /// * `FailedPrecondition` unless both the still and the video are set
    /// * `InvalidArgument` if the still carries Microvideo metadata but is
    ///   not a JPEG
    /// * `Unimplemented` for HEIC stills, whose XMP cannot be written back
    pub fn finalize(&self) -> MphotoResult<Vec<u8>> {
        let (still, video) = match (&self.still, &self.video) {
            (Some(still), Some(video)) => (still, video),
            _ => {
                return Err(MphotoError::FailedPrecondition(
                    "Both a still and a video must be set".to_string(),
                ))
            }
        };

        let still_mime = still.helper.mime_type();
        let padding = Self::still_padding(still_mime, video.len() as u64);
        let resolver = SchemaResolver::new()?;

        let mut doc = match still.helper.get_xmp(&still.bytes) {
            Ok(Some(doc)) => doc,
            Ok(None) => resolver.default_document()?,
            Err(MphotoError::ParseError(e)) => {
                tracing::warn!(error = %e, "replacing unparsable XMP of the still");
                resolver.default_document()?
            }
            Err(e) => return Err(e),
        };

        let info = ImageInfo {
            motion_photo: 1,
            motion_photo_version: 1,
            presentation_timestamp_us: still.presentation_timestamp_us,
            still_mime_type: still_mime,
            video_mime_type: MimeType::VideoMp4,
            video_length: video.len() as u64,
            still_padding: padding.len() as u64,
        };

        let format = match resolver.detect_format(&doc)? {
            MPhotoFormat::Microvideo if still_mime != MimeType::ImageJpeg => {
                return Err(MphotoError::InvalidArgument(format!(
                    "Microvideo metadata requires a JPEG still, found {}",
                    still_mime
                )))
            }
            MPhotoFormat::Microvideo => MPhotoFormat::Microvideo,
            MPhotoFormat::MotionPhoto | MPhotoFormat::None => MPhotoFormat::MotionPhoto,
        };
        resolver.write_fields(&mut doc, format, &info)?;

        let updated_still = still.helper.set_xmp(&doc, &still.bytes)?;

        let mut motion_photo =
            Vec::with_capacity(updated_still.len() + padding.len() + video.len());
        motion_photo.extend_from_slice(&updated_still);
        motion_photo.extend_from_slice(&padding);
        motion_photo.extend_from_slice(video);

        tracing::debug!(
            %format,
            still = updated_still.len(),
            padding = padding.len(),
            video = video.len(),
            "finalized motion photo"
        );
        Ok(motion_photo)
    }

    /// Bytes placed between the still and the video
    fn still_padding(still_mime: MimeType, video_len: u64) -> Vec<u8> {
        match still_mime {
            MimeType::ImageHeic => mpvd_box_header(video_len).to_vec(),
            _ => Vec::new(),
        }
    }
}

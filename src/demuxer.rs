//! Motion photo demuxer
//!
//! A [`Demuxer`] takes a complete motion photo, recovers its metadata from
//! the embedded XMP, checks that metadata against the bytes it describes,
//! and then hands out the still and video streams as borrowed slices.

use crate::core::error::{MphotoError, MphotoResult};
use crate::files::mime::classify;
use crate::files::xmp_io::XmpIoHelper;
use crate::schema::SchemaResolver;
use crate::types::ImageInfo;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

/// Splits a motion photo into its still image and video
///
/// # Example
///
/// ```no_run
/// use mphotokit::Demuxer;
///
/// let mut demuxer = Demuxer::new();
/// demuxer.init(std::fs::read("PXL_20201020_123456.MP.jpg")?)?;
/// println!("{}", demuxer.info()?);
/// std::fs::write("video.mp4", demuxer.video()?)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct Demuxer {
    state: Option<Ready>,
}

/// A validated motion photo
#[derive(Debug)]
struct Ready {
    bytes: Vec<u8>,
    info: ImageInfo,
}

impl Demuxer {
    /// Create a demuxer with no motion photo loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a motion photo file and initialize a demuxer with it
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open<P: AsRef<Path>>(path: P) -> MphotoResult<Self> {
        let bytes = std::fs::read(path)?;
        let mut demuxer = Self::new();
        demuxer.init(bytes)?;
        Ok(demuxer)
    }

    /// Load and validate a motion photo
    ///
    /// Any previously loaded motion photo is discarded first, so a failed
    /// call leaves the demuxer uninitialized.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if the still format is not recognized, the XMP is
    ///   missing or unparsable, or the metadata contradicts the content
    /// * `NotFound` if a required metadata field is absent
    /// * `IncorrectType` if a numeric metadata field does not parse
    pub fn init(&mut self, bytes: impl Into<Vec<u8>>) -> MphotoResult<()> {
        self.state = None;
        let bytes = bytes.into();
        let info = Self::inspect(&bytes)?;
        tracing::debug!(
            total = bytes.len(),
            video_length = info.video_length,
            still_padding = info.still_padding,
            "motion photo ready"
        );
        self.state = Some(Ready { bytes, info });
        Ok(())
    }

    /// Check whether a motion photo is loaded
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// Metadata of the loaded motion photo
    pub fn info(&self) -> MphotoResult<ImageInfo> {
        Ok(self.ready()?.info)
    }

    /// The still image: everything before the padding and the video
    pub fn still(&self) -> MphotoResult<&[u8]> {
        let ready = self.ready()?;
        let end = ready.bytes.len() as u64 - ready.info.video_length - ready.info.still_padding;
        Ok(&ready.bytes[..end as usize])
    }

    /// The video: the trailing `video_length` bytes
    pub fn video(&self) -> MphotoResult<&[u8]> {
        let ready = self.ready()?;
        let start = ready.bytes.len() as u64 - ready.info.video_length;
        Ok(&ready.bytes[start as usize..])
    }

    fn ready(&self) -> MphotoResult<&Ready> {
        self.state.as_ref().ok_or_else(|| {
            MphotoError::FailedPrecondition("Demuxer has not been initialized".to_string())
        })
    }

    fn inspect(bytes: &[u8]) -> MphotoResult<ImageInfo> {
        let mime = classify(bytes);
        let helper = XmpIoHelper::for_mime(mime).ok_or_else(|| {
            MphotoError::InvalidArgument(format!("Unrecognized still image format: {}", mime))
        })?;

        let doc = match helper.get_xmp(bytes) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                return Err(MphotoError::InvalidArgument(
                    "No XMP metadata found".to_string(),
                ))
            }
            Err(MphotoError::ParseError(e)) => {
                return Err(MphotoError::InvalidArgument(format!(
                    "XMP metadata does not parse: {}",
                    e
                )))
            }
            Err(e) => return Err(e),
        };

        let resolver = SchemaResolver::new()?;
        let format = resolver.detect_format(&doc)?;
        let info = resolver.read_fields(&doc, format)?;
        Self::validate(bytes, &info)?;
        Ok(info)
    }

    fn validate(bytes: &[u8], info: &ImageInfo) -> MphotoResult<()> {
        let total = bytes.len() as u64;

        if info.motion_photo != 1 {
            return Err(Self::mismatch(format!(
                "Motion photo flag is {}",
                info.motion_photo
            )));
        }
        if info.video_length == 0 || info.video_length > total {
            return Err(Self::mismatch(format!(
                "Video length {} does not fit in {} bytes",
                info.video_length, total
            )));
        }
        let fits = info
            .video_length
            .checked_add(info.still_padding)
            .is_some_and(|len| len <= total);
        if !fits {
            return Err(Self::mismatch(format!(
                "Video length {} plus padding {} does not fit in {} bytes",
                info.video_length, info.still_padding, total
            )));
        }
        if !info.still_mime_type.is_known() || !info.video_mime_type.is_known() {
            return Err(Self::mismatch(format!(
                "Unknown stream type (still {}, video {})",
                info.still_mime_type, info.video_mime_type
            )));
        }

        let still_end = (total - info.video_length - info.still_padding) as usize;
        let still_mime = classify(&bytes[..still_end]);
        if still_mime != info.still_mime_type {
            return Err(Self::mismatch(format!(
                "Still is declared {} but contains {}",
                info.still_mime_type, still_mime
            )));
        }

        let video_start = (total - info.video_length) as usize;
        let video_mime = classify(&bytes[video_start..]);
        if video_mime != info.video_mime_type {
            return Err(Self::mismatch(format!(
                "Video is declared {} but contains {}",
                info.video_mime_type, video_mime
            )));
        }

        Ok(())
    }

    fn mismatch(message: String) -> MphotoError {
        tracing::warn!(%message, "metadata contradicts content");
        MphotoError::InvalidArgument(message)
    }
}

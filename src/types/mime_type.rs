//! Mime types of motion photo streams

use std::fmt;

/// Mime type of a still or video stream inside a motion photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MimeType {
    /// Unrecognized content
    #[default]
    Unknown,
    /// JPEG still image
    ImageJpeg,
    /// HEIC (HEIF-family) still image
    ImageHeic,
    /// MP4-family video
    VideoMp4,
}

impl MimeType {
    /// Get the canonical mime string
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Unknown => "unknown",
            MimeType::ImageJpeg => "image/jpeg",
            MimeType::ImageHeic => "image/heic",
            MimeType::VideoMp4 => "video/mp4",
        }
    }

    /// Map an `Item:Mime` string to a mime type
    ///
    /// Matching is case-insensitive and `image/jpg` is accepted as an alias.
    /// Anything unrecognized is [`MimeType::Unknown`].
    pub fn from_mime_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => MimeType::ImageJpeg,
            "image/heic" => MimeType::ImageHeic,
            "video/mp4" => MimeType::VideoMp4,
            _ => MimeType::Unknown,
        }
    }

    /// Check if this is a recognized mime type
    pub fn is_known(&self) -> bool {
        !matches!(self, MimeType::Unknown)
    }

    /// Check if this is a still image mime type
    pub fn is_image(&self) -> bool {
        matches!(self, MimeType::ImageJpeg | MimeType::ImageHeic)
    }

    /// Usual file extension for this mime type
    pub fn extension(&self) -> &'static str {
        match self {
            MimeType::Unknown => "bin",
            MimeType::ImageJpeg => "jpg",
            MimeType::ImageHeic => "heic",
            MimeType::VideoMp4 => "mp4",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for MimeType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::de::Deserialize<'de> for MimeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let s = <String as serde::de::Deserialize>::deserialize(deserializer)?;
        Ok(MimeType::from_mime_str(&s))
    }
}

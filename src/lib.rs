//! # MPhotoKit
//!
//! Pure Rust demuxer and remuxer for motion photos: a still image (JPEG or
//! HEIC) followed by a short MP4 video in a single file, described by XMP
//! metadata embedded in the still.
//!
//! Both metadata schemas found in the wild are supported: Motion Photo
//! (`Camera:MotionPhoto` with a `Container:Directory` item list) and the
//! deprecated Microvideo (`GCamera:MicroVideo*`).
//!
//! ## Demuxing
//!
//! ```no_run
//! use mphotokit::Demuxer;
//!
//! let demuxer = Demuxer::open("PXL_20201020_123456.MP.jpg")?;
//! let info = demuxer.info()?;
//! println!("{}", info);
//! std::fs::write(format!("still.{}", info.still_mime_type.extension()), demuxer.still()?)?;
//! std::fs::write("video.mp4", demuxer.video()?)?;
//! # Ok::<(), mphotokit::MphotoError>(())
//! ```
//!
//! ## Remuxing
//!
//! ```no_run
//! use mphotokit::Remuxer;
//!
//! let mut remuxer = Remuxer::new();
//! remuxer.set_still(std::fs::read("still.jpg")?, 500_000)?;
//! remuxer.set_video(std::fs::read("video.mp4")?)?;
//! let motion_photo = remuxer.finalize()?;
//! # Ok::<(), mphotokit::MphotoError>(())
//! ```
//!
//! ## Features
//!
//! - `jpeg`, `heif` (default): XMP handlers for JPEG and HEIC stills
//! - `serde`: `Serialize`/`Deserialize` for [`ImageInfo`], [`MimeType`] and
//!   [`MPhotoFormat`]

pub mod core;
pub mod demuxer;
pub mod files;
pub mod remuxer;
pub mod schema;
pub mod types;

pub use crate::core::error::{ErrorKind, MphotoError, MphotoResult};
pub use crate::core::node::XmlDocument;
pub use crate::demuxer::Demuxer;
pub use crate::files::mime::classify;
pub use crate::files::xmp_io::XmpIoHelper;
pub use crate::remuxer::Remuxer;
pub use crate::schema::{MPhotoFormat, SchemaResolver};
pub use crate::types::{ImageInfo, MimeType};

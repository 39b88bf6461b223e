//! Still image and video stream support
//!
//! This module classifies raw streams and reads or replaces the XMP
//! document embedded in a still image. All implementations are pure Rust and
//! operate on in-memory buffers.

pub mod formats;
pub mod handler;
pub mod mime;
pub mod xmp_io;

#[cfg(feature = "heif")]
pub use formats::bmff::{HeifDocument, HeifHandler};
#[cfg(feature = "jpeg")]
pub use formats::jpeg::JpegHandler;
pub use handler::XmpHandler;
pub use mime::classify;
pub use xmp_io::XmpIoHelper;

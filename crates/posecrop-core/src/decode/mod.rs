//! Image reading for the crop pipeline.
//!
//! This module provides functionality for:
//! - Reading image extents without decoding pixel data
//! - Decoding source images to RGB with EXIF orientation applied
//! - Verifying that a cached output image is readable
//! - Shrinking linear-light images before the main warp
//!
//! # Orientation
//!
//! Extents and pixels are both reported after EXIF orientation is applied,
//! so a bounding box annotated on the displayed image lines up with the
//! decoded pixels.
//!
//! # Examples
//!
//! ```ignore
//! use posecrop_core::decode::{image_extents, read_image};
//!
//! let (w, h) = image_extents("frame_000123.jpg".as_ref())?;
//! let image = read_image("frame_000123.jpg".as_ref())?;
//! assert_eq!(image.dimensions(), (w, h));
//! ```

mod read;
mod resize;
mod types;

pub use read::{decode_image_bytes, image_extents, is_image_readable, read_image};
pub use resize::resize_by_factor;
pub use types::{DecodeError, Orientation};

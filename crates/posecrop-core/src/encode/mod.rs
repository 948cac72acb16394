//! Image writing for the crop pipeline.
//!
//! This module provides functionality for:
//! - Encoding RGB pixels to JPEG with configurable quality
//! - Writing an image to disk in the format implied by its extension,
//!   creating parent directories as needed
//!
//! # Examples
//!
//! ```ignore
//! use posecrop_core::encode::write_image;
//!
//! write_image("crops/h36m/S1/000123.jpg".as_ref(), &cropped, 95)?;
//! ```

mod jpeg;
mod write;

pub use jpeg::{encode_jpeg, EncodeError};
pub use write::{ensure_parent_dir, write_image};

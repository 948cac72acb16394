//! Person segmentation masks and their reprojection into crops.
//!
//! A mask attached to an example comes in one of three forms:
//!
//! - **Path**: an image file on disk; its red channel is the mask
//! - **Dense**: an in-memory 8-bit mask
//! - **Encoded**: a run-length encoded mask (see [`RleMask`])
//!
//! Whatever the input form, the reprojected mask is always run-length
//! encoded at the crop's resolution.
//!
//! Masks read from files tend to be soft and noisy. They are thresholded
//! low and then reduced to the connected component that best overlaps the
//! person's box. In-memory masks are assumed clean and only thresholded
//! at mid-range.

mod components;
mod rle;

pub use components::{component_with_highest_iou, label_components, Component};
pub use rle::RleMask;

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageBuffer, Luma};
use thiserror::Error;

use crate::boxes::BBox;
use crate::camera::{Camera, GeometryError};
use crate::decode::{read_image, DecodeError};
use crate::transform::{reproject_image, Interpolation};

/// Threshold for masks read from files, on the [0, 1] scale.
pub const FILE_MASK_THRESHOLD: f32 = 32.0 / 255.0;

/// Threshold for in-memory masks, on the 0-255 scale.
pub const MEMORY_MASK_THRESHOLD: f32 = 127.0;

/// Supersampling factor used when warping masks.
const MASK_ANTIALIAS_FACTOR: u32 = 2;

/// Errors that can occur while reprojecting a mask.
#[derive(Debug, Error)]
pub enum MaskError {
    /// The mask file could not be read
    #[error("Failed to read mask: {0}")]
    Read(#[from] DecodeError),

    /// The warp itself failed
    #[error("Failed to reproject mask: {0}")]
    Geometry(#[from] GeometryError),

    /// Run-length data is malformed or inconsistent with its size
    #[error("Invalid run-length mask: {0}")]
    InvalidRle(String),
}

/// A segmentation mask in one of its accepted forms.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskRepr {
    Path(PathBuf),
    Dense(GrayImage),
    Encoded(RleMask),
}

impl MaskRepr {
    /// Resolve a relative path mask against `root`. Other forms are unchanged.
    pub fn resolved(&self, root: Option<&Path>) -> MaskRepr {
        match (self, root) {
            (MaskRepr::Path(p), Some(root)) if p.is_relative() => MaskRepr::Path(root.join(p)),
            _ => self.clone(),
        }
    }
}

type MaskF = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Warp a mask from `from`'s image into the frame of `to`.
///
/// # Arguments
///
/// * `mask` - The mask, in the source image's frame
/// * `from` - Camera the source image was taken with
/// * `to` - Camera of the crop
/// * `dst_size` - Crop `(width, height)`
/// * `person_box` - The person's box in the crop, used to pick the
///   component of a file mask
///
/// # Errors
///
/// Returns `MaskError::Read` if a mask file cannot be read,
/// `MaskError::InvalidRle` for inconsistent run-length input and
/// `MaskError::Geometry` if the cameras cannot be related.
pub fn reproject_mask(
    mask: &MaskRepr,
    from: &Camera,
    to: &Camera,
    dst_size: (u32, u32),
    person_box: &BBox,
) -> Result<RleMask, MaskError> {
    match mask {
        MaskRepr::Path(path) => {
            let rgb = read_image(path)?;
            let (w, h) = rgb.dimensions();
            let soft = MaskF::from_fn(w, h, |x, y| Luma([rgb.get_pixel(x, y)[0] as f32 / 255.0]));
            let warped = warp(&soft, from, to, dst_size)?;
            let binary = threshold(&warped, FILE_MASK_THRESHOLD);
            Ok(component_with_highest_iou(&binary, person_box))
        }
        MaskRepr::Dense(dense) => warp_memory_mask(dense, from, to, dst_size),
        MaskRepr::Encoded(rle) => warp_memory_mask(&rle.decode()?, from, to, dst_size),
    }
}

fn warp_memory_mask(
    mask: &GrayImage,
    from: &Camera,
    to: &Camera,
    dst_size: (u32, u32),
) -> Result<RleMask, MaskError> {
    let (w, h) = mask.dimensions();
    let values = MaskF::from_fn(w, h, |x, y| Luma([mask.get_pixel(x, y)[0] as f32]));
    let warped = warp(&values, from, to, dst_size)?;
    Ok(RleMask::encode(&threshold(&warped, MEMORY_MASK_THRESHOLD)))
}

fn warp(mask: &MaskF, from: &Camera, to: &Camera, dst_size: (u32, u32)) -> Result<MaskF, GeometryError> {
    reproject_image(mask, from, to, dst_size, MASK_ANTIALIAS_FACTOR, Interpolation::Linear)
}

fn threshold(mask: &MaskF, level: f32) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get_pixel(x, y)[0] > level { 255 } else { 0 }])
    })
}

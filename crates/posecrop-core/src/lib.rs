//! PoseCrop Core - Camera-aware crop preprocessing for pose estimation
//!
//! This crate crops training examples around the person they show and stores
//! the crops, so that training never has to decode full-resolution frames.
//! Cropping is done by reprojection: a virtual camera is turned towards the
//! person, its lens distortion is dropped, and image, keypoints and mask are
//! all warped into its frame, which keeps them geometrically consistent.
//!
//! The entry point is [`make_efficient_example`], configured by
//! [`CropOptions`].

pub mod boxes;
pub mod camera;
pub mod color;
pub mod decode;
pub mod encode;
pub mod error;
pub mod example;
pub mod executor;
pub mod mask;
pub mod planner;
pub mod transform;

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use boxes::BBox;
pub use camera::{BrownConrady, Camera, GeometryError};
pub use error::PreprocessError;
pub use example::{Example, ImageSource, Pose};
pub use executor::{make_efficient_example, render_crop};
pub use mask::{MaskRepr, RleMask};
pub use planner::{expanded_crop_box, plan_crop, CropPlan};

/// Default JPEG quality of written crops.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Options for [`make_efficient_example`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropOptions {
    /// Extra padding around the rotation-safe box; 0 crops to the bare box.
    pub further_expansion_factor: f64,
    /// Brighten and white-balance MPI-INF-3DHP frames.
    pub image_adjustments_3dhp: bool,
    /// Cached crops modified before this time are recomputed.
    pub min_time: Option<SystemTime>,
    /// Skip examples whose source image exists but cannot be decoded.
    pub ignore_broken_image: bool,
    /// Mirror the source image before cropping.
    pub horizontal_flip: bool,
    /// Shrink the source before the warp when the crop zooms out strongly.
    pub downscale_input_for_antialias: bool,
    /// Do not clip the crop to the image bounds.
    pub extreme_perspective: bool,
    /// JPEG quality (1-100) of written crops.
    pub jpeg_quality: u8,
    /// Base directory for relative image, mask and output paths.
    pub data_root: Option<PathBuf>,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            further_expansion_factor: 1.0,
            image_adjustments_3dhp: false,
            min_time: None,
            ignore_broken_image: false,
            horizontal_flip: false,
            downscale_input_for_antialias: false,
            extreme_perspective: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            data_root: None,
        }
    }
}

impl CropOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_further_expansion_factor(mut self, factor: f64) -> Self {
        self.further_expansion_factor = factor;
        self
    }

    pub fn with_image_adjustments_3dhp(mut self, enabled: bool) -> Self {
        self.image_adjustments_3dhp = enabled;
        self
    }

    pub fn with_min_time(mut self, min_time: SystemTime) -> Self {
        self.min_time = Some(min_time);
        self
    }

    pub fn with_ignore_broken_image(mut self, enabled: bool) -> Self {
        self.ignore_broken_image = enabled;
        self
    }

    pub fn with_horizontal_flip(mut self, enabled: bool) -> Self {
        self.horizontal_flip = enabled;
        self
    }

    pub fn with_downscale_input_for_antialias(mut self, enabled: bool) -> Self {
        self.downscale_input_for_antialias = enabled;
        self
    }

    pub fn with_extreme_perspective(mut self, enabled: bool) -> Self {
        self.extreme_perspective = enabled;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CropOptions::default();
        assert_eq!(options.further_expansion_factor, 1.0);
        assert_eq!(options.jpeg_quality, 95);
        assert!(!options.ignore_broken_image);
        assert!(options.min_time.is_none());
        assert!(options.data_root.is_none());
        assert_eq!(options, CropOptions::new());
    }

    #[test]
    fn test_builders() {
        let options = CropOptions::new()
            .with_further_expansion_factor(0.0)
            .with_ignore_broken_image(true)
            .with_extreme_perspective(true)
            .with_jpeg_quality(80)
            .with_data_root("/data");
        assert_eq!(options.further_expansion_factor, 0.0);
        assert!(options.ignore_broken_image);
        assert!(options.extreme_perspective);
        assert_eq!(options.jpeg_quality, 80);
        assert_eq!(options.data_root, Some(PathBuf::from("/data")));
    }
}

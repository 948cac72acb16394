//! Planning the crop: the virtual camera and box that frame a person.
//!
//! Given the source image extents, its camera and the person's box, the
//! planner derives a new camera that looks straight at the person (no lens
//! distortion), a crop box in that camera's image, and the output size. The
//! crop is padded enough that the person stays inside it under in-plane
//! rotations of up to 30 degrees, which training-time augmentation applies.
//!
//! # Algorithm
//!
//! 1. For 3D examples, turn a copy of the camera towards the box center and
//!    drop its distortion. 2D examples use the flat camera for both.
//! 2. Reproject the box by its side midpoints, and the full image by its
//!    corners (or use an unbounded box for extreme perspective changes).
//! 3. Expand the reprojected box (see [`expanded_crop_box`]) and clip it to
//!    the reprojected image.
//! 4. Zoom so the person's longer side spans about 384 pixels, at most 1.2x.
//! 5. Move the camera's image origin to the crop's corner and scale it.

use std::f64::consts::FRAC_PI_6;

use log::debug;
use nalgebra::Vector2;

use crate::boxes::BBox;
use crate::camera::{reproject_box_corners, reproject_box_side_midpoints, Camera, GeometryError};

/// Largest in-plane rotation the padding accounts for.
pub const MAX_ROTATION: f64 = FRAC_PI_6;

/// Padding around the rotation-safe box.
pub const PADDING_FACTOR: f64 = 1.0 / 0.85;

/// Room for random translation during augmentation.
pub const SHIFT_FACTOR: f64 = 1.1;

/// Room for random zoom-out during augmentation.
pub const SCALE_DOWN_FACTOR: f64 = 1.0 / 0.85;

/// Largest zoom-in applied to the source.
pub const MAX_ZOOM_IN: f64 = 1.2;

/// Nominal output side the person's longer side is scaled against.
pub const TARGET_SIDE: f64 = 256.0;

/// Oversize factor on [`TARGET_SIDE`].
pub const TARGET_OVERSIZE: f64 = 1.5;

/// Result of planning a crop.
#[derive(Debug, Clone, PartialEq)]
pub struct CropPlan {
    /// Camera of the source image.
    pub old_camera: Camera,
    /// Camera of the crop: turned, undistorted, shifted and scaled.
    pub new_camera: Camera,
    /// Crop region in the turned camera's image, before shift and scale.
    pub crop_box: BBox,
    /// Person's box in the crop's pixels.
    pub bbox: BBox,
    /// Zoom from the turned camera's image to the crop.
    pub scale_factor: f64,
    /// Output `(width, height)` in pixels.
    pub dst_size: (u32, u32),
}

/// Plan the crop of one example.
///
/// # Arguments
///
/// * `image_size` - Source `(width, height)`
/// * `camera` - The example's camera; `None` for 2D examples
/// * `bbox` - Person's box in source pixels
/// * `further_expansion_factor` - Extra padding; `0` crops exactly to the
///   reprojected box
/// * `extreme_perspective` - Do not clip the crop to the reprojected image
///
/// # Errors
///
/// Propagates `GeometryError` when the box center cannot be looked at or a
/// box corner falls behind the turned camera.
pub fn plan_crop(
    image_size: (u32, u32),
    camera: Option<&Camera>,
    bbox: &BBox,
    further_expansion_factor: f64,
    extreme_perspective: bool,
) -> Result<CropPlan, GeometryError> {
    let full_box = BBox::full(image_size.0, image_size.1);

    let (old_camera, mut new_camera) = match camera {
        Some(camera) => {
            let mut new_camera = camera.clone();
            new_camera.turn_towards(&bbox.center())?;
            new_camera.undistort();
            (camera.clone(), new_camera)
        }
        None => (Camera::create_2d(), Camera::create_2d()),
    };

    let reprojected_box = reproject_box_side_midpoints(bbox, &old_camera, &new_camera)?;
    let reprojected_full_box = if extreme_perspective {
        BBox::unbounded()
    } else {
        reproject_box_corners(&full_box, &old_camera, &new_camera)?
    };

    let crop_box = if further_expansion_factor > 0.0 {
        expanded_crop_box(&reprojected_box, &reprojected_full_box, further_expansion_factor)
    } else {
        reprojected_box
    };

    let scale_factor = MAX_ZOOM_IN.min(TARGET_SIDE / reprojected_box.max_side() * TARGET_OVERSIZE);
    new_camera.shift_image(&Vector2::new(-crop_box.x, -crop_box.y));
    new_camera.scale_output(scale_factor);

    let bbox = reproject_box_side_midpoints(bbox, &old_camera, &new_camera)?;
    let dst_size = (
        rounded_side(scale_factor * crop_box.width),
        rounded_side(scale_factor * crop_box.height),
    );

    debug!(
        "planned crop {:?} at scale {:.4} -> {}x{}",
        crop_box, scale_factor, dst_size.0, dst_size.1
    );

    Ok(CropPlan {
        old_camera,
        new_camera,
        crop_box,
        bbox,
        scale_factor,
        dst_size,
    })
}

/// Pad `bbox` so it contains the box under any rotation up to
/// [`MAX_ROTATION`], then clip to `full_box`.
///
/// The rotation-safe square has side
/// `max(cos(a)*w + sin(a)*h, cos(a)*h + sin(a)*w)` and is centered on the box;
/// it is then grown by the padding, shift and scale-down factors and by
/// `further_expansion_factor`.
pub fn expanded_crop_box(bbox: &BBox, full_box: &BBox, further_expansion_factor: f64) -> BBox {
    let (s, c) = MAX_ROTATION.sin_cos();
    let side = (c * bbox.width + s * bbox.height).max(c * bbox.height + s * bbox.width);
    let rot_bbox = BBox::around(bbox.center(), side);
    rot_bbox
        .expand(PADDING_FACTOR * SHIFT_FACTOR * SCALE_DOWN_FACTOR * further_expansion_factor)
        .intersection(full_box)
}

/// Output side length, halves rounded to even; never zero so a degenerate
/// crop still yields an image.
fn rounded_side(v: f64) -> u32 {
    if v.is_finite() {
        v.round_ties_even().max(1.0) as u32
    } else {
        1
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

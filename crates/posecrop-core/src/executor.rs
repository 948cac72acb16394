//! Executing a crop plan: warping pixels, keypoints and masks.
//!
//! [`make_efficient_example`] is the crate's main entry point. It plans the
//! crop, writes the cropped image unless a fresh copy is already on disk, and
//! returns a new example whose box, keypoints, camera and mask all live in
//! the crop's pixel frame.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::{imageops, RgbImage};
use log::{debug, warn};

use crate::camera::reproject_image_points;
use crate::color::{linearize, to_display};
use crate::decode::{image_extents, is_image_readable, read_image, resize_by_factor};
use crate::encode::write_image;
use crate::error::PreprocessError;
use crate::example::{Example, ImageSource, Pose};
use crate::mask::{reproject_mask, MaskRepr};
use crate::planner::{plan_crop, CropPlan};
use crate::transform::{reproject_image, Interpolation};
use crate::CropOptions;

/// Supersampling factor of the main image warp.
pub const ANTIALIAS_FACTOR: u32 = 2;

/// The pre-downscale shrinks the source to this multiple of the final scale.
const PRE_DOWNSCALE_MARGIN: f64 = 4.0;

/// Crop and resize one example for efficient loading.
///
/// The cropped image is written to `new_image_path` unless that file already
/// exists, is not older than `options.min_time` and decodes cleanly.
///
/// # Arguments
///
/// * `example` - The source example; not modified
/// * `new_image_path` - Where the cropped image goes, resolved against
///   `options.data_root` if relative. The returned example stores it as given.
/// * `options` - Crop and output settings
///
/// # Returns
///
/// The transformed example, or `None` if the source image is broken and
/// `options.ignore_broken_image` is set.
///
/// # Errors
///
/// - `PreprocessError::MissingSourceImage` if the source file does not exist,
///   regardless of `ignore_broken_image`
/// - `PreprocessError::CorruptSourceImage` if it cannot be decoded
/// - `PreprocessError::Geometry` for degenerate camera geometry
/// - `PreprocessError::Mask` / `PreprocessError::Encode` for mask and
///   output failures
pub fn make_efficient_example(
    example: &Example,
    new_image_path: &Path,
    options: &CropOptions,
) -> Result<Option<Example>, PreprocessError> {
    let root = options.data_root.as_deref();

    let image_size = match source_extents(&example.image, root) {
        Ok(size) => size,
        Err(err) => return skip_or_fail(err, options),
    };

    let plan = plan_crop(
        image_size,
        example.camera(),
        &example.bbox,
        options.further_expansion_factor,
        options.extreme_perspective,
    )?;

    let new_image_abspath = resolve(root, new_image_path);
    if is_cached(&new_image_abspath, options.min_time) {
        debug!("{} is up to date", new_image_abspath.display());
    } else {
        let pixels = match source_pixels(&example.image, root) {
            Ok(pixels) => pixels,
            Err(err) => return skip_or_fail(err, options),
        };
        let cropped = render_crop(&pixels, &plan, options)?;
        write_image(&new_image_abspath, &cropped, options.jpeg_quality)?;
    }

    transform_record(example, new_image_path, &plan, root).map(Some)
}

/// Render the crop of `pixels` described by `plan` as an 8-bit image.
///
/// # Errors
///
/// Returns `PreprocessError::Geometry` if the plan's cameras cannot be
/// related.
pub fn render_crop(
    pixels: &RgbImage,
    plan: &CropPlan,
    options: &CropOptions,
) -> Result<RgbImage, PreprocessError> {
    let linear = if options.horizontal_flip {
        linearize(&imageops::flip_horizontal(pixels))
    } else {
        linearize(pixels)
    };

    let (linear, old_camera) = if options.downscale_input_for_antialias {
        let factor = (plan.scale_factor * PRE_DOWNSCALE_MARGIN).min(1.0);
        debug!("downscaling input by {:.4} before warping", factor);
        let mut camera = plan.old_camera.clone();
        camera.scale_output(factor);
        (resize_by_factor(&linear, factor), camera)
    } else {
        (linear, plan.old_camera.clone())
    };

    let warped = reproject_image(
        &linear,
        &old_camera,
        &plan.new_camera,
        plan.dst_size,
        ANTIALIAS_FACTOR,
        Interpolation::Cubic,
    )?;
    Ok(to_display(&warped, options.image_adjustments_3dhp))
}

/// Build the output record: same example, expressed in the crop's frame.
fn transform_record(
    example: &Example,
    new_image_path: &Path,
    plan: &CropPlan,
    root: Option<&Path>,
) -> Result<Example, PreprocessError> {
    let pose = match &example.pose {
        Pose::Pose2D { coords, camera } => Pose::Pose2D {
            coords: reproject_image_points(coords, &plan.old_camera, &plan.new_camera)?,
            camera: camera.as_ref().map(|_| plan.new_camera.clone()),
        },
        Pose::Pose3D { world_coords, .. } => Pose::Pose3D {
            world_coords: world_coords.clone(),
            camera: plan.new_camera.clone(),
        },
    };

    let mask = match &example.mask {
        Some(mask) => Some(MaskRepr::Encoded(reproject_mask(
            &mask.resolved(root),
            &plan.old_camera,
            &plan.new_camera,
            plan.dst_size,
            &plan.bbox,
        )?)),
        None => None,
    };

    Ok(Example {
        image: ImageSource::Path(new_image_path.to_path_buf()),
        bbox: plan.bbox,
        pose,
        mask,
    })
}

fn source_extents(image: &ImageSource, root: Option<&Path>) -> Result<(u32, u32), PreprocessError> {
    match image {
        ImageSource::Path(path) => {
            let path = resolve(root, path);
            image_extents(&path).map_err(|e| PreprocessError::from_source(path, e))
        }
        ImageSource::Pixels(pixels) => Ok(pixels.dimensions()),
    }
}

fn source_pixels(image: &ImageSource, root: Option<&Path>) -> Result<RgbImage, PreprocessError> {
    match image {
        ImageSource::Path(path) => {
            let path = resolve(root, path);
            read_image(&path).map_err(|e| PreprocessError::from_source(path, e))
        }
        ImageSource::Pixels(pixels) => Ok(pixels.clone()),
    }
}

fn skip_or_fail(err: PreprocessError, options: &CropOptions) -> Result<Option<Example>, PreprocessError> {
    if options.ignore_broken_image && err.is_broken_image() {
        warn!("skipping example: {}", err);
        Ok(None)
    } else {
        Err(err)
    }
}

/// Whether `path` exists, was modified at or after `min_time`, and decodes.
fn is_cached(path: &Path, min_time: Option<SystemTime>) -> bool {
    is_newer(path, min_time) && is_image_readable(path)
}

fn is_newer(path: &Path, min_time: Option<SystemTime>) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    match min_time {
        None => true,
        Some(threshold) => metadata.modified().is_ok_and(|modified| modified >= threshold),
    }
}

fn resolve(root: Option<&Path>, path: &Path) -> PathBuf {
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

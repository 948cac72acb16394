//! Dataset examples: an image, a person box, a pose annotation and an
//! optional segmentation mask.

use std::path::{Path, PathBuf};

use image::RgbImage;
use nalgebra::{Point2, Point3};

use crate::boxes::BBox;
use crate::camera::Camera;
use crate::mask::MaskRepr;

/// Where an example's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// An image file, possibly relative to a data root.
    Path(PathBuf),
    /// Pixels already decoded in memory.
    Pixels(RgbImage),
}

impl ImageSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ImageSource::Path(p) => Some(p),
            ImageSource::Pixels(_) => None,
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<RgbImage> for ImageSource {
    fn from(pixels: RgbImage) -> Self {
        ImageSource::Pixels(pixels)
    }
}

/// Pose annotation of an example.
///
/// Keypoints may be NaN for joints that are not annotated.
#[derive(Debug, Clone, PartialEq)]
pub enum Pose {
    /// Keypoints in image pixel coordinates, with an optional camera.
    Pose2D {
        coords: Vec<Point2<f64>>,
        camera: Option<Camera>,
    },
    /// Keypoints in world coordinates, seen through `camera`.
    Pose3D {
        world_coords: Vec<Point3<f64>>,
        camera: Camera,
    },
}

impl Pose {
    pub fn camera(&self) -> Option<&Camera> {
        match self {
            Pose::Pose2D { camera, .. } => camera.as_ref(),
            Pose::Pose3D { camera, .. } => Some(camera),
        }
    }

    pub fn is_3d(&self) -> bool {
        matches!(self, Pose::Pose3D { .. })
    }
}

/// One training example.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub image: ImageSource,
    /// Person box in pixels of `image`.
    pub bbox: BBox,
    pub pose: Pose,
    pub mask: Option<MaskRepr>,
}

impl Example {
    pub fn new_2d(image: impl Into<ImageSource>, bbox: BBox, coords: Vec<Point2<f64>>) -> Self {
        Self {
            image: image.into(),
            bbox,
            pose: Pose::Pose2D {
                coords,
                camera: None,
            },
            mask: None,
        }
    }

    pub fn new_3d(
        image: impl Into<ImageSource>,
        bbox: BBox,
        world_coords: Vec<Point3<f64>>,
        camera: Camera,
    ) -> Self {
        Self {
            image: image.into(),
            bbox,
            pose: Pose::Pose3D {
                world_coords,
                camera,
            },
            mask: None,
        }
    }

    pub fn with_mask(mut self, mask: MaskRepr) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Attach a camera to a 2D example; replaces the camera of a 3D one.
    pub fn with_camera(mut self, new_camera: Camera) -> Self {
        match &mut self.pose {
            Pose::Pose2D { camera, .. } => *camera = Some(new_camera),
            Pose::Pose3D { camera, .. } => *camera = new_camera,
        }
        self
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.pose.camera()
    }

    pub fn is_3d(&self) -> bool {
        self.pose.is_3d()
    }
}

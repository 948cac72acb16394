//! Pinhole camera model with optional lens distortion.
//!
//! A [`Camera`] maps world points to pixels in three stages:
//!
//! ```text
//! world --(R, t)--> camera --(perspective divide, distortion)--> normalized --(K)--> pixel
//! ```
//!
//! The crop pipeline only ever rotates a camera about its optical center and
//! changes its intrinsics, so every pair of cameras in play shares the same
//! optical center. That is what makes reprojection between two cameras a
//! pure function of pixel coordinates (see [`reproject_image_points`]).
//!
//! # Pixel Convention
//!
//! Pixel `(i, j)` covers `[i, i+1) x [j, j+1)`. Under this convention
//! [`Camera::shift_image`] and [`Camera::scale_output`] are exact affine
//! maps of both pixel coordinates and image content.

mod distortion;
mod reproject;

pub use distortion::BrownConrady;
pub use reproject::{
    reproject_box_corners, reproject_box_side_midpoints, reproject_image_points, Reprojection,
};

use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors signalled by camera geometry.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// A point maps to or behind the camera's image plane.
    #[error("Point ({x}, {y}) projects behind the camera")]
    BehindCamera { x: f64, y: f64 },

    /// The viewing direction is parallel to the world-up vector, so no
    /// camera orientation can be derived from it.
    #[error("Cannot orient camera: viewing direction is parallel to world up")]
    DegenerateOrientation,

    /// The two cameras of a reprojection do not share an optical center.
    #[error("Cameras have different optical centers; reprojection is undefined")]
    OpticalCenterMismatch,

    /// The intrinsic matrix has no inverse.
    #[error("Intrinsic matrix is singular")]
    SingularIntrinsics,
}

/// Pinhole camera: extrinsics, intrinsics and optional distortion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera position in world coordinates.
    pub optical_center: Point3<f64>,
    /// Rotation taking world directions into camera coordinates.
    pub rot_world_to_cam: Matrix3<f64>,
    /// Intrinsic matrix K.
    pub intrinsic_matrix: Matrix3<f64>,
    /// Lens distortion, `None` for an ideal pinhole.
    pub distortion: Option<BrownConrady>,
    /// World direction that should appear "up" in the image.
    pub world_up: Vector3<f64>,
}

impl Camera {
    pub fn new(
        optical_center: Point3<f64>,
        rot_world_to_cam: Matrix3<f64>,
        intrinsic_matrix: Matrix3<f64>,
        distortion: Option<BrownConrady>,
        world_up: Vector3<f64>,
    ) -> Self {
        Self {
            optical_center,
            rot_world_to_cam,
            intrinsic_matrix,
            distortion,
            world_up,
        }
    }

    /// Camera at the world origin looking down +z, with image y pointing down.
    pub fn from_intrinsics(intrinsic_matrix: Matrix3<f64>) -> Self {
        Self::new(
            Point3::origin(),
            Matrix3::identity(),
            intrinsic_matrix,
            None,
            Vector3::new(0.0, -1.0, 0.0),
        )
    }

    /// Flat placeholder camera for 2D examples.
    ///
    /// Its intrinsics are the identity, so pixel coordinates equal normalized
    /// coordinates and reprojection between two flat-derived cameras reduces
    /// to the affine shift and scale applied to them.
    pub fn create_2d() -> Self {
        Self::from_intrinsics(Matrix3::identity())
    }

    pub fn with_distortion(mut self, distortion: BrownConrady) -> Self {
        self.distortion = (!distortion.is_identity()).then_some(distortion);
        self
    }

    pub fn with_extrinsics(mut self, rot_world_to_cam: Matrix3<f64>, optical_center: Point3<f64>) -> Self {
        self.rot_world_to_cam = rot_world_to_cam;
        self.optical_center = optical_center;
        self
    }

    pub fn has_distortion(&self) -> bool {
        self.distortion.is_some()
    }

    pub(crate) fn intrinsic_inverse(&self) -> Result<Matrix3<f64>, GeometryError> {
        self.intrinsic_matrix
            .try_inverse()
            .ok_or(GeometryError::SingularIntrinsics)
    }

    pub fn world_to_camera(&self, p: &Point3<f64>) -> Vector3<f64> {
        self.rot_world_to_cam * (p - self.optical_center)
    }

    pub fn camera_to_world(&self, p: &Vector3<f64>) -> Point3<f64> {
        self.optical_center + self.rot_world_to_cam.transpose() * p
    }

    /// Project a camera-space point to pixels.
    ///
    /// NaN inputs propagate to a NaN pixel instead of an error, so missing
    /// keypoints survive reprojection.
    pub fn camera_to_image(&self, p: &Vector3<f64>) -> Result<Point2<f64>, GeometryError> {
        if p.z <= 0.0 {
            return Err(GeometryError::BehindCamera { x: p.x, y: p.y });
        }
        Ok(self.normalized_to_image(&Vector2::new(p.x / p.z, p.y / p.z)))
    }

    /// Back-project a pixel to a camera-space direction on the z = 1 plane.
    pub fn image_to_camera(&self, pixel: &Point2<f64>) -> Result<Vector3<f64>, GeometryError> {
        let k_inv = self.intrinsic_inverse()?;
        let n = self.image_to_normalized(pixel, &k_inv);
        Ok(Vector3::new(n.x, n.y, 1.0))
    }

    pub fn world_to_image(&self, p: &Point3<f64>) -> Result<Point2<f64>, GeometryError> {
        self.camera_to_image(&self.world_to_camera(p))
    }

    /// Back-project a pixel to the world point at the given depth along the
    /// optical axis.
    pub fn image_to_world(&self, pixel: &Point2<f64>, depth: f64) -> Result<Point3<f64>, GeometryError> {
        let dir = self.image_to_camera(pixel)?;
        Ok(self.camera_to_world(&(dir * depth)))
    }

    /// Distort (if needed) and apply K to a normalized point.
    pub(crate) fn normalized_to_image(&self, n: &Vector2<f64>) -> Point2<f64> {
        let n = match &self.distortion {
            Some(d) => d.distort(n),
            None => *n,
        };
        let h = self.intrinsic_matrix * Vector3::new(n.x, n.y, 1.0);
        Point2::new(h.x / h.z, h.y / h.z)
    }

    /// Apply K^-1 and remove distortion (if any).
    pub(crate) fn image_to_normalized(&self, pixel: &Point2<f64>, k_inv: &Matrix3<f64>) -> Vector2<f64> {
        let h = k_inv * Vector3::new(pixel.x, pixel.y, 1.0);
        let n = Vector2::new(h.x / h.z, h.y / h.z);
        match &self.distortion {
            Some(d) => d.undistort(&n),
            None => n,
        }
    }

    /// Rotate the camera about its optical center so that the optical axis
    /// passes through `target` (a pixel of the current image).
    ///
    /// The new x axis is perpendicular to both the optical axis and
    /// `world_up`, so the image stays upright with no in-plane roll.
    pub fn turn_towards(&mut self, target: &Point2<f64>) -> Result<(), GeometryError> {
        let target_world = self.image_to_world(target, 1.0)?;
        let new_z = (target_world - self.optical_center).normalize();
        let new_x = new_z.cross(&self.world_up);
        if new_x.norm() < 1e-12 || !new_x.norm().is_finite() {
            return Err(GeometryError::DegenerateOrientation);
        }
        let new_x = new_x.normalize();
        let new_y = new_z.cross(&new_x);
        self.rot_world_to_cam = Matrix3::from_rows(&[
            new_x.transpose(),
            new_y.transpose(),
            new_z.transpose(),
        ]);
        Ok(())
    }

    /// Drop lens distortion, turning the camera into an ideal pinhole with
    /// the same intrinsics.
    pub fn undistort(&mut self) {
        self.distortion = None;
    }

    /// Translate the image plane by `offset` pixels.
    pub fn shift_image(&mut self, offset: &Vector2<f64>) {
        self.intrinsic_matrix[(0, 2)] += offset.x;
        self.intrinsic_matrix[(1, 2)] += offset.y;
    }

    /// Scale the output image by `factor`.
    pub fn scale_output(&mut self, factor: f64) {
        for col in 0..3 {
            self.intrinsic_matrix[(0, col)] *= factor;
            self.intrinsic_matrix[(1, col)] *= factor;
        }
    }

    /// Whether both cameras sit at the same point in the world.
    pub fn shares_optical_center(&self, other: &Camera) -> bool {
        let dist = (self.optical_center - other.optical_center).norm();
        let scale = 1.0 + self.optical_center.coords.norm().max(other.optical_center.coords.norm());
        dist <= 1e-9 * scale
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::create_2d()
    }
}

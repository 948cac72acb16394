//! Moving pixel coordinates from one camera's image to another's.

use nalgebra::{Matrix3, Point2, Vector3};

use super::{Camera, GeometryError};
use crate::boxes::BBox;

/// Precomputed pixel mapping between two cameras that share an optical center.
///
/// Building one of these once and calling [`map`](Self::map) per pixel avoids
/// re-inverting intrinsics inside resampling loops.
#[derive(Debug, Clone)]
pub struct Reprojection<'a> {
    from: &'a Camera,
    to: &'a Camera,
    from_k_inv: Matrix3<f64>,
    relative_rotation: Matrix3<f64>,
}

impl<'a> Reprojection<'a> {
    pub fn new(from: &'a Camera, to: &'a Camera) -> Result<Self, GeometryError> {
        if !from.shares_optical_center(to) {
            return Err(GeometryError::OpticalCenterMismatch);
        }
        Ok(Self {
            from,
            to,
            from_k_inv: from.intrinsic_inverse()?,
            relative_rotation: to.rot_world_to_cam * from.rot_world_to_cam.transpose(),
        })
    }

    /// Map a pixel of the `from` image to the `to` image.
    pub fn map(&self, pixel: &Point2<f64>) -> Result<Point2<f64>, GeometryError> {
        let n = self.from.image_to_normalized(pixel, &self.from_k_inv);
        let dir = self.relative_rotation * Vector3::new(n.x, n.y, 1.0);
        self.to.camera_to_image(&dir)
    }
}

/// Reproject pixel coordinates from `from`'s image into `to`'s image.
pub fn reproject_image_points(
    points: &[Point2<f64>],
    from: &Camera,
    to: &Camera,
) -> Result<Vec<Point2<f64>>, GeometryError> {
    let reprojection = Reprojection::new(from, to)?;
    points.iter().map(|p| reprojection.map(p)).collect()
}

/// Reproject a box by its side midpoints.
///
/// Under perspective change the sides of a box bend and tilt; the bounding
/// box of the four reprojected side midpoints tracks the subject's extent
/// more closely than the one of the reprojected corners, which overgrows.
pub fn reproject_box_side_midpoints(
    bbox: &BBox,
    from: &Camera,
    to: &Camera,
) -> Result<BBox, GeometryError> {
    let points = reproject_image_points(&bbox.side_midpoints(), from, to)?;
    Ok(BBox::bounding(points).unwrap_or_default())
}

/// Reproject a box by its four corners.
pub fn reproject_box_corners(bbox: &BBox, from: &Camera, to: &Camera) -> Result<BBox, GeometryError> {
    let points = reproject_image_points(&bbox.corners(), from, to)?;
    Ok(BBox::bounding(points).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::tests::test_camera;
    use nalgebra::{Point3, Vector2};

    #[test]
    fn test_identity_reprojection() {
        let cam = test_camera();
        let pts = vec![Point2::new(1.0, 2.0), Point2::new(600.0, 470.0)];
        let out = reproject_image_points(&pts, &cam, &cam).unwrap();
        for (a, b) in pts.iter().zip(&out) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_flat_camera_reprojection_is_affine() {
        let old = Camera::create_2d();
        let mut new = old.clone();
        new.shift_image(&Vector2::new(-100.0, -100.0));
        new.scale_output(2.0);

        let out = reproject_image_points(&[Point2::new(120.0, 140.0)], &old, &new).unwrap();
        assert!((out[0] - Point2::new(40.0, 80.0)).norm() < 1e-9);
    }

    #[test]
    fn test_box_reprojection_under_affine_change() {
        let old = Camera::create_2d();
        let mut new = old.clone();
        new.shift_image(&Vector2::new(-10.0, -20.0));
        new.scale_output(0.5);

        let bbox = BBox::new(10.0, 20.0, 40.0, 60.0);
        let by_mid = reproject_box_side_midpoints(&bbox, &old, &new).unwrap();
        let by_corner = reproject_box_corners(&bbox, &old, &new).unwrap();
        let expected = BBox::new(0.0, 0.0, 20.0, 30.0);
        for b in [by_mid, by_corner] {
            assert!((b.x - expected.x).abs() < 1e-9);
            assert!((b.y - expected.y).abs() < 1e-9);
            assert!((b.width - expected.width).abs() < 1e-9);
            assert!((b.height - expected.height).abs() < 1e-9);
        }
    }

    #[test]
    fn test_midpoint_box_inside_corner_box_after_rotation() {
        let old = test_camera();
        let mut new = old.clone();
        new.turn_towards(&Point2::new(600.0, 420.0)).unwrap();

        let bbox = BBox::new(520.0, 330.0, 100.0, 140.0);
        let by_mid = reproject_box_side_midpoints(&bbox, &old, &new).unwrap();
        let by_corner = reproject_box_corners(&bbox, &old, &new).unwrap();
        assert!(by_mid.width <= by_corner.width + 1e-9);
        assert!(by_mid.height <= by_corner.height + 1e-9);
    }

    #[test]
    fn test_points_round_trip_through_rotated_camera() {
        let old = test_camera();
        let mut new = old.clone();
        new.turn_towards(&Point2::new(50.0, 60.0)).unwrap();
        new.undistort();
        new.scale_output(0.7);

        let pts = vec![Point2::new(10.0, 20.0), Point2::new(320.0, 240.0), Point2::new(630.0, 5.0)];
        let there = reproject_image_points(&pts, &old, &new).unwrap();
        let back = reproject_image_points(&there, &new, &old).unwrap();
        for (a, b) in pts.iter().zip(&back) {
            assert!((a - b).norm() < 1e-6, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_different_optical_centers_rejected() {
        let old = test_camera();
        let new = old.clone().with_extrinsics(Matrix3::identity(), Point3::new(5.0, 0.0, 0.0));
        assert_eq!(
            reproject_image_points(&[Point2::new(0.0, 0.0)], &old, &new).unwrap_err(),
            GeometryError::OpticalCenterMismatch
        );
    }

    #[test]
    fn test_point_behind_new_camera() {
        let old = test_camera();
        let mut new = old.clone();
        // Look the opposite way: rotate 180 degrees about the y axis.
        new.rot_world_to_cam = Matrix3::new(-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0);
        let result = reproject_image_points(&[Point2::new(320.0, 240.0)], &old, &new);
        assert!(matches!(result, Err(GeometryError::BehindCamera { .. })));
    }

    #[test]
    fn test_nan_points_survive() {
        let old = Camera::create_2d();
        let mut new = old.clone();
        new.scale_output(2.0);
        let out = reproject_image_points(&[Point2::new(f64::NAN, f64::NAN)], &old, &new).unwrap();
        assert!(out[0].x.is_nan());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

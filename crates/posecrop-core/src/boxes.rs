//! Axis-aligned box geometry in pixel coordinates.
//!
//! Boxes are stored as `(x, y, width, height)` with `(x, y)` the top-left
//! corner. Pixel `(i, j)` covers `[i, i+1) x [j, j+1)`, so the box covering a
//! whole `w x h` image is `(0, 0, w, h)`.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// An axis-aligned box `(x, y, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box covering a whole image of the given size.
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    /// Box spanning practically the whole plane.
    ///
    /// Used in place of the image bounds when clipping must be disabled.
    pub fn unbounded() -> Self {
        Self::new(-1e9, -1e9, 2e9, 2e9)
    }

    /// Box with corners at the given min/max coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self::new(xmin, ymin, xmax - xmin, ymax - ymin)
    }

    /// Square box of the given side centered at `center`.
    pub fn around(center: Point2<f64>, side: f64) -> Self {
        Self::new(center.x - side / 2.0, center.y - side / 2.0, side, side)
    }

    /// Smallest box containing all the points.
    ///
    /// Returns `None` for an empty iterator. NaN coordinates are ignored by
    /// `f64::min`/`f64::max`, so a box is produced as long as one coordinate
    /// per axis is finite.
    pub fn bounding<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point2<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut xmin, mut ymin, mut xmax, mut ymax) = (first.x, first.y, first.x, first.y);
        for p in iter {
            xmin = xmin.min(p.x);
            ymin = ymin.min(p.y);
            xmax = xmax.max(p.x);
            ymax = ymax.max(p.y);
        }
        Some(Self::from_xyxy(xmin, ymin, xmax, ymax))
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Larger of width and height.
    #[inline]
    pub fn max_side(&self) -> f64 {
        self.width.max(self.height)
    }

    /// The four corners, clockwise from the top-left.
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            Point2::new(self.x, self.y),
            Point2::new(self.xmax(), self.y),
            Point2::new(self.xmax(), self.ymax()),
            Point2::new(self.x, self.ymax()),
        ]
    }

    /// Midpoints of the four sides: top, right, bottom, left.
    pub fn side_midpoints(&self) -> [Point2<f64>; 4] {
        let c = self.center();
        [
            Point2::new(c.x, self.y),
            Point2::new(self.xmax(), c.y),
            Point2::new(c.x, self.ymax()),
            Point2::new(self.x, c.y),
        ]
    }

    /// Scale the box about its center.
    pub fn expand(&self, factor: f64) -> Self {
        let c = self.center();
        let (w, h) = (self.width * factor, self.height * factor);
        Self::new(c.x - w / 2.0, c.y - h / 2.0, w, h)
    }

    /// Overlap of two boxes.
    ///
    /// Disjoint boxes produce a zero-sized box; width and height are never
    /// negative.
    pub fn intersection(&self, other: &BBox) -> Self {
        let xmin = self.x.max(other.x);
        let ymin = self.y.max(other.y);
        let xmax = self.xmax().min(other.xmax());
        let ymax = self.ymax().min(other.ymax());
        Self::new(xmin, ymin, (xmax - xmin).max(0.0), (ymax - ymin).max(0.0))
    }

    /// Intersection over union, 0 when either box is empty.
    pub fn iou(&self, other: &BBox) -> f64 {
        let inter = self.intersection(other).area();
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    /// Whether `point` lies inside the box, with `tolerance` slack on each side.
    pub fn contains_point(&self, point: &Point2<f64>, tolerance: f64) -> bool {
        point.x >= self.x - tolerance
            && point.x <= self.xmax() + tolerance
            && point.y >= self.y - tolerance
            && point.y <= self.ymax() + tolerance
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

//! Brown-Conrady lens distortion on normalized image coordinates.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Fixed-point iterations used to invert the distortion.
const UNDISTORT_ITERATIONS: u32 = 20;

/// Five-coefficient radial/tangential distortion, OpenCV coefficient order
/// `(k1, k2, p1, p2, k3)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BrownConrady {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady {
    /// Build from coefficients in OpenCV order `[k1, k2, p1, p2, k3]`.
    pub fn from_opencv(coeffs: [f64; 5]) -> Self {
        let [k1, k2, p1, p2, k3] = coeffs;
        Self { k1, k2, p1, p2, k3 }
    }

    pub fn to_opencv(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// True when all coefficients are zero.
    pub fn is_identity(&self) -> bool {
        self.to_opencv().iter().all(|c| *c == 0.0)
    }

    /// Apply distortion to an undistorted normalized point.
    pub fn distort(&self, n: &Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let xy = x * y;
        let x_tan = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;

        Vector2::new(x * radial + x_tan, y * radial + y_tan)
    }

    /// Invert [`distort`](Self::distort) by fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vector2<f64>) -> Vector2<f64> {
        let mut n = *n_dist;
        for _ in 0..UNDISTORT_ITERATIONS {
            let err = self.distort(&n) - n_dist;
            n -= err;
        }
        n
    }
}

//! Sampling interleaved `f32` buffers at fractional positions.
//!
//! Positions are in array coordinates: the center of pixel `(i, j)` is at
//! `(i, j)`. Taps outside the buffer contribute zero.

/// Interpolation kernel used when sampling the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest pixel.
    Nearest,
    /// Bilinear interpolation over the 2x2 neighbourhood.
    #[default]
    Linear,
    /// Bicubic convolution over the 4x4 neighbourhood.
    Cubic,
}

/// Cubic convolution parameter (the value OpenCV uses).
const CUBIC_A: f32 = -0.75;

/// An interleaved image buffer borrowed for sampling.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SourceView<'a> {
    pub data: &'a [f32],
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl SourceView<'_> {
    #[inline]
    fn add_tap(&self, px: i64, py: i64, weight: f32, out: &mut [f32]) {
        if px < 0 || py < 0 || px >= self.width as i64 || py >= self.height as i64 || weight == 0.0 {
            return;
        }
        let idx = (py as usize * self.width + px as usize) * self.channels;
        for (o, v) in out.iter_mut().zip(&self.data[idx..idx + self.channels]) {
            *o += weight * v;
        }
    }

    /// Sample at `(x, y)`, writing one value per channel into `out`.
    pub fn sample(&self, x: f64, y: f64, interpolation: Interpolation, out: &mut [f32]) {
        out.iter_mut().for_each(|o| *o = 0.0);
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        // Entirely outside, even for the widest kernel.
        if x < -2.0 || y < -2.0 || x > self.width as f64 + 1.0 || y > self.height as f64 + 1.0 {
            return;
        }

        match interpolation {
            Interpolation::Nearest => {
                self.add_tap((x + 0.5).floor() as i64, (y + 0.5).floor() as i64, 1.0, out);
            }
            Interpolation::Linear => {
                let x0 = x.floor();
                let y0 = y.floor();
                let fx = (x - x0) as f32;
                let fy = (y - y0) as f32;
                let (x0, y0) = (x0 as i64, y0 as i64);
                self.add_tap(x0, y0, (1.0 - fx) * (1.0 - fy), out);
                self.add_tap(x0 + 1, y0, fx * (1.0 - fy), out);
                self.add_tap(x0, y0 + 1, (1.0 - fx) * fy, out);
                self.add_tap(x0 + 1, y0 + 1, fx * fy, out);
            }
            Interpolation::Cubic => {
                let x0 = x.floor();
                let y0 = y.floor();
                let wx = cubic_weights((x - x0) as f32);
                let wy = cubic_weights((y - y0) as f32);
                let (x0, y0) = (x0 as i64, y0 as i64);
                for (ky, wy) in wy.iter().enumerate() {
                    for (kx, wx) in wx.iter().enumerate() {
                        self.add_tap(x0 + kx as i64 - 1, y0 + ky as i64 - 1, wx * wy, out);
                    }
                }
            }
        }
    }
}

/// Weights of the four taps at offsets -1, 0, 1, 2 for fractional offset `t`.
///
/// Keys' cubic convolution kernel; the weights always sum to one.
#[inline]
fn cubic_weights(t: f32) -> [f32; 4] {
    let a = CUBIC_A;
    let w0 = ((a * (t + 1.0) - 5.0 * a) * (t + 1.0) + 8.0 * a) * (t + 1.0) - 4.0 * a;
    let w1 = ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0;
    let u = 1.0 - t;
    let w2 = ((a + 2.0) * u - (a + 3.0)) * u * u + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

//! Gamma handling and color correction around resampling.
//!
//! Resampling averages neighbouring pixels. Averaging gamma-encoded values
//! darkens edges and fine detail, so pixels are moved to (approximately)
//! linear light before the warp and encoded back afterwards:
//!
//! ```text
//! linear = (value / 255) ^ 2.2
//! value  = clip(linear, 0, 1) ^ (1 / 2.2) * 255
//! ```
//!
//! The MPI-INF-3DHP tone hook swaps the output exponent for a brighter one
//! and removes that dataset's known green cast in Lab space.

use image::{Rgb, Rgb32FImage, RgbImage};

/// Display gamma used for linearization.
pub const GAMMA: f32 = 2.2;

/// Extra factor on the inverse gamma for MPI-INF-3DHP images.
pub const GAMMA_FACTOR_3DHP: f32 = 0.67;

/// Average Lab chroma (OpenCV 8-bit scale) of the MPI-INF-3DHP color cast.
pub const COLOR_CAST_3DHP: (f32, f32) = (110.0, 145.0);

/// Chroma of a neutral gray in OpenCV 8-bit Lab.
const NEUTRAL_CHROMA: f32 = 128.0;

/// Lookup table from 8-bit values to linear light.
#[derive(Debug, Clone)]
pub struct LinearizationLut {
    table: [f32; 256],
}

impl LinearizationLut {
    pub fn new(gamma: f32) -> Self {
        let mut table = [0.0f32; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = (i as f32 / 255.0).powf(gamma);
        }
        Self { table }
    }

    #[inline]
    pub fn lookup(&self, value: u8) -> f32 {
        self.table[value as usize]
    }
}

impl Default for LinearizationLut {
    fn default() -> Self {
        Self::new(GAMMA)
    }
}

/// Convert an 8-bit image to linear light in [0, 1].
pub fn linearize(image: &RgbImage) -> Rgb32FImage {
    let lut = LinearizationLut::default();
    let (w, h) = image.dimensions();
    Rgb32FImage::from_fn(w, h, |x, y| Rgb(image.get_pixel(x, y).0.map(|v| lut.lookup(v))))
}

/// Encode linear light back to 8 bits with `value = clip(v)^exponent * 255`.
///
/// The final conversion truncates toward zero.
pub fn delinearize(image: &Rgb32FImage, exponent: f32) -> RgbImage {
    let (w, h) = image.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        Rgb(image
            .get_pixel(x, y)
            .0
            .map(|v| (v.clamp(0.0, 1.0).powf(exponent) * 255.0) as u8))
    })
}

/// Final tone mapping from linear light to an 8-bit output image.
pub fn to_display(image: &Rgb32FImage, adjust_3dhp: bool) -> RgbImage {
    if adjust_3dhp {
        let mut out = delinearize(image, 1.0 / GAMMA * GAMMA_FACTOR_3DHP);
        let (a, b) = COLOR_CAST_3DHP;
        white_balance(&mut out, a, b);
        out
    } else {
        delinearize(image, 1.0 / GAMMA)
    }
}

/// Remove a color cast whose average Lab chroma is `(cast_a, cast_b)`.
///
/// Lab values use OpenCV's 8-bit scaling (L in 0-255, a and b offset by 128).
/// The cast's offset from neutral is subtracted, scaled by lightness:
///
/// ```text
/// a' = a - (cast_a - 128) * (L / 255) * 1.1
/// b' = b - (cast_b - 128) * (L / 255) * 1.1
/// ```
pub fn white_balance(image: &mut RgbImage, cast_a: f32, cast_b: f32) {
    let (shift_a, shift_b) = (cast_a - NEUTRAL_CHROMA, cast_b - NEUTRAL_CHROMA);
    for pixel in image.pixels_mut() {
        let [l, a, b] = rgb_to_lab8(pixel);
        let weight = l / 255.0 * 1.1;
        *pixel = lab8_to_rgb(l, a - shift_a * weight, b - shift_b * weight);
    }
}

// D65 white point.
const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    if f > 0.206_893 {
        f * f * f
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

fn rgb_to_lab8(p: &Rgb<u8>) -> [f32; 3] {
    let r = srgb_to_linear(p[0] as f32 / 255.0);
    let g = srgb_to_linear(p[1] as f32 / 255.0);
    let b = srgb_to_linear(p[2] as f32 / 255.0);

    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / XN;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / ZN;

    let l = if y > 0.008856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    [
        l * 255.0 / 100.0,
        500.0 * (fx - fy) + 128.0,
        200.0 * (fy - fz) + 128.0,
    ]
}

fn lab8_to_rgb(l8: f32, a8: f32, b8: f32) -> Rgb<u8> {
    let l = l8 * 100.0 / 255.0;
    let a = a8 - 128.0;
    let b = b8 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let y = if l > 903.3 * 0.008856 {
        fy * fy * fy
    } else {
        l / 903.3
    };
    let x = lab_f_inv(fy + a / 500.0) * XN;
    let z = lab_f_inv(fy - b / 200.0) * ZN;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    let to_u8 = |c: f32| (linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(bl)])
}

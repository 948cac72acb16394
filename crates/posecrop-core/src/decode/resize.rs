//! Shrinking images by a scale factor.

use image::imageops::{self, FilterType};
use image::Rgb32FImage;

/// Resize a linear-light image by `factor`, rounding the output size.
///
/// Factors at or above 1 return a copy; this is only ever used to shrink.
/// The triangle filter's support grows with the reduction ratio, so this
/// acts as an area average and removes frequencies the later warp would
/// alias.
pub fn resize_by_factor(image: &Rgb32FImage, factor: f64) -> Rgb32FImage {
    if factor >= 1.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let width = ((image.width() as f64 * factor).round() as u32).max(1);
    let height = ((image.height() as f64 * factor).round() as u32).max(1);
    imageops::resize(image, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_factor_one_is_copy() {
        let img = Rgb32FImage::from_pixel(10, 8, Rgb([0.5, 0.25, 0.125]));
        let out = resize_by_factor(&img, 1.0);
        assert_eq!(out, img);
    }

    #[test]
    fn test_halving_dimensions() {
        let img = Rgb32FImage::from_pixel(100, 51, Rgb([0.5, 0.5, 0.5]));
        let out = resize_by_factor(&img, 0.5);
        // 25.5 rounds away from zero
        assert_eq!(out.dimensions(), (50, 26));
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let img = Rgb32FImage::from_pixel(40, 40, Rgb([0.3, 0.6, 0.9]));
        let out = resize_by_factor(&img, 0.25);
        for p in out.pixels() {
            assert!((p[0] - 0.3).abs() < 1e-4);
            assert!((p[1] - 0.6).abs() < 1e-4);
            assert!((p[2] - 0.9).abs() < 1e-4);
        }
    }

    #[test]
    fn test_tiny_factor_keeps_one_pixel() {
        let img = Rgb32FImage::from_pixel(10, 10, Rgb([1.0, 1.0, 1.0]));
        assert_eq!(resize_by_factor(&img, 0.001).dimensions(), (1, 1));
    }
}

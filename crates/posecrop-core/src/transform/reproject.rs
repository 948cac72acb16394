//! Warping an image from one camera's frame into another's.

use image::{ImageBuffer, Pixel};
use nalgebra::Point2;

use super::interpolate::{Interpolation, SourceView};
use crate::camera::{Camera, GeometryError, Reprojection};

/// Warp `image`, seen through `from`, into the frame of `to`.
///
/// # Arguments
///
/// * `image` - Source pixels, any `f32` pixel type (RGB images, masks)
/// * `from` - Camera the source pixels were taken with
/// * `to` - Camera describing the output frame
/// * `dst_size` - Output `(width, height)` in pixels
/// * `antialias_factor` - Supersampling factor; 1 disables antialiasing
/// * `interpolation` - Kernel used to sample the source
///
/// # Errors
///
/// Returns `GeometryError` if the cameras do not share an optical center or
/// the source intrinsics are singular. Destination pixels whose rays miss
/// the source camera (behind it) are left at zero.
pub fn reproject_image<P>(
    image: &ImageBuffer<P, Vec<f32>>,
    from: &Camera,
    to: &Camera,
    dst_size: (u32, u32),
    antialias_factor: u32,
    interpolation: Interpolation,
) -> Result<ImageBuffer<P, Vec<f32>>, GeometryError>
where
    P: Pixel<Subpixel = f32>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let aa = antialias_factor.max(1);
    let (dst_w, dst_h) = dst_size;

    let mut supersampled = to.clone();
    if aa > 1 {
        supersampled.scale_output(aa as f64);
    }
    let mapping = Reprojection::new(&supersampled, from)?;

    let source = SourceView {
        data: image.as_raw(),
        width: image.width() as usize,
        height: image.height() as usize,
        channels,
    };

    let (hi_w, hi_h) = (dst_w as usize * aa as usize, dst_h as usize * aa as usize);
    let mut hi = vec![0.0f32; hi_w * hi_h * channels];
    for y in 0..hi_h {
        for x in 0..hi_w {
            let center = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
            if let Ok(src) = mapping.map(&center) {
                let idx = (y * hi_w + x) * channels;
                source.sample(src.x - 0.5, src.y - 0.5, interpolation, &mut hi[idx..idx + channels]);
            }
        }
    }

    let data = if aa > 1 {
        box_downsample(&hi, hi_w, hi_h, channels, aa as usize)
    } else {
        hi
    };

    // `data` holds exactly dst_w * dst_h pixels.
    let mut out: ImageBuffer<P, Vec<f32>> = ImageBuffer::new(dst_w, dst_h);
    out.copy_from_slice(&data);
    Ok(out)
}

/// Average non-overlapping `factor x factor` blocks of an interleaved buffer.
///
/// `width` and `height` must be multiples of `factor`.
pub fn box_downsample(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    factor: usize,
) -> Vec<f32> {
    let (out_w, out_h) = (width / factor, height / factor);
    let norm = 1.0 / (factor * factor) as f32;
    let mut out = vec![0.0f32; out_w * out_h * channels];

    for y in 0..out_h * factor {
        let oy = y / factor;
        for x in 0..out_w * factor {
            let src = (y * width + x) * channels;
            let dst = (oy * out_w + x / factor) * channels;
            for c in 0..channels {
                out[dst + c] += data[src + c];
            }
        }
    }
    out.iter_mut().for_each(|v| *v *= norm);
    out
}

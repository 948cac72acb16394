//! Pixel resampling between camera frames.
//!
//! # Algorithm
//!
//! Warping uses inverse mapping: every destination pixel center is
//! back-projected through the destination camera, rotated into the source
//! camera and projected onto the source image, where the source is sampled
//! with the chosen [`Interpolation`].
//!
//! # Antialiasing
//!
//! With an antialias factor `a > 1` the destination is rendered at `a` times
//! the target resolution and box-averaged down over `a x a` blocks, which
//! suppresses aliasing when the warp shrinks the image.
//!
//! # Borders
//!
//! Taps that fall outside the source read as zero.

mod interpolate;
mod reproject;

pub use interpolate::Interpolation;
pub use reproject::{box_downsample, reproject_image};

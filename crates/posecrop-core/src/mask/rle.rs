//! Run-length encoded binary masks.
//!
//! Runs alternate background/foreground starting with background, over the
//! pixels in column-major order (down the first column, then the next). The
//! first run may be zero when the top-left pixel is foreground. This is the
//! layout COCO annotations use, so counts can be exchanged with COCO tooling
//! directly or through the compressed string form.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use super::MaskError;
use crate::boxes::BBox;

/// A binary mask stored as run lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RleMask {
    pub height: u32,
    pub width: u32,
    pub counts: Vec<u32>,
}

impl RleMask {
    /// Encode a dense mask; any nonzero pixel is foreground.
    pub fn encode(mask: &GrayImage) -> Self {
        Self::from_fn(mask.width(), mask.height(), |x, y| mask.get_pixel(x, y)[0] != 0)
    }

    /// Encode the mask whose foreground is given by `is_foreground(x, y)`.
    pub fn from_fn<F>(width: u32, height: u32, is_foreground: F) -> Self
    where
        F: Fn(u32, u32) -> bool,
    {
        let mut counts = Vec::new();
        let mut current = false;
        let mut run = 0u32;
        for x in 0..width {
            for y in 0..height {
                if is_foreground(x, y) != current {
                    counts.push(run);
                    run = 0;
                    current = !current;
                }
                run += 1;
            }
        }
        counts.push(run);
        Self {
            height,
            width,
            counts,
        }
    }

    /// All-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            height,
            width,
            counts: vec![width * height],
        }
    }

    /// Decode to a dense mask with foreground 255 and background 0.
    ///
    /// # Errors
    ///
    /// Returns `MaskError::InvalidRle` if the runs do not cover the mask exactly.
    pub fn decode(&self) -> Result<GrayImage, MaskError> {
        let total: u64 = self.counts.iter().map(|&c| c as u64).sum();
        let expected = self.width as u64 * self.height as u64;
        if total != expected {
            return Err(MaskError::InvalidRle(format!(
                "runs cover {} pixels, mask has {}",
                total, expected
            )));
        }

        let mut out = GrayImage::new(self.width, self.height);
        let h = self.height as usize;
        let mut pos = 0usize;
        for (i, &run) in self.counts.iter().enumerate() {
            let run = run as usize;
            if i % 2 == 1 {
                for p in pos..pos + run {
                    out.put_pixel((p / h) as u32, (p % h) as u32, Luma([255]));
                }
            }
            pos += run;
        }
        Ok(out)
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.counts.iter().skip(1).step_by(2).map(|&c| c as u64).sum()
    }

    /// Pixel-aligned bounding box of the foreground, `None` if empty.
    pub fn bbox(&self) -> Option<BBox> {
        let h = self.height as u64;
        if h == 0 {
            return None;
        }
        let (mut xmin, mut ymin, mut xmax, mut ymax) = (u64::MAX, u64::MAX, 0u64, 0u64);
        let mut pos = 0u64;
        for (i, &run) in self.counts.iter().enumerate() {
            let run = run as u64;
            if i % 2 == 1 && run > 0 {
                let (first, last) = (pos, pos + run - 1);
                let (x0, x1) = (first / h, last / h);
                xmin = xmin.min(x0);
                xmax = xmax.max(x1);
                if x0 == x1 {
                    ymin = ymin.min(first % h);
                    ymax = ymax.max(last % h);
                } else {
                    // The run wraps a column boundary, so it touches both
                    // the top and the bottom row somewhere.
                    ymin = 0;
                    ymax = h - 1;
                }
            }
            pos += run;
        }
        (xmin != u64::MAX).then(|| {
            BBox::from_xyxy(xmin as f64, ymin as f64, (xmax + 1) as f64, (ymax + 1) as f64)
        })
    }

    /// COCO's compressed string form of the counts.
    ///
    /// Each count (as a difference from the count two places earlier, from
    /// the fourth count on) is written as 5-bit groups, least significant
    /// first, with a continuation bit, offset into printable ASCII.
    pub fn to_coco_string(&self) -> String {
        let mut out = String::new();
        for (i, &count) in self.counts.iter().enumerate() {
            let mut x = count as i64;
            if i > 2 {
                x -= self.counts[i - 2] as i64;
            }
            loop {
                let mut c = x & 0x1f;
                x >>= 5;
                let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
                if more {
                    c |= 0x20;
                }
                out.push((c as u8 + 48) as char);
                if !more {
                    break;
                }
            }
        }
        out
    }

    /// Parse COCO's compressed string form.
    ///
    /// # Errors
    ///
    /// Returns `MaskError::InvalidRle` on bytes outside the encoding alphabet,
    /// truncated values or negative counts.
    pub fn from_coco_string(width: u32, height: u32, encoded: &str) -> Result<Self, MaskError> {
        let bytes = encoded.as_bytes();
        let mut counts: Vec<u32> = Vec::new();
        let mut p = 0usize;
        while p < bytes.len() {
            let mut x: i64 = 0;
            let mut k = 0u32;
            loop {
                let byte = *bytes
                    .get(p)
                    .ok_or_else(|| MaskError::InvalidRle("truncated count".to_string()))?;
                if !(48..48 + 64).contains(&byte) || k >= 12 {
                    return Err(MaskError::InvalidRle(format!("invalid byte {:#x}", byte)));
                }
                let c = (byte - 48) as i64;
                x |= (c & 0x1f) << (5 * k);
                p += 1;
                k += 1;
                if c & 0x20 == 0 {
                    if c & 0x10 != 0 {
                        x |= -1i64 << (5 * k);
                    }
                    break;
                }
            }
            if counts.len() > 2 {
                x += counts[counts.len() - 2] as i64;
            }
            let count = u32::try_from(x)
                .map_err(|_| MaskError::InvalidRle(format!("count {} out of range", x)))?;
            counts.push(count);
        }
        Ok(Self {
            height,
            width,
            counts,
        })
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

//! Connected components of binary masks.
//!
//! Person masks from segmentation models often contain bits of other people
//! or background blobs. After warping, only the component that best matches
//! the person's box is kept.

use std::collections::VecDeque;

use image::GrayImage;
use log::trace;

use super::RleMask;
use crate::boxes::BBox;

/// A 4-connected group of foreground pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Label in the label image; labels start at 1, 0 is background.
    pub label: u32,
    /// Pixel-aligned bounding box.
    pub bbox: BBox,
    /// Number of pixels.
    pub area: u32,
}

/// Label the 4-connected foreground components of `mask` (nonzero pixels).
///
/// Returns a row-major label image the size of the mask and one entry per
/// component, in order of first appearance in a raster scan.
pub fn label_components(mask: &GrayImage) -> (Vec<u32>, Vec<Component>) {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let raw = mask.as_raw();
    let mut labels = vec![0u32; w * h];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..w * h {
        if raw[start] == 0 || labels[start] != 0 {
            continue;
        }
        let label = components.len() as u32 + 1;
        labels[start] = label;
        queue.push_back(start);

        let (mut minx, mut miny, mut maxx, mut maxy) = (usize::MAX, usize::MAX, 0, 0);
        let mut area = 0u32;
        while let Some(idx) = queue.pop_front() {
            let (x, y) = (idx % w, idx / w);
            minx = minx.min(x);
            miny = miny.min(y);
            maxx = maxx.max(x);
            maxy = maxy.max(y);
            area += 1;

            let mut visit = |n: usize| {
                if raw[n] != 0 && labels[n] == 0 {
                    labels[n] = label;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        components.push(Component {
            label,
            bbox: BBox::new(
                minx as f64,
                miny as f64,
                (maxx - minx + 1) as f64,
                (maxy - miny + 1) as f64,
            ),
            area,
        });
    }

    (labels, components)
}

/// Keep only the component whose bounding box has the highest IoU with
/// `person_box` and encode it.
///
/// Ties go to the component found first. A mask without foreground encodes
/// as all background.
pub fn component_with_highest_iou(mask: &GrayImage, person_box: &BBox) -> RleMask {
    let (labels, components) = label_components(mask);
    trace!("mask has {} connected components", components.len());

    let mut best: Option<(u32, f64)> = None;
    for component in &components {
        let iou = component.bbox.iou(person_box);
        if best.map_or(true, |(_, best_iou)| iou > best_iou) {
            best = Some((component.label, iou));
        }
    }

    let Some((keep, _)) = best else {
        return RleMask::empty(mask.width(), mask.height());
    };
    let w = mask.width() as usize;
    RleMask::from_fn(mask.width(), mask.height(), |x, y| {
        labels[y as usize * w + x as usize] == keep
    })
}

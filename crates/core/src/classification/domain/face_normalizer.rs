//! Crop a face out of an image and turn it into the classifier's input.
//!
//! The crop is inclusive of both corners, resized to 224×224 by
//! nearest-neighbor sampling, and mapped from [0, 255] to [-1, 1].

use std::borrow::Cow;

use ndarray::{Array4, ArrayView3};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{MASK_INPUT_SIZE, NORM_OFFSET};
use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;

/// A `1 × 224 × 224 × 3` (NHWC) float tensor holding one face.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedFace {
    tensor: Array4<f32>,
}

impl NormalizedFace {
    pub fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }

    /// Same data in `1 × 3 × 224 × 224` layout.
    pub fn to_nchw(&self) -> Array4<f32> {
        self.tensor
            .view()
            .permuted_axes([0, 3, 1, 2])
            .as_standard_layout()
            .into_owned()
    }
}

/// `(height, width)` of the crop for `bbox`, counting both corners.
pub fn crop_size(bbox: &BoundingBox) -> (i64, i64) {
    (bbox.height(), bbox.width())
}

/// Crop `bbox` from `image`, resize and rescale it for classification.
///
/// Fails with [`PipelineError::InvalidRegion`] when the crop is empty or
/// reaches outside the image. Frames with other than three channels are
/// converted to RGB first.
pub fn normalize_face(image: &Frame, bbox: &BoundingBox) -> Result<NormalizedFace, PipelineError> {
    let (crop_h, crop_w) = crop_size(bbox);
    if crop_h <= 0 || crop_w <= 0 {
        return Err(invalid(bbox, "crop has no area"));
    }
    if !bbox.fits_within(image.height(), image.width()) {
        return Err(invalid(bbox, "crop extends outside the image"));
    }

    let rgb = if image.channels() == 3 {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(image.to_rgb())
    };
    let src = rgb.as_ndarray();

    let top = bbox.top_left.row as usize;
    let left = bbox.top_left.col as usize;
    let tensor = resize_nearest(
        &src,
        top,
        left,
        crop_h as usize,
        crop_w as usize,
        MASK_INPUT_SIZE,
    );
    Ok(NormalizedFace { tensor })
}

/// Nearest-neighbor resize of the crop at (`top`, `left`) sized
/// `crop_h × crop_w` into a `1 × out × out × 3` tensor, rescaling values on
/// the way.
///
/// Source index for output index `i` is `floor(i * in / out)`, clamped to
/// the last source index (no half-pixel centers, no corner alignment).
fn resize_nearest(
    src: &ArrayView3<'_, u8>,
    top: usize,
    left: usize,
    crop_h: usize,
    crop_w: usize,
    out: usize,
) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, out, out, 3));

    for y in 0..out {
        let src_y = top + (y * crop_h / out).min(crop_h - 1);
        for x in 0..out {
            let src_x = left + (x * crop_w / out).min(crop_w - 1);
            for c in 0..3 {
                let v = src[[src_y, src_x, c]] as f32;
                tensor[[0, y, x, c]] = (v - NORM_OFFSET) / NORM_OFFSET;
            }
        }
    }

    tensor
}

fn invalid(bbox: &BoundingBox, reason: &'static str) -> PipelineError {
    PipelineError::InvalidRegion {
        top_left: bbox.top_left,
        bottom_right: bbox.bottom_right,
        reason,
    }
}

/// BlazeFace face locator using ONNX Runtime via `ort`.
///
/// A lightweight short-range detector: one forward pass per image,
/// anchor decoding, then NMS. Produces inclusive pixel boxes clamped to the
/// image.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_locator::{FaceLocator, LocatorOptions};
use crate::shared::bounding_box::{BoundingBox, PixelCoord};
use crate::shared::execution_provider::{intra_op_threads, preferred_execution_providers};
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: 4 box + 6 keypoints × 2.
const REGRESSOR_STRIDE: usize = 16;

const NUM_KEYPOINTS: usize = 6;

pub struct OnnxBlazefaceLocator {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceLocator {
    /// Load a BlazeFace ONNX model.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_op_threads())?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        Ok(Self {
            session: Mutex::new(session),
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceLocator for OnnxBlazefaceLocator {
    fn locate(
        &self,
        frame: &Frame,
        options: LocatorOptions,
    ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        // 1. Preprocess: resize to 128x128, normalize to [0,1], NCHW
        let input_tensor = preprocess(frame, INPUT_SIZE);

        // 2. Inference. Outputs: regressors [1, 896, 16], classificators [1, 896, 1]
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        // 3. Decode anchors + filter by confidence
        let mut raw_dets = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            frame.width(),
            frame.height(),
        );

        // 4. NMS
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);

        // 5. Pixel boxes
        let boxes = kept
            .iter()
            .filter_map(|d| to_bounding_box(d, frame.width(), frame.height(), options))
            .collect();
        Ok(boxes)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Anchor generation (BlazeFace short-range)
// ---------------------------------------------------------------------------

/// The short-range model uses two feature map sizes: 16×16 and 8×8,
/// with 2 and 6 anchors per cell respectively.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
    /// (x, y) in frame pixels.
    keypoints: [(f64, f64); NUM_KEYPOINTS],
}

fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f64,
    fw: u32,
    fh: u32,
) -> Vec<RawDet> {
    let mut dets = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);
    let scale = INPUT_SIZE as f32;

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if (score as f64) < confidence {
            continue;
        }

        let anchor = &anchors[i];
        let off = i * REGRESSOR_STRIDE;
        if off + REGRESSOR_STRIDE > reg_data.len() {
            break;
        }

        let cx = anchor[0] + reg_data[off] / scale;
        let cy = anchor[1] + reg_data[off + 1] / scale;
        let w = reg_data[off + 2] / scale;
        let h = reg_data[off + 3] / scale;

        let mut keypoints = [(0.0, 0.0); NUM_KEYPOINTS];
        for (k, kp) in keypoints.iter_mut().enumerate() {
            let kx = anchor[0] + reg_data[off + 4 + k * 2] / scale;
            let ky = anchor[1] + reg_data[off + 5 + k * 2] / scale;
            *kp = ((kx * fw as f32) as f64, (ky * fh as f32) as f64);
        }

        dets.push(RawDet {
            x1: ((cx - w / 2.0) * fw as f32).max(0.0) as f64,
            y1: ((cy - h / 2.0) * fh as f32).max(0.0) as f64,
            x2: ((cx + w / 2.0) * fw as f32).min(fw as f32) as f64,
            y2: ((cy + h / 2.0) * fh as f32).min(fh as f32) as f64,
            score: score as f64,
            keypoints,
        });
    }

    dets
}

/// Convert a continuous detection into inclusive pixel corners.
///
/// Returns `None` when the detection lies entirely outside the frame.
fn to_bounding_box(
    det: &RawDet,
    fw: u32,
    fh: u32,
    options: LocatorOptions,
) -> Option<BoundingBox> {
    let last_row = fh as i64 - 1;
    let last_col = fw as i64 - 1;

    // Left of or above the frame: `decode` clamps x1/y1 to 0, so only the
    // far edge tells.
    if det.x2 <= 0.0 || det.y2 <= 0.0 {
        return None;
    }
    let top = (det.y1.floor() as i64).max(0);
    let left = (det.x1.floor() as i64).max(0);
    if top > last_row || left > last_col {
        return None;
    }
    let bottom = (det.y2.ceil() as i64 - 1).max(top).min(last_row);
    let right = (det.x2.ceil() as i64 - 1).max(left).min(last_col);

    let mut bbox = BoundingBox::new(
        PixelCoord::new(top as i32, left as i32),
        PixelCoord::new(bottom as i32, right as i32),
    );
    if options.annotate_boxes {
        bbox.probability = Some(det.score as f32);
        bbox.landmarks = Some(
            det.keypoints
                .iter()
                .map(|&(x, y)| (y as f32, x as f32))
                .collect(),
        );
    }
    if options.flip_horizontal {
        bbox = bbox.mirrored(fw);
    }
    Some(bbox)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> RawDet {
        RawDet {
            x1,
            y1,
            x2,
            y2,
            score,
            keypoints: [(0.0, 0.0); NUM_KEYPOINTS],
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let data = vec![128u8; 200 * 100 * 3];
        let frame = Frame::new(data, 200, 100, 3);
        let tensor = preprocess(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let data = vec![255u8; 50 * 50 * 3];
        let frame = Frame::new(data, 50, 50, 3);
        let tensor = preprocess(&frame, 128);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_generate_anchors_count() {
        let anchors = generate_anchors();
        // 16×16 grid × 2 anchors + 8×8 grid × 6 anchors = 512 + 384 = 896
        assert_eq!(anchors.len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in &generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!((sigmoid(10.0) - 1.0).abs() < 0.001);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_decode_filters_low_scores_and_scales_to_frame() {
        let anchors = vec![[0.5, 0.5], [0.25, 0.25]];
        let mut reg = vec![0.0f32; 2 * REGRESSOR_STRIDE];
        // Anchor 0: 64×32 box (in 128-px model space) centered on the anchor
        reg[2] = 64.0;
        reg[3] = 32.0;
        let scores = vec![5.0, -5.0];

        let dets = decode(&reg, &scores, &anchors, 0.5, 256, 256);

        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x1 - 64.0).abs() < 1e-3);
        assert!((d.x2 - 192.0).abs() < 1e-3);
        assert!((d.y1 - 96.0).abs() < 1e-3);
        assert!((d.y2 - 160.0).abs() < 1e-3);
        assert!((d.keypoints[0].0 - 128.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_stops_on_short_regressor() {
        let anchors = vec![[0.5, 0.5]];
        let dets = decode(&[0.0; 4], &[5.0], &anchors, 0.5, 100, 100);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let mut dets = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.9),
            raw(5.0, 5.0, 105.0, 105.0, 0.7),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_nms_keeps_separate() {
        let mut dets = vec![
            raw(0.0, 0.0, 50.0, 50.0, 0.9),
            raw(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_to_bounding_box_is_inclusive_and_row_major() {
        let d = raw(10.0, 20.0, 60.0, 80.0, 0.9);
        let b = to_bounding_box(&d, 100, 100, LocatorOptions::default()).unwrap();
        assert_eq!(b.top_left, PixelCoord::new(20, 10));
        assert_eq!(b.bottom_right, PixelCoord::new(79, 59));
        assert_eq!((b.height(), b.width()), (60, 50));
        assert!(b.probability.is_none());
        assert!(b.landmarks.is_none());
    }

    #[test]
    fn test_to_bounding_box_clamps_to_frame() {
        let d = raw(90.2, 0.0, 100.0, 100.0, 0.9);
        let b = to_bounding_box(&d, 100, 50, LocatorOptions::default()).unwrap();
        assert!(b.fits_within(50, 100));
        assert_eq!(b.top_left.col, 90);
        assert_eq!(b.bottom_right.col, 99);
        assert_eq!(b.bottom_right.row, 49);
    }

    #[test]
    fn test_to_bounding_box_zero_area_becomes_single_pixel() {
        let d = raw(10.0, 10.0, 10.0, 10.0, 0.9);
        let b = to_bounding_box(&d, 100, 100, LocatorOptions::default()).unwrap();
        assert_eq!((b.height(), b.width()), (1, 1));
    }

    #[test]
    fn test_to_bounding_box_outside_frame_is_dropped() {
        let d = raw(120.0, 0.0, 100.0, 10.0, 0.9);
        assert!(to_bounding_box(&d, 100, 100, LocatorOptions::default()).is_none());
    }

    #[test]
    fn test_to_bounding_box_left_or_above_frame_is_dropped() {
        let left_of = raw(0.0, 10.0, -4.0, 30.0, 0.9);
        assert!(to_bounding_box(&left_of, 100, 100, LocatorOptions::default()).is_none());
        let above = raw(10.0, 0.0, 30.0, 0.0, 0.9);
        assert!(to_bounding_box(&above, 100, 100, LocatorOptions::default()).is_none());
    }

    #[test]
    fn test_to_bounding_box_straddling_left_edge_is_kept() {
        let d = raw(0.0, 10.0, 5.0, 30.0, 0.9);
        let b = to_bounding_box(&d, 100, 100, LocatorOptions::default()).unwrap();
        assert_eq!(b.top_left, PixelCoord::new(10, 0));
        assert_eq!(b.bottom_right, PixelCoord::new(29, 4));
    }

    #[test]
    fn test_to_bounding_box_annotates_when_asked() {
        let mut d = raw(0.0, 0.0, 10.0, 10.0, 0.8);
        d.keypoints[0] = (3.0, 7.0);
        let opts = LocatorOptions {
            annotate_boxes: true,
            ..LocatorOptions::default()
        };
        let b = to_bounding_box(&d, 20, 20, opts).unwrap();
        assert!((b.probability.unwrap() - 0.8).abs() < 1e-6);
        let landmarks = b.landmarks.unwrap();
        assert_eq!(landmarks.len(), NUM_KEYPOINTS);
        assert_eq!(landmarks[0], (7.0, 3.0));
    }

    #[test]
    fn test_to_bounding_box_flips_horizontally() {
        let d = raw(0.0, 0.0, 10.0, 10.0, 0.8);
        let opts = LocatorOptions {
            flip_horizontal: true,
            ..LocatorOptions::default()
        };
        let b = to_bounding_box(&d, 100, 100, opts).unwrap();
        assert_eq!(b.top_left.col, 90);
        assert_eq!(b.bottom_right.col, 99);
    }
}

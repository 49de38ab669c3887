/// Mask classifier using ONNX Runtime via `ort`.
///
/// Expects a two-class model (mask, no mask) over a 224×224 RGB face in
/// [-1, 1]. Models exported from Keras take NHWC input, others NCHW; the
/// layout is read from the model's declared input shape.
use std::path::Path;
use std::sync::Mutex;

use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::domain::face_normalizer::NormalizedFace;
use crate::classification::domain::mask_classifier::MaskClassifier;
use crate::shared::execution_provider::{intra_op_threads, preferred_execution_providers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TensorLayout {
    Nhwc,
    Nchw,
}

pub struct OnnxMaskClassifier {
    session: Mutex<ort::session::Session>,
    layout: TensorLayout,
}

impl OnnxMaskClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_op_threads())?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let layout = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    Some(layout_from_shape(&shape[..]))
                } else {
                    None
                }
            })
            .unwrap_or(TensorLayout::Nhwc);
        log::debug!("Mask classifier input layout: {layout:?}");

        Ok(Self {
            session: Mutex::new(session),
            layout,
        })
    }
}

impl MaskClassifier for OnnxMaskClassifier {
    fn classify(
        &self,
        face: &NormalizedFace,
    ) -> Result<ClassificationResult, Box<dyn std::error::Error>> {
        let input = match self.layout {
            TensorLayout::Nhwc => face.tensor().clone(),
            TensorLayout::Nchw => face.to_nchw(),
        };
        let input_value = ort::value::Tensor::from_array(input)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Mask model produced no outputs".into());
        }
        let scores = outputs[0].try_extract_array::<f32>()?;
        let values: Vec<f32> = scores.iter().copied().collect();

        let [mask, no_mask] = first_pair(&values)?;
        Ok(ClassificationResult::from_scores(mask, no_mask)?)
    }
}

/// Channels-first when the second dimension is 3 and the last is not.
fn layout_from_shape(shape: &[i64]) -> TensorLayout {
    if shape.len() == 4 && shape[1] == 3 && shape[3] != 3 {
        TensorLayout::Nchw
    } else {
        TensorLayout::Nhwc
    }
}

fn first_pair(values: &[f32]) -> Result<[f32; 2], String> {
    match values {
        [a, b, ..] => Ok([*a, *b]),
        _ => Err(format!(
            "Mask model expected 2 scores, got {}",
            values.len()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::keras_nhwc(&[1, 224, 224, 3], TensorLayout::Nhwc)]
    #[case::dynamic_batch_nhwc(&[-1, 224, 224, 3], TensorLayout::Nhwc)]
    #[case::torch_nchw(&[1, 3, 224, 224], TensorLayout::Nchw)]
    #[case::dynamic_nchw(&[-1, 3, -1, -1], TensorLayout::Nchw)]
    #[case::unknown_rank(&[-1], TensorLayout::Nhwc)]
    fn test_layout_from_shape(#[case] shape: &[i64], #[case] expected: TensorLayout) {
        assert_eq!(layout_from_shape(shape), expected);
    }

    #[test]
    fn test_first_pair_takes_leading_scores() {
        assert_eq!(first_pair(&[0.2, 0.8]).unwrap(), [0.2, 0.8]);
        assert_eq!(first_pair(&[0.2, 0.8, 0.0]).unwrap(), [0.2, 0.8]);
    }

    #[test]
    fn test_first_pair_rejects_short_output() {
        assert!(first_pair(&[0.5]).is_err());
        assert!(first_pair(&[]).is_err());
    }
}

use serde::Serialize;

use maskwatch_core::pipeline::detect_masks_use_case::{FaceOutcome, InferenceReport};
use maskwatch_core::shared::error::PipelineError;

/// One line of `--json` output.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<&'static str>,
    pub faces: Vec<JsonFace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonFace {
    pub index: usize,
    /// `[row, col]`
    pub top_left: [i32; 2],
    /// `[row, col]`, inclusive
    pub bottom_right: [i32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_probability: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_mask_probability: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonReport {
    pub fn new(input: &str, outcome: &Result<InferenceReport, PipelineError>) -> Self {
        match outcome {
            Ok(report) => Self {
                input: input.to_string(),
                verdict: Some(format!("{:?}", report.verdict)),
                signal: Some(report.signal()),
                faces: report.faces.iter().map(JsonFace::from).collect(),
                error: None,
            },
            Err(e) => Self {
                input: input.to_string(),
                verdict: None,
                signal: None,
                faces: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

impl From<&FaceOutcome> for JsonFace {
    fn from(face: &FaceOutcome) -> Self {
        let b = &face.bounding_box;
        let (mask, no_mask, error) = match &face.result {
            Ok(r) => (Some(r.mask_probability), Some(r.no_mask_probability), None),
            Err(e) => (None, None, Some(e.to_string())),
        };
        Self {
            index: face.index,
            top_left: [b.top_left.row, b.top_left.col],
            bottom_right: [b.bottom_right.row, b.bottom_right.col],
            mask_probability: mask,
            no_mask_probability: no_mask,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maskwatch_core::classification::domain::classification_result::ClassificationResult;
    use maskwatch_core::pipeline::verdict::Verdict;
    use maskwatch_core::shared::bounding_box::{BoundingBox, PixelCoord};

    fn face(index: usize, result: Result<ClassificationResult, PipelineError>) -> FaceOutcome {
        FaceOutcome {
            index,
            bounding_box: BoundingBox::new(PixelCoord::new(1, 2), PixelCoord::new(30, 40)),
            result,
        }
    }

    #[test]
    fn test_successful_report() {
        let report = InferenceReport {
            verdict: Verdict::Danger,
            faces: vec![
                face(0, Ok(ClassificationResult::from_probabilities(0.25, 0.75).unwrap())),
                face(1, Err(PipelineError::DecodeFailure("x".into()))),
            ],
        };
        let json = serde_json::to_value(JsonReport::new("a.png", &Ok(report))).unwrap();

        assert_eq!(json["input"], "a.png");
        assert_eq!(json["verdict"], "Danger");
        assert_eq!(json["signal"], "Danger Is Around");
        assert_eq!(json["faces"][0]["top_left"], serde_json::json!([1, 2]));
        assert_eq!(json["faces"][0]["bottom_right"], serde_json::json!([30, 40]));
        assert_eq!(json["faces"][0]["mask_probability"], 0.25);
        assert!(json["faces"][0].get("error").is_none());
        assert!(json["faces"][1]["error"].is_string());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failed_report() {
        let outcome = Err(PipelineError::DecodeFailure("bad header".into()));
        let json = serde_json::to_value(JsonReport::new("-", &outcome)).unwrap();

        assert_eq!(json["input"], "-");
        assert!(json.get("verdict").is_none());
        assert!(json.get("signal").is_none());
        assert_eq!(json["faces"], serde_json::json!([]));
        assert!(json["error"].as_str().unwrap().contains("bad header"));
    }
}

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::shared::bounding_box::PixelCoord;

/// Errors surfaced by the mask detection pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{model} model unavailable: {reason}")]
    ModelUnavailable { model: &'static str, reason: String },

    #[error("invalid face region {top_left}..{bottom_right}: {reason}")]
    InvalidRegion {
        top_left: PixelCoord,
        bottom_right: PixelCoord,
        reason: &'static str,
    },

    #[error("failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{stage} failed: {message}")]
    Inference { stage: &'static str, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("face {index} failed: {source}")]
    FaceFailed {
        index: usize,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wraps an error returned across a capability seam.
    pub fn inference(stage: &'static str, err: Box<dyn std::error::Error>) -> Self {
        Self::Inference {
            stage,
            message: err.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_region_message_includes_corners() {
        let err = PipelineError::InvalidRegion {
            top_left: PixelCoord::new(10, 20),
            bottom_right: PixelCoord::new(5, 30),
            reason: "empty crop",
        };
        let msg = err.to_string();
        assert!(msg.contains("(10, 20)"));
        assert!(msg.contains("(5, 30)"));
        assert!(msg.contains("empty crop"));
    }

    #[test]
    fn test_inference_wraps_boxed_error() {
        let err = PipelineError::inference("classify", "session closed".into());
        assert_eq!(err.to_string(), "classify failed: session closed");
    }

    #[test]
    fn test_timeout_is_distinct_kind() {
        let err = PipelineError::Timeout {
            operation: "detect",
            after: Duration::from_millis(5),
        };
        assert!(err.is_timeout());
        assert!(!PipelineError::DecodeFailure("x".into()).is_timeout());
    }

    #[test]
    fn test_face_failed_exposes_source() {
        use std::error::Error as _;
        let err = PipelineError::FaceFailed {
            index: 2,
            source: Box::new(PipelineError::DecodeFailure("bad".into())),
        };
        assert!(err.to_string().starts_with("face 2 failed"));
        assert!(err.source().is_some());
    }
}

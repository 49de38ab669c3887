use std::time::Duration;

use crate::shared::constants::{DEFAULT_MASK_THRESHOLD, DEFAULT_MODEL_WAIT};

/// What to do when one face cannot be classified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaceFailurePolicy {
    /// Log the failure, leave the face out of the verdict, keep going.
    #[default]
    SkipFace,
    /// Give up on the whole image; no verdict is produced.
    AbortImage,
}

/// Configuration for mask detection runs.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Faces with a mask probability strictly below this are unmasked.
    pub mask_threshold: f32,
    pub failure_policy: FaceFailurePolicy,
    /// Upper bound per detection or classification call. `None` = unbounded.
    pub inference_timeout: Option<Duration>,
    /// How long to wait for a model that is still loading. `None` = don't wait.
    pub model_wait: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            failure_policy: FaceFailurePolicy::default(),
            inference_timeout: None,
            model_wait: Some(DEFAULT_MODEL_WAIT),
        }
    }
}

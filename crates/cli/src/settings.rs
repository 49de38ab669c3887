use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use maskwatch_core::detection::infrastructure::onnx_blazeface_locator::DEFAULT_CONFIDENCE;
use maskwatch_core::pipeline::pipeline_config::FaceFailurePolicy;
use maskwatch_core::shared::constants::{DEFAULT_MASK_THRESHOLD, DEFAULT_MODEL_WAIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnFaceError {
    /// Leave the face out and still produce a verdict.
    Skip,
    /// Produce no verdict for the image.
    Abort,
}

impl From<OnFaceError> for FaceFailurePolicy {
    fn from(value: OnFaceError) -> Self {
        match value {
            OnFaceError::Skip => FaceFailurePolicy::SkipFace,
            OnFaceError::Abort => FaceFailurePolicy::AbortImage,
        }
    }
}

/// Values remembered between runs. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub face_model_url: Option<String>,
    pub mask_model_url: Option<String>,
    pub models_dir: Option<PathBuf>,
    pub confidence: f64,
    pub mask_threshold: f32,
    pub on_face_error: OnFaceError,
    pub load_timeout_secs: u64,
    pub inference_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            face_model_url: None,
            mask_model_url: None,
            models_dir: None,
            confidence: DEFAULT_CONFIDENCE,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            on_face_error: OnFaceError::Skip,
            load_timeout_secs: DEFAULT_MODEL_WAIT.as_secs(),
            inference_timeout_ms: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("MaskWatch").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Reads settings from `path`; an absent or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("Ignoring malformed settings at {}: {e}", path.display());
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("could not determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

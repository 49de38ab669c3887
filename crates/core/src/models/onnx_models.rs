use std::path::PathBuf;
use std::sync::Arc;

use crate::classification::domain::mask_classifier::MaskClassifier;
use crate::classification::infrastructure::onnx_mask_classifier::OnnxMaskClassifier;
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::infrastructure::onnx_blazeface_locator::{
    OnnxBlazefaceLocator, DEFAULT_CONFIDENCE,
};
use crate::models::model_slot::ModelLoader;
use crate::shared::constants::{FACE_MODEL_NAME, MASK_MODEL_NAME};
use crate::shared::model_resolver::{self, ModelSource, ProgressFn};

/// Where the two ONNX models come from and how the locator is tuned.
#[derive(Clone, Debug, PartialEq)]
pub struct OnnxModelConfig {
    pub face_locator: ModelSource,
    pub mask_classifier: ModelSource,
    /// Directory searched after the cache, before downloading.
    pub bundled_dir: Option<PathBuf>,
    /// Minimum face detection score (0.0-1.0).
    pub confidence: f64,
}

impl Default for OnnxModelConfig {
    fn default() -> Self {
        Self {
            face_locator: ModelSource::named(FACE_MODEL_NAME),
            mask_classifier: ModelSource::named(MASK_MODEL_NAME),
            bundled_dir: None,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Loader that resolves the face model and opens a BlazeFace session.
pub fn face_locator_loader(config: &OnnxModelConfig) -> ModelLoader<dyn FaceLocator> {
    let source = config.face_locator.clone();
    let bundled_dir = config.bundled_dir.clone();
    let confidence = config.confidence;
    Box::new(move || {
        let path = model_resolver::resolve(
            &source,
            bundled_dir.as_deref(),
            Some(download_progress(&source.name)),
        )
        .map_err(|e| e.to_string())?;
        log::debug!("Face model resolved to {}", path.display());
        let locator = OnnxBlazefaceLocator::new(&path, confidence).map_err(|e| e.to_string())?;
        Ok(Arc::new(locator) as Arc<dyn FaceLocator>)
    })
}

/// Loader that resolves the mask model and opens a classifier session.
pub fn mask_classifier_loader(config: &OnnxModelConfig) -> ModelLoader<dyn MaskClassifier> {
    let source = config.mask_classifier.clone();
    let bundled_dir = config.bundled_dir.clone();
    Box::new(move || {
        let path = model_resolver::resolve(
            &source,
            bundled_dir.as_deref(),
            Some(download_progress(&source.name)),
        )
        .map_err(|e| e.to_string())?;
        log::debug!("Mask model resolved to {}", path.display());
        let classifier = OnnxMaskClassifier::new(&path).map_err(|e| e.to_string())?;
        Ok(Arc::new(classifier) as Arc<dyn MaskClassifier>)
    })
}

fn download_progress(name: &str) -> ProgressFn {
    let name = name.to_string();
    Box::new(move |downloaded, total| {
        if total > 0 {
            let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
            log::debug!("Downloading {name}... {pct}%");
        } else {
            log::debug!("Downloading {name}... {downloaded} bytes");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_bundled_names() {
        let config = OnnxModelConfig::default();
        assert_eq!(config.face_locator.name, "blazeface.onnx");
        assert_eq!(config.mask_classifier.name, "mask_classifier.onnx");
        assert!(config.face_locator.url.is_none());
        assert_eq!(config.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_missing_face_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = OnnxModelConfig {
            face_locator: ModelSource {
                path: Some(dir.path().join("absent.onnx")),
                ..ModelSource::named(FACE_MODEL_NAME)
            },
            ..OnnxModelConfig::default()
        };
        let err = face_locator_loader(&config)().err().unwrap();
        assert!(err.contains("absent.onnx"), "unexpected error: {err}");
    }

    #[test]
    fn test_missing_mask_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = OnnxModelConfig {
            mask_classifier: ModelSource {
                path: Some(dir.path().join("absent.onnx")),
                ..ModelSource::named(MASK_MODEL_NAME)
            },
            ..OnnxModelConfig::default()
        };
        let err = mask_classifier_loader(&config)().err().unwrap();
        assert!(err.contains("absent.onnx"), "unexpected error: {err}");
    }

    #[test]
    fn test_corrupt_model_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();
        let config = OnnxModelConfig {
            mask_classifier: ModelSource {
                path: Some(path),
                ..ModelSource::named(MASK_MODEL_NAME)
            },
            ..OnnxModelConfig::default()
        };
        assert!(mask_classifier_loader(&config)().is_err());
    }
}

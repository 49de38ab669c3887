use std::sync::Arc;
use std::time::Instant;

use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::domain::face_normalizer::{crop_size, normalize_face};
use crate::classification::domain::mask_classifier::MaskClassifier;
use crate::detection::domain::face_locator::LocatorOptions;
use crate::models::model_registry::ModelRegistry;
use crate::pipeline::pipeline_config::{FaceFailurePolicy, PipelineConfig};
use crate::pipeline::status_reporter::StatusReporter;
use crate::pipeline::timeout::run_with_timeout;
use crate::pipeline::verdict::Verdict;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;

/// What happened to one detected face.
#[derive(Debug)]
pub struct FaceOutcome {
    /// Position in the locator's output.
    pub index: usize,
    pub bounding_box: BoundingBox,
    pub result: Result<ClassificationResult, PipelineError>,
}

/// Everything one inference produced.
#[derive(Debug)]
pub struct InferenceReport {
    pub verdict: Verdict,
    pub faces: Vec<FaceOutcome>,
}

impl InferenceReport {
    pub fn signal(&self) -> &'static str {
        self.verdict.signal()
    }

    pub fn failed_faces(&self) -> usize {
        self.faces.iter().filter(|f| f.result.is_err()).count()
    }
}

/// Single-image mask check: locate → normalize → classify → aggregate.
pub struct DetectMasksUseCase {
    registry: Arc<ModelRegistry>,
    config: PipelineConfig,
    reporter: Arc<dyn StatusReporter>,
}

impl DetectMasksUseCase {
    pub fn new(
        registry: Arc<ModelRegistry>,
        config: PipelineConfig,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            registry,
            config,
            reporter,
        }
    }

    /// Runs the full pipeline on a decoded image.
    ///
    /// Faces are classified one at a time in locator order. A face that
    /// fails is handled according to [`PipelineConfig::failure_policy`].
    pub fn execute(&self, image: &Frame) -> Result<InferenceReport, PipelineError> {
        let image = Arc::new(image.to_rgb());
        let (h, w, c) = image.shape();
        log::debug!("Input shape: {h}x{w}x{c}");

        let locator = self.registry.face_locator(self.config.model_wait)?;

        let t0 = Instant::now();
        let boxes = {
            let image = Arc::clone(&image);
            run_with_timeout("detect", self.config.inference_timeout, move || {
                locator
                    .locate(&image, LocatorOptions::default())
                    .map_err(|e| PipelineError::inference("detect", e))
            })?
        };
        self.reporter
            .timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
        log::debug!("Located {} face(s)", boxes.len());

        if boxes.is_empty() {
            return Ok(InferenceReport {
                verdict: Verdict::Safe,
                faces: Vec::new(),
            });
        }
        // Only needed once there is a face to classify.
        let classifier = self.registry.mask_classifier(self.config.model_wait)?;

        let mut faces = Vec::with_capacity(boxes.len());
        for (index, bounding_box) in boxes.into_iter().enumerate() {
            let result = match self.classify_face(&image, &bounding_box, &classifier) {
                Ok(r) => {
                    log::info!("Face {index}: mask probability {:.3}", r.mask_probability);
                    Ok(r)
                }
                Err(e) if self.config.failure_policy == FaceFailurePolicy::AbortImage => {
                    return Err(PipelineError::FaceFailed {
                        index,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    log::warn!("Skipping face {index}: {e}");
                    Err(e)
                }
            };
            faces.push(FaceOutcome {
                index,
                bounding_box,
                result,
            });
        }

        let verdict = Verdict::from_results(
            faces.iter().filter_map(|f| f.result.as_ref().ok()),
            self.config.mask_threshold,
        );
        log::debug!("Verdict: {verdict}");

        Ok(InferenceReport { verdict, faces })
    }

    fn classify_face(
        &self,
        image: &Frame,
        bounding_box: &BoundingBox,
        classifier: &Arc<dyn MaskClassifier>,
    ) -> Result<ClassificationResult, PipelineError> {
        let (crop_h, crop_w) = crop_size(bounding_box);
        log::debug!(
            "Face at {}..{}, crop {crop_h}x{crop_w}",
            bounding_box.top_left,
            bounding_box.bottom_right
        );

        let t0 = Instant::now();
        let face = normalize_face(image, bounding_box)?;
        self.reporter
            .timing("normalize", t0.elapsed().as_secs_f64() * 1000.0);

        let t0 = Instant::now();
        let classifier = Arc::clone(classifier);
        let result = run_with_timeout("classify", self.config.inference_timeout, move || {
            classifier
                .classify(&face)
                .map_err(|e| PipelineError::inference("classify", e))
        });
        self.reporter
            .timing("classify", t0.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

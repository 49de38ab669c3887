use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::classification::domain::mask_classifier::MaskClassifier;
use crate::detection::domain::face_locator::FaceLocator;
use crate::models::model_slot::{ModelLoader, ModelSlot, ModelStatus};
use crate::pipeline::status_reporter::{NodeStatus, NullStatusReporter, StatusReporter};
use crate::shared::error::PipelineError;

pub const FACE_MODEL: &str = "face";
pub const MASK_MODEL: &str = "mask";

/// Status of both models at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryStatus {
    pub face_locator: ModelStatus,
    pub mask_classifier: ModelStatus,
}

impl RegistryStatus {
    pub fn is_ready(&self) -> bool {
        self.face_locator == ModelStatus::Ready && self.mask_classifier == ModelStatus::Ready
    }
}

/// The two model handles the pipeline depends on.
///
/// Built once per process and shared by reference. Each model loads
/// independently in the background; [`ModelRegistry::teardown`] releases
/// both.
pub struct ModelRegistry {
    face_locator: Arc<ModelSlot<dyn FaceLocator>>,
    mask_classifier: Arc<ModelSlot<dyn MaskClassifier>>,
    reporter: Arc<dyn StatusReporter>,
}

impl ModelRegistry {
    /// An empty registry. Call [`ModelRegistry::start_loading`] next.
    pub fn new(reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            face_locator: Arc::new(ModelSlot::new(FACE_MODEL)),
            mask_classifier: Arc::new(ModelSlot::new(MASK_MODEL)),
            reporter,
        }
    }

    /// A registry whose models are already loaded.
    pub fn with_models(
        face_locator: Arc<dyn FaceLocator>,
        mask_classifier: Arc<dyn MaskClassifier>,
    ) -> Self {
        Self {
            face_locator: Arc::new(ModelSlot::ready(FACE_MODEL, face_locator)),
            mask_classifier: Arc::new(ModelSlot::ready(MASK_MODEL, mask_classifier)),
            reporter: Arc::new(NullStatusReporter),
        }
    }

    /// Kick off background loading of both models. Models already loading
    /// or loaded are left alone.
    pub fn start_loading(
        &self,
        face_locator: ModelLoader<dyn FaceLocator>,
        mask_classifier: ModelLoader<dyn MaskClassifier>,
    ) {
        let face = self.reporting(FACE_MODEL, face_locator);
        if self.face_locator.begin_load(face) {
            self.reporter.status(NodeStatus::LoadingModel(FACE_MODEL));
        }
        let mask = self.reporting(MASK_MODEL, mask_classifier);
        if self.mask_classifier.begin_load(mask) {
            self.reporter.status(NodeStatus::LoadingModel(MASK_MODEL));
        }
    }

    fn reporting<T: ?Sized + 'static>(
        &self,
        model: &'static str,
        loader: ModelLoader<T>,
    ) -> ModelLoader<T> {
        let reporter = Arc::clone(&self.reporter);
        Box::new(move || {
            let outcome = loader();
            match &outcome {
                Ok(_) => reporter.status(NodeStatus::ModelReady(model)),
                Err(reason) => {
                    reporter.status(NodeStatus::Error(format!("{model} model: {reason}")))
                }
            }
            outcome
        })
    }

    pub fn status(&self) -> RegistryStatus {
        RegistryStatus {
            face_locator: self.face_locator.status(),
            mask_classifier: self.mask_classifier.status(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status().is_ready()
    }

    /// Block until both models are ready, or fail with the first problem.
    pub fn wait_until_ready(&self, timeout: Duration) -> Result<(), PipelineError> {
        let deadline = Instant::now() + timeout;
        self.face_locator.wait(timeout)?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.mask_classifier.wait(remaining)?;
        Ok(())
    }

    /// The face locator; waits up to `wait` if it is still loading.
    pub fn face_locator(&self, wait: Option<Duration>) -> Result<Arc<dyn FaceLocator>, PipelineError> {
        match wait {
            Some(timeout) => self.face_locator.wait(timeout),
            None => self.face_locator.get(),
        }
    }

    /// The mask classifier; waits up to `wait` if it is still loading.
    pub fn mask_classifier(
        &self,
        wait: Option<Duration>,
    ) -> Result<Arc<dyn MaskClassifier>, PipelineError> {
        match wait {
            Some(timeout) => self.mask_classifier.wait(timeout),
            None => self.mask_classifier.get(),
        }
    }

    /// Release both models. In-flight calls keep their handles until done.
    pub fn teardown(&self) {
        self.face_locator.release();
        self.mask_classifier.release();
        log::info!("Models released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::classification_result::ClassificationResult;
    use crate::classification::domain::face_normalizer::NormalizedFace;
    use crate::detection::domain::face_locator::LocatorOptions;
    use crate::pipeline::status_reporter::LogStatusReporter;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;

    struct NoFaces;

    impl FaceLocator for NoFaces {
        fn locate(
            &self,
            _frame: &Frame,
            _options: LocatorOptions,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }
    }

    struct AlwaysMasked;

    impl MaskClassifier for AlwaysMasked {
        fn classify(
            &self,
            _face: &NormalizedFace,
        ) -> Result<ClassificationResult, Box<dyn std::error::Error>> {
            Ok(ClassificationResult::from_probabilities(1.0, 0.0)?)
        }
    }

    fn face_loader() -> ModelLoader<dyn FaceLocator> {
        Box::new(|| Ok(Arc::new(NoFaces) as Arc<dyn FaceLocator>))
    }

    fn mask_loader() -> ModelLoader<dyn MaskClassifier> {
        Box::new(|| Ok(Arc::new(AlwaysMasked) as Arc<dyn MaskClassifier>))
    }

    #[test]
    fn test_with_models_is_ready() {
        let registry = ModelRegistry::with_models(Arc::new(NoFaces), Arc::new(AlwaysMasked));
        assert!(registry.is_ready());
        assert!(registry.face_locator(None).is_ok());
        assert!(registry.mask_classifier(None).is_ok());
    }

    #[test]
    fn test_new_registry_is_unavailable() {
        let registry = ModelRegistry::new(Arc::new(NullStatusReporter));
        assert!(!registry.is_ready());
        assert!(matches!(
            registry.face_locator(None),
            Err(PipelineError::ModelUnavailable { model: FACE_MODEL, .. })
        ));
    }

    #[test]
    fn test_start_loading_reaches_ready_and_reports() {
        let reporter = Arc::new(LogStatusReporter::new());
        let registry = ModelRegistry::new(reporter.clone());
        registry.start_loading(face_loader(), mask_loader());
        registry.wait_until_ready(Duration::from_secs(5)).unwrap();

        assert!(registry.is_ready());
        let history = reporter.history();
        assert!(history.contains(&NodeStatus::LoadingModel(FACE_MODEL)));
        assert!(history.contains(&NodeStatus::LoadingModel(MASK_MODEL)));
        assert!(history.contains(&NodeStatus::ModelReady(FACE_MODEL)));
        assert!(history.contains(&NodeStatus::ModelReady(MASK_MODEL)));
    }

    #[test]
    fn test_models_load_independently() {
        let registry = ModelRegistry::new(Arc::new(NullStatusReporter));
        registry.start_loading(
            face_loader(),
            Box::new(|| Err("corrupt weights".to_string())),
        );

        assert!(registry.face_locator(Some(Duration::from_secs(5))).is_ok());
        let err = registry
            .mask_classifier(Some(Duration::from_secs(5)))
            .err()
            .unwrap();
        assert!(err.to_string().contains("corrupt weights"));
        assert_eq!(
            registry.status(),
            RegistryStatus {
                face_locator: ModelStatus::Ready,
                mask_classifier: ModelStatus::Failed,
            }
        );
    }

    #[test]
    fn test_load_failure_is_reported() {
        let reporter = Arc::new(LogStatusReporter::new());
        let registry = ModelRegistry::new(reporter.clone());
        registry.start_loading(Box::new(|| Err("no file".to_string())), mask_loader());
        assert!(registry.wait_until_ready(Duration::from_secs(5)).is_err());
        assert!(reporter
            .history()
            .iter()
            .any(|s| matches!(s, NodeStatus::Error(msg) if msg.contains("no file"))));
    }

    #[test]
    fn test_teardown_releases_both() {
        let registry = ModelRegistry::with_models(Arc::new(NoFaces), Arc::new(AlwaysMasked));
        registry.teardown();
        let status = registry.status();
        assert_eq!(status.face_locator, ModelStatus::Released);
        assert_eq!(status.mask_classifier, ModelStatus::Released);
        assert!(registry.mask_classifier(None).is_err());
    }
}

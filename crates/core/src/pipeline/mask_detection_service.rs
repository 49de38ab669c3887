use std::sync::Arc;
use std::time::Instant;

use crate::input::domain::image_decoder::ImageDecoder;
use crate::input::domain::image_source::ImageSource;
use crate::input::infrastructure::image_crate_decoder::ImageCrateDecoder;
use crate::models::model_registry::ModelRegistry;
use crate::models::onnx_models::{face_locator_loader, mask_classifier_loader, OnnxModelConfig};
use crate::pipeline::detect_masks_use_case::{DetectMasksUseCase, InferenceReport};
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::status_reporter::{NodeStatus, StatusReporter};
use crate::shared::error::PipelineError;

/// Long-lived entry point: owns the models and answers one image at a time.
///
/// [`MaskDetectionService::handle`] is the message-style interface: it
/// either yields the verdict string or reports the error and yields
/// nothing. [`MaskDetectionService::process`] exposes the full report.
pub struct MaskDetectionService {
    registry: Arc<ModelRegistry>,
    use_case: DetectMasksUseCase,
    decoder: Box<dyn ImageDecoder>,
    reporter: Arc<dyn StatusReporter>,
}

impl MaskDetectionService {
    pub fn new(
        registry: Arc<ModelRegistry>,
        decoder: Box<dyn ImageDecoder>,
        config: PipelineConfig,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        let use_case = DetectMasksUseCase::new(Arc::clone(&registry), config, Arc::clone(&reporter));
        Self {
            registry,
            use_case,
            decoder,
            reporter,
        }
    }

    /// Build a service backed by the ONNX models and start loading them.
    ///
    /// Returns immediately; requests wait for the models according to
    /// [`PipelineConfig::model_wait`].
    pub fn start(
        models: &OnnxModelConfig,
        config: PipelineConfig,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        let registry = Arc::new(ModelRegistry::new(Arc::clone(&reporter)));
        registry.start_loading(face_locator_loader(models), mask_classifier_loader(models));
        Self::new(registry, Box::new(ImageCrateDecoder::new()), config, reporter)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Decode `source` and run mask detection on it.
    pub fn process(&self, source: &ImageSource) -> Result<InferenceReport, PipelineError> {
        log::info!("Processing {}", source.describe());
        let bytes = source.read_bytes()?;

        let t0 = Instant::now();
        let frame = self.decoder.decode(&bytes)?;
        self.reporter
            .timing("decode", t0.elapsed().as_secs_f64() * 1000.0);

        self.use_case.execute(&frame)
    }

    /// Run one request and return the verdict string, or `None` on failure.
    ///
    /// Failures are logged and reported as [`NodeStatus::Error`]; they never
    /// escape to the caller.
    pub fn handle(&self, source: &ImageSource) -> Option<String> {
        self.reporter.status(NodeStatus::RunningInference);
        match self.process(source) {
            Ok(report) => {
                log::info!(
                    "{} ({} face(s), {} failed)",
                    report.signal(),
                    report.faces.len(),
                    report.failed_faces()
                );
                self.reporter.status(NodeStatus::Idle);
                Some(report.signal().to_string())
            }
            Err(e) => {
                log::error!("Inference failed for {}: {e}", source.describe());
                self.reporter.status(NodeStatus::Error(e.to_string()));
                None
            }
        }
    }

    /// Release both models. Later requests fail with `ModelUnavailable`.
    pub fn close(&self) {
        self.registry.teardown();
        self.reporter.summary();
    }
}

mod report;
mod settings;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use maskwatch_core::input::domain::image_source::ImageSource;
use maskwatch_core::models::onnx_models::OnnxModelConfig;
use maskwatch_core::pipeline::mask_detection_service::MaskDetectionService;
use maskwatch_core::pipeline::pipeline_config::PipelineConfig;
use maskwatch_core::pipeline::status_reporter::LogStatusReporter;
use maskwatch_core::shared::constants::IMAGE_EXTENSIONS;

use report::JsonReport;
use settings::{OnFaceError, Settings};

const STDIN_INPUT: &str = "-";

/// Face mask detection for images.
///
/// Prints "Danger Is Around" when any face is unmasked, otherwise
/// "Safety Ensured".
#[derive(Parser)]
#[command(name = "maskwatch")]
struct Cli {
    /// Input image files. Use - to read one image from stdin.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Face detection model file (skips cache lookup and download).
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Mask classification model file (skips cache lookup and download).
    #[arg(long)]
    mask_model: Option<PathBuf>,

    /// URL to download the face detection model from when not cached.
    #[arg(long)]
    face_model_url: Option<String>,

    /// URL to download the mask classification model from when not cached.
    #[arg(long)]
    mask_model_url: Option<String>,

    /// Directory searched for model files after the cache.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Faces with a mask probability below this are unmasked (0.0-1.0).
    #[arg(long)]
    mask_threshold: Option<f32>,

    /// What to do when a single face cannot be classified.
    #[arg(long, value_enum)]
    on_face_error: Option<OnFaceError>,

    /// Seconds to wait for models to load.
    #[arg(long)]
    load_timeout: Option<u64>,

    /// Milliseconds allowed per detection or classification call.
    #[arg(long)]
    inference_timeout: Option<u64>,

    /// Print one JSON object per input instead of the signal line.
    #[arg(long)]
    json: bool,

    /// Persist the effective settings for later runs.
    #[arg(long)]
    save_settings: bool,
}

impl Cli {
    /// Overlay flags given on the command line onto saved settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.face_model_url {
            settings.face_model_url = Some(url.clone());
        }
        if let Some(url) = &self.mask_model_url {
            settings.mask_model_url = Some(url.clone());
        }
        if let Some(dir) = &self.models_dir {
            settings.models_dir = Some(dir.clone());
        }
        if let Some(confidence) = self.confidence {
            settings.confidence = confidence;
        }
        if let Some(threshold) = self.mask_threshold {
            settings.mask_threshold = threshold;
        }
        if let Some(policy) = self.on_face_error {
            settings.on_face_error = policy;
        }
        if let Some(secs) = self.load_timeout {
            settings.load_timeout_secs = secs;
        }
        if let Some(ms) = self.inference_timeout {
            settings.inference_timeout_ms = Some(ms);
        }
    }
}

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when at least one input produced no verdict.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::load();
    cli.apply(&mut settings);
    validate(&cli, &settings)?;

    if cli.save_settings {
        let path = settings.save()?;
        log::info!("Settings saved to {}", path.display());
    }

    let reporter = Arc::new(LogStatusReporter::new());
    let service = MaskDetectionService::start(
        &model_config(&cli, &settings),
        pipeline_config(&settings),
        reporter,
    );
    serve(&cli, &settings, &service, &mut std::io::stdout())
}

/// Runs the inputs, then releases the models whether or not that succeeded.
fn serve(
    cli: &Cli,
    settings: &Settings,
    service: &MaskDetectionService,
    out: &mut dyn Write,
) -> Result<bool, Box<dyn std::error::Error>> {
    let outcome = detect_all(cli, settings, service, out);
    service.close();
    outcome
}

/// Runs every input through `service`, writing one line per input.
fn detect_all(
    cli: &Cli,
    settings: &Settings,
    service: &MaskDetectionService,
    out: &mut dyn Write,
) -> Result<bool, Box<dyn std::error::Error>> {
    service
        .registry()
        .wait_until_ready(Duration::from_secs(settings.load_timeout_secs))?;

    let mut all_ok = true;
    for input in &cli.inputs {
        let label = input.display().to_string();
        let source = read_source(input)?;
        if cli.json {
            let outcome = service.process(&source);
            all_ok &= outcome.is_ok();
            if let Err(e) = &outcome {
                log::error!("Inference failed for {label}: {e}");
            }
            writeln!(out, "{}", serde_json::to_string(&JsonReport::new(&label, &outcome))?)?;
        } else {
            match service.handle(&source) {
                Some(signal) => writeln!(out, "{signal}")?,
                None => all_ok = false,
            }
        }
    }
    Ok(all_ok)
}

fn model_config(cli: &Cli, settings: &Settings) -> OnnxModelConfig {
    let mut config = OnnxModelConfig {
        bundled_dir: settings.models_dir.clone(),
        confidence: settings.confidence,
        ..OnnxModelConfig::default()
    };
    config.face_locator.path = cli.face_model.clone();
    config.face_locator.url = settings.face_model_url.clone();
    config.mask_classifier.path = cli.mask_model.clone();
    config.mask_classifier.url = settings.mask_model_url.clone();
    config
}

fn pipeline_config(settings: &Settings) -> PipelineConfig {
    PipelineConfig {
        mask_threshold: settings.mask_threshold,
        failure_policy: settings.on_face_error.into(),
        inference_timeout: settings.inference_timeout_ms.map(Duration::from_millis),
        model_wait: Some(Duration::from_secs(settings.load_timeout_secs)),
        ..PipelineConfig::default()
    }
}

fn read_source(input: &Path) -> Result<ImageSource, Box<dyn std::error::Error>> {
    if is_stdin(input) {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(ImageSource::from(buf))
    } else {
        Ok(ImageSource::from(input.to_path_buf()))
    }
}

fn is_stdin(input: &Path) -> bool {
    input.as_os_str() == STDIN_INPUT
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if cli.inputs.iter().filter(|p| is_stdin(p)).count() > 1 {
        return Err("stdin (-) can only be used once".into());
    }
    for input in cli.inputs.iter().filter(|p| !is_stdin(p)) {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if !is_image(input) {
            log::warn!(
                "{} does not have a known image extension; trying anyway",
                input.display()
            );
        }
    }
    for model in [&cli.face_model, &cli.mask_model].into_iter().flatten() {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&settings.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            settings.confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&settings.mask_threshold) {
        return Err(format!(
            "Mask threshold must be between 0.0 and 1.0, got {}",
            settings.mask_threshold
        )
        .into());
    }
    if settings.load_timeout_secs == 0 {
        return Err("Load timeout must be at least 1 second".into());
    }
    if settings.inference_timeout_ms == Some(0) {
        return Err("Inference timeout must be at least 1 millisecond".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

use std::time::Duration;

pub const FACE_MODEL_NAME: &str = "blazeface.onnx";
pub const MASK_MODEL_NAME: &str = "mask_classifier.onnx";

/// Side length of the square face tensor fed to the mask classifier.
pub const MASK_INPUT_SIZE: usize = 224;

/// Pixel values are mapped to roughly [-1, 1] via `(v - 127.5) / 127.5`.
pub const NORM_OFFSET: f32 = 127.5;

/// A face is unmasked when its mask probability is strictly below this.
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.5;

pub const DANGER_SIGNAL: &str = "Danger Is Around";
pub const SAFE_SIGNAL: &str = "Safety Ensured";

pub const DEFAULT_MODEL_WAIT: Duration = Duration::from_secs(60);

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

use crate::input::domain::image_decoder::ImageDecoder;
use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;

/// Decodes PNG, JPEG, BMP, TIFF, WebP and friends with the `image` crate.
///
/// Sources with an alpha channel come out as 4-channel frames; everything
/// else (including grayscale) as RGB.
pub struct ImageCrateDecoder;

impl ImageCrateDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, PipelineError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::DecodeFailure(e.to_string()))?;

        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(PipelineError::DecodeFailure(format!(
                "image has zero dimensions ({width}x{height})"
            )));
        }

        let frame = if img.color().has_alpha() {
            Frame::new(img.into_rgba8().into_raw(), width, height, 4)
        } else {
            Frame::new(img.into_rgb8().into_raw(), width, height, 3)
        };
        Ok(frame)
    }
}

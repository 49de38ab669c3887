use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;

/// Turns encoded image bytes into a [`Frame`].
///
/// Implementations keep an alpha channel if the source has one; stripping
/// it is the pipeline's job.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, PipelineError>;
}

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Knobs accepted by a face locator.
///
/// The pipeline always passes the default (everything off).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Ask for raw model tensors. Rust locators always return materialized
    /// boxes, so implementations may ignore this.
    pub return_tensors: bool,
    /// Mirror results horizontally, for selfie-style input.
    pub flip_horizontal: bool,
    /// Attach detection probability and facial landmarks to each box.
    pub annotate_boxes: bool,
}

/// Domain interface for face detection.
///
/// Returned boxes must lie within the frame. Order carries no meaning and
/// an empty result is valid.
pub trait FaceLocator: Send + Sync {
    fn locate(
        &self,
        frame: &Frame,
        options: LocatorOptions,
    ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}

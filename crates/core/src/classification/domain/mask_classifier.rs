use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::domain::face_normalizer::NormalizedFace;

/// Domain interface for mask classification of a single normalized face.
pub trait MaskClassifier: Send + Sync {
    fn classify(
        &self,
        face: &NormalizedFace,
    ) -> Result<ClassificationResult, Box<dyn std::error::Error>>;
}

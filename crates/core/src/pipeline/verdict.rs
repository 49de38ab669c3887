use std::fmt;

use crate::classification::domain::classification_result::ClassificationResult;
use crate::shared::constants::{DANGER_SIGNAL, SAFE_SIGNAL};

/// Overall outcome for one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// At least one face is unmasked.
    Danger,
    /// No faces, or every face is masked.
    Safe,
}

impl Verdict {
    /// Verdict contributed by a single face.
    pub fn for_face(result: &ClassificationResult, threshold: f32) -> Self {
        if result.is_unmasked(threshold) {
            Verdict::Danger
        } else {
            Verdict::Safe
        }
    }

    /// Danger absorbs; Safe is the identity.
    pub fn combine(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Safe, Verdict::Safe) => Verdict::Safe,
            _ => Verdict::Danger,
        }
    }

    /// Fold per-face results into one verdict. An empty input is Safe.
    pub fn from_results<'a, I>(results: I, threshold: f32) -> Self
    where
        I: IntoIterator<Item = &'a ClassificationResult>,
    {
        results
            .into_iter()
            .map(|r| Verdict::for_face(r, threshold))
            .fold(Verdict::Safe, Verdict::combine)
    }

    /// The string emitted downstream.
    pub fn signal(&self) -> &'static str {
        match self {
            Verdict::Danger => DANGER_SIGNAL,
            Verdict::Safe => SAFE_SIGNAL,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signal())
    }
}

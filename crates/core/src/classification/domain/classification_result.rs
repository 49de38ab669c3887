/// Mask / no-mask probabilities for one face. The pair sums to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassificationResult {
    pub mask_probability: f32,
    pub no_mask_probability: f32,
}

impl ClassificationResult {
    /// Build from two non-negative scores, rescaling so they sum to 1.
    pub fn from_probabilities(mask: f32, no_mask: f32) -> Result<Self, String> {
        if !mask.is_finite() || !no_mask.is_finite() || mask < 0.0 || no_mask < 0.0 {
            return Err(format!(
                "probabilities must be finite and non-negative, got ({mask}, {no_mask})"
            ));
        }
        let total = mask + no_mask;
        if total <= 0.0 {
            return Err("probabilities sum to zero".to_string());
        }
        Ok(Self {
            mask_probability: mask / total,
            no_mask_probability: no_mask / total,
        })
    }

    /// Build from raw model scores. Scores already forming a probability
    /// pair are kept; anything else is treated as logits.
    pub fn from_scores(mask: f32, no_mask: f32) -> Result<Self, String> {
        let is_distribution = (0.0..=1.0).contains(&mask)
            && (0.0..=1.0).contains(&no_mask)
            && ((mask + no_mask) - 1.0).abs() < 1e-3;
        if is_distribution {
            Self::from_probabilities(mask, no_mask)
        } else {
            let [m, n] = softmax([mask, no_mask]);
            Self::from_probabilities(m, n)
        }
    }

    /// True when this face counts as unmasked under `threshold`.
    pub fn is_unmasked(&self, threshold: f32) -> bool {
        self.mask_probability < threshold
    }
}

fn softmax(scores: [f32; 2]) -> [f32; 2] {
    let max = scores[0].max(scores[1]);
    let e = scores.map(|s| (s - max).exp());
    let sum = e[0] + e[1];
    [e[0] / sum, e[1] / sum]
}

use serde::{Deserialize, Serialize};

/// Sampling knobs passed from the engine to backends.
/// Backends should treat these as *desired* settings and ignore what they cannot honour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: Option<f32>, // > 0.0 enables temperature scaling
    pub top_k: Option<u32>,       // >= 1 keeps the K most likely candidates
    pub top_p: Option<f32>,       // (0, 1] nucleus sampling

    /// Repetition penalty over the last `repeat_last_n` tokens.
    pub repeat_penalty: Option<f32>,
    pub repeat_last_n: i32,

    /// Number of top candidates whose log-probabilities the caller wants back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_probs: Option<u32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: Some(0.8),
            top_k: Some(40),
            top_p: Some(0.95),
            repeat_penalty: Some(1.1),
            repeat_last_n: 64,
            n_probs: None,
        }
    }
}

impl SamplingParams {
    /// Returns a clamped copy safe to hand to a backend.
    ///
    /// - temperature <= 0 → disabled (greedy)
    /// - top_k < 1 → disabled
    /// - top_p ∉ (0, 1] → disabled
    /// - repeat_penalty < 1.0 → clamped to 1.0
    /// - repeat_last_n < 0 → clamped to 0
    pub fn normalized(&self) -> Self {
        let mut p = self.clone();

        if p.temperature.is_some_and(|t| t <= 0.0 || !t.is_finite()) {
            p.temperature = None;
        }
        if p.top_k.is_some_and(|k| k < 1) {
            p.top_k = None;
        }
        if p.top_p.is_some_and(|tp| !(tp > 0.0 && tp <= 1.0)) {
            p.top_p = None;
        }
        if let Some(rp) = p.repeat_penalty {
            if !rp.is_finite() {
                p.repeat_penalty = None;
            } else if rp < 1.0 {
                p.repeat_penalty = Some(1.0);
            }
        }
        if p.repeat_last_n < 0 {
            p.repeat_last_n = 0;
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_drops_out_of_range_filters() {
        let p = SamplingParams {
            temperature: Some(0.0),
            top_k: Some(0),
            top_p: Some(1.5),
            repeat_penalty: Some(0.5),
            repeat_last_n: -3,
            n_probs: None,
        }
        .normalized();

        assert_eq!(p.temperature, None);
        assert_eq!(p.top_k, None);
        assert_eq!(p.top_p, None);
        assert_eq!(p.repeat_penalty, Some(1.0));
        assert_eq!(p.repeat_last_n, 0);
    }

    #[test]
    fn normalized_keeps_valid_values() {
        let p = SamplingParams::default();
        assert_eq!(p.normalized(), p);
    }
}

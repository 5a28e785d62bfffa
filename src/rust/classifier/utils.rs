use super::labels::{LabelMap, ToxicityLabel, NONE_LABEL};

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Maps raw logits onto per-label probabilities. Labels are independent, so
/// each logit goes through its own sigmoid and nothing is normalized.
pub(crate) fn probabilities_from_logits(logits: &[f32]) -> LabelMap<f32> {
    LabelMap::from_fn(|label| sigmoid(logits[label.index()]))
}

/// Labels whose probability reaches `threshold`, in label order, or
/// `["none"]` when nothing does.
pub(crate) fn select_labels(probabilities: &LabelMap<f32>, threshold: f32) -> Vec<String> {
    let selected: Vec<String> = probabilities
        .iter()
        .filter(|&(_, p)| p >= threshold)
        .map(|(label, _)| label.as_str().to_string())
        .collect();

    if selected.is_empty() {
        vec![NONE_LABEL.to_string()]
    } else {
        selected
    }
}

pub(crate) fn validate_threshold(threshold: f32) -> Result<(), String> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(format!("Threshold must be between 0 and 1, got {}", threshold))
    }
}

pub(crate) const LABEL_COUNT: usize = ToxicityLabel::ALL.len();

use serde::{Deserialize, Serialize};

mod error;
mod encoding;
mod classifier;
pub mod builder;
pub mod labels;
mod utils;

pub use error::ClassifierError;
pub use classifier::{Classifier, CommentClassifier};
pub use builder::ClassifierBuilder;
pub use labels::{LabelMap, ToxicityLabel, UnknownLabel, NONE_LABEL};

/// Result of classifying one comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Labels at or above the threshold, in label order, or `["none"]`
    pub labels: Vec<String>,
    /// Independent sigmoid probability for each of the six labels
    pub probabilities: LabelMap<f32>,
}

impl Classification {
    /// True when no label reached the threshold.
    pub fn is_clean(&self) -> bool {
        self.labels.len() == 1 && self.labels[0] == NONE_LABEL
    }
}

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Path to the tokenizer file
    pub tokenizer_path: String,
    /// Label names in model output order
    pub labels: Vec<String>,
    /// Token count inputs are truncated to
    pub max_sequence_length: usize,
    /// Default decision threshold
    pub threshold: f32,
}

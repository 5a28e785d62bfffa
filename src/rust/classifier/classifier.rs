use std::sync::Arc;
use ort::session::Session;
use tokenizers::Tokenizer;
use log::debug;

use super::error::ClassifierError;
use super::encoding::SequenceScoring;
use super::labels::ToxicityLabel;
use super::utils::{probabilities_from_logits, select_labels, validate_threshold, LABEL_COUNT};
use super::Classification;
use crate::ModelCharacteristics;

/// The classification seam used by the HTTP layer.
///
/// `Classifier` is the production implementation; anything that can turn a
/// comment into a [`Classification`] can stand in for it.
pub trait CommentClassifier: Send + Sync {
    /// Scores `text` and keeps every label whose probability reaches `threshold`.
    fn classify(&self, text: &str, threshold: f32) -> Result<Classification, ClassifierError>;

    /// Threshold applied when the caller does not pick one.
    fn default_threshold(&self) -> f32;

    /// Classifies with [`CommentClassifier::default_threshold`].
    fn predict(&self, text: &str) -> Result<Classification, ClassifierError> {
        self.classify(text, self.default_threshold())
    }
}

/// A thread-safe multi-label toxicity classifier backed by an ONNX
/// sequence-classification model.
///
/// # Thread Safety
///
/// This type is automatically `Send + Sync` because all of its fields are thread-safe:
/// - `String` and `ModelCharacteristics` are `Send + Sync`
/// - `Tokenizer` and `Session` are wrapped in `Arc`
///
/// The loaded model is never mutated after `build()`, so one instance can
/// serve every request of the process:
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use toxiclass::Classifier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(Classifier::builder()
///     .with_custom_model("model.onnx", "tokenizer.json", Some(512))?
///     .build()?);
///
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     classifier_clone.predict("test text").unwrap();
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier {
    pub model_path: String,
    pub tokenizer_path: String,
    pub tokenizer: Arc<Tokenizer>,
    pub session: Arc<Session>,
    pub model_characteristics: ModelCharacteristics,
    pub threshold: f32,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl SequenceScoring for Classifier {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        Some(&self.tokenizer)
    }

    fn session(&self) -> Option<&Session> {
        Some(&self.session)
    }
}

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
            labels: ToxicityLabel::ALL.iter().map(|l| l.as_str().to_string()).collect(),
            max_sequence_length: self.model_characteristics.max_sequence_length,
            threshold: self.threshold,
        }
    }

    /// Number of tokens the model sees for `text` after truncation.
    pub fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        SequenceScoring::count_tokens(self, text)
    }

    /// Classifies `text`, returning per-label probabilities and the labels at
    /// or above `threshold`.
    ///
    /// Input longer than the model's maximum sequence length is truncated.
    ///
    /// # Example
    /// ```no_run
    /// # use toxiclass::Classifier;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let classifier = Classifier::builder()
    /// #     .with_custom_model("model.onnx", "tokenizer.json", None)?
    /// #     .build()?;
    /// let result = classifier.classify("I will find you", 0.5)?;
    /// println!("labels: {:?}", result.labels);
    /// for (label, p) in result.probabilities.iter() {
    ///     println!("{}: {:.3}", label, p);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn classify(&self, text: &str, threshold: f32) -> Result<Classification, ClassifierError> {
        if text.is_empty() {
            return Err(ClassifierError::ValidationError("Input text cannot be empty".into()));
        }
        validate_threshold(threshold).map_err(ClassifierError::ValidationError)?;

        let logits = self.score_text(text)?;
        if logits.len() != LABEL_COUNT {
            return Err(ClassifierError::PredictionError(format!(
                "Expected {} logits from the model, got {}",
                LABEL_COUNT,
                logits.len()
            )));
        }

        let probabilities = probabilities_from_logits(&logits);
        let labels = select_labels(&probabilities, threshold);
        debug!("Classified {} chars as {:?}", text.chars().count(), labels);

        Ok(Classification { labels, probabilities })
    }

    /// Classifies with the threshold configured on the builder.
    pub fn predict(&self, text: &str) -> Result<Classification, ClassifierError> {
        self.classify(text, self.threshold)
    }
}

impl CommentClassifier for Classifier {
    fn classify(&self, text: &str, threshold: f32) -> Result<Classification, ClassifierError> {
        Classifier::classify(self, text, threshold)
    }

    fn default_threshold(&self) -> f32 {
        self.threshold
    }
}

use std::path::Path;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use ort::session::Session;
use log::{info, error};

use super::error::ClassifierError;
use super::encoding::SequenceScoring;
use super::classifier::Classifier;
use super::utils::{validate_threshold, LABEL_COUNT};
use crate::{BuiltinModel, ModelCharacteristics, ModelInfo, ModelManager, runtime::{RuntimeConfig, create_session_builder}};

/// Threshold used when none is configured.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

const PROBE_TEXT: &str = "Test input to check the model output shape";

/// A builder for constructing a Classifier with a fluent interface.
#[derive(Debug)]
pub struct ClassifierBuilder {
    model_path: Option<String>,
    tokenizer_path: Option<String>,
    tokenizer: Option<Tokenizer>,
    session: Option<Session>,
    max_sequence_length: Option<usize>,
    threshold: f32,
    runtime_config: RuntimeConfig,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceScoring for ClassifierBuilder {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        self.tokenizer.as_ref()
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use toxiclass::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model_path: None,
            tokenizer_path: None,
            tokenizer: None,
            session: None,
            max_sequence_length: None,
            threshold: DEFAULT_THRESHOLD,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution.
    /// Must be called before the model is loaded to take effect.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the default decision threshold used by `predict`.
    ///
    /// # Example
    /// ```
    /// use toxiclass::ClassifierBuilder;
    ///
    /// assert!(ClassifierBuilder::new().with_threshold(0.7).is_ok());
    /// assert!(ClassifierBuilder::new().with_threshold(1.7).is_err());
    /// ```
    pub fn with_threshold(mut self, threshold: f32) -> Result<Self, ClassifierError> {
        validate_threshold(threshold).map_err(ClassifierError::ValidationError)?;
        self.threshold = threshold;
        Ok(self)
    }

    /// Overrides the token count inputs are truncated to.
    pub fn with_max_sequence_length(mut self, max_sequence_length: usize) -> Self {
        self.max_sequence_length = Some(max_sequence_length);
        self
    }

    /// Loads a model previously fetched by the given [`ModelManager`].
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - The model paths are already set
    ///   - The model is not downloaded
    ///   - The model or tokenizer failed to load
    ///   - The model structure is invalid
    pub fn with_model(self, manager: &ModelManager, model: &ModelInfo) -> Result<Self, ClassifierError> {
        if self.model_path.is_some() || self.tokenizer_path.is_some() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths already set".to_string()));
        }

        let (model_path, tokenizer_path) = manager.local_files(model).map_err(|_| {
            ClassifierError::BuildError(format!(
                "Model '{}' is not downloaded. Please download it first using ModelManager::download_model()",
                model.name
            ))
        })?;

        self.load(&model_path, &tokenizer_path)
    }

    /// Loads the built-in toxicity model from the manager's cache.
    pub fn with_builtin_model(self, manager: &ModelManager, model: BuiltinModel) -> Result<Self, ClassifierError> {
        let characteristics = model.characteristics();
        self.with_model(manager, &model.get_model_info())
            .map(|builder| builder.with_max_sequence_length(characteristics.max_sequence_length))
    }

    /// Sets a custom model and tokenizer path for the classifier
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `tokenizer_path` - Path to the tokenizer file
    /// * `max_sequence_length` - Optional maximum sequence length for the model. If not provided,
    ///   defaults to 512 tokens, the BERT limit.
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - The model or tokenizer paths are empty
    ///   - The paths are already set
    ///   - The files don't exist
    ///   - The model or tokenizer failed to load
    ///   - The model structure is invalid
    pub fn with_custom_model(
        mut self,
        model_path: &str,
        tokenizer_path: &str,
        max_sequence_length: Option<usize>,
    ) -> Result<Self, ClassifierError> {
        if model_path.is_empty() || tokenizer_path.is_empty() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths cannot be empty".to_string()));
        }
        if self.model_path.is_some() || self.tokenizer_path.is_some() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths already set".to_string()));
        }

        if !Path::new(model_path).exists() {
            return Err(ClassifierError::BuildError(format!("Model file not found: {}", model_path)));
        }
        if !Path::new(tokenizer_path).exists() {
            return Err(ClassifierError::BuildError(format!("Tokenizer file not found: {}", tokenizer_path)));
        }

        if let Some(len) = max_sequence_length {
            self.max_sequence_length = Some(len);
        }
        self.load(Path::new(model_path), Path::new(tokenizer_path))
    }

    fn load(mut self, model_path: &Path, tokenizer_path: &Path) -> Result<Self, ClassifierError> {
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| {
                error!("Failed to load tokenizer: {}", e);
                ClassifierError::BuildError(format!("Failed to load tokenizer: {}", e))
            })?;

        info!("Tokenizer loaded from {:?}", tokenizer_path);

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)?;

        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.tokenizer_path = Some(tokenizer_path.to_string_lossy().to_string());
        self.tokenizer = Some(tokenizer);
        self.session = Some(session);
        Ok(self)
    }

    /// Builds and returns the final Classifier instance
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The constructed Classifier if successful, or an error if:
    ///   - No model and tokenizer paths are set
    ///   - Truncation cannot be configured on the tokenizer
    ///   - The model does not produce one logit per toxicity label
    pub fn build(mut self) -> Result<Classifier, ClassifierError> {
        let (model_path, tokenizer_path) = match (self.model_path.take(), self.tokenizer_path.take()) {
            (Some(model), Some(tokenizer)) => (model, tokenizer),
            _ => return Err(ClassifierError::BuildError("Model and tokenizer paths must be set".to_string())),
        };

        let defaults = BuiltinModel::ToxicBert.characteristics();
        let max_sequence_length = self.max_sequence_length.unwrap_or(defaults.max_sequence_length);
        if max_sequence_length == 0 {
            return Err(ClassifierError::BuildError("Max sequence length must be positive".to_string()));
        }

        let tokenizer = self.tokenizer.as_mut()
            .ok_or_else(|| ClassifierError::BuildError("No tokenizer loaded".into()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| ClassifierError::BuildError(format!("Failed to set truncation: {}", e)))?;
        tokenizer.with_padding(None);

        let logits = self.score_text(PROBE_TEXT)?;
        if logits.len() != LABEL_COUNT {
            return Err(ClassifierError::BuildError(format!(
                "Model must output {} logits (one per toxicity label), found {}",
                LABEL_COUNT,
                logits.len()
            )));
        }
        info!("Model outputs {} labels, truncating inputs at {} tokens", logits.len(), max_sequence_length);

        let tokenizer = Arc::new(self.tokenizer.take()
            .ok_or_else(|| ClassifierError::BuildError("No tokenizer loaded".into()))?);
        let session = Arc::new(self.session.take()
            .ok_or_else(|| ClassifierError::BuildError("No ONNX model loaded".into()))?);

        Ok(Classifier {
            model_path,
            tokenizer_path,
            tokenizer,
            session,
            model_characteristics: ModelCharacteristics {
                num_labels: LABEL_COUNT,
                max_sequence_length,
                model_size_mb: defaults.model_size_mb,
            },
            threshold: self.threshold,
        })
    }

    /// Validates that the model has the expected input/output structure
    ///
    /// # Returns
    /// * `Result<(), ClassifierError>` - Ok if validation passes, or an error if:
    ///   - The model doesn't have the required input tensors
    ///   - The model doesn't have any output tensors
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        let inputs = &session.inputs;
        for required in ["input_ids", "attention_mask"] {
            if !inputs.iter().any(|input| input.name == required) {
                return Err(ClassifierError::ModelError(format!(
                    "Model is missing the '{}' input, found {:?}",
                    required,
                    inputs.iter().map(|input| input.name.as_str()).collect::<Vec<_>>()
                )));
            }
        }

        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for logits".to_string()
            ));
        }

        Ok(())
    }
}

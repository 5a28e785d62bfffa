use tokenizers::{Encoding, Tokenizer};
use ort::session::Session;
use ndarray::Array2;
use ort::value::Tensor;
use std::collections::HashMap;

use super::error::ClassifierError;

/// Runs text through a sequence-classification ONNX model.
///
/// This trait handles the conversion of text into raw class logits through:
/// 1. Tokenization of input text, truncated to the model's maximum length
/// 2. Building the `[1, sequence_length]` input tensors
/// 3. Running the ONNX model and flattening its `[1, num_labels]` output
///
/// The ONNX model is expected to:
/// - Accept `input_ids` and `attention_mask`, and optionally `token_type_ids`
/// - Output logits of shape [batch_size, num_labels] as its first output
pub(crate) trait SequenceScoring {
    /// Returns the initialized tokenizer if available
    fn tokenizer(&self) -> Option<&Tokenizer>;

    /// Returns the initialized ONNX session if available
    fn session(&self) -> Option<&Session>;

    /// Counts the tokens the model will see for `text`, special tokens included.
    ///
    /// # Errors
    /// - `TokenizerError` if the tokenizer is not initialized
    /// - `TokenizerError` if the text cannot be encoded
    fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        self.encode(text).map(|encoding| encoding.get_ids().len())
    }

    /// Encodes text with special tokens. Truncation is configured on the
    /// tokenizer itself when the classifier is built.
    fn encode(&self, text: &str) -> Result<Encoding, ClassifierError> {
        let tokenizer = self.tokenizer()
            .ok_or_else(|| ClassifierError::TokenizerError("Tokenizer not initialized".into()))?;

        let encoding = tokenizer.encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;

        if encoding.get_ids().is_empty() {
            return Err(ClassifierError::TokenizerError("Tokenizer produced no tokens".into()));
        }
        Ok(encoding)
    }

    /// Tokenizes `text` and returns the model's raw output logits.
    fn score_text(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let encoding = self.encode(text)?;
        self.run_model(&encoding)
    }

    /// Runs the ONNX model over an encoded sequence.
    ///
    /// # Model Input Format
    /// - input_ids: Token IDs [batch_size=1, sequence_length]
    /// - attention_mask: 1 for real tokens, 0 for padding [batch_size=1, sequence_length]
    /// - token_type_ids: segment IDs, only fed when the graph declares the input
    ///
    /// # Errors
    /// - `ModelError` if the session is not initialized
    /// - `ModelError` if tensor creation fails
    /// - `ModelError` if model execution fails
    /// - `ModelError` if output extraction fails
    fn run_model(&self, encoding: &Encoding) -> Result<Vec<f32>, ClassifierError> {
        let session = self.session()
            .ok_or_else(|| ClassifierError::ModelError("Session not initialized".into()))?;

        let seq_len = encoding.get_ids().len();
        let to_i64 = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<i64>>();

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", tensor_from(seq_len, to_i64(encoding.get_ids()), "input")?);
        input_tensors.insert("attention_mask", tensor_from(seq_len, to_i64(encoding.get_attention_mask()), "mask")?);
        if session.inputs.iter().any(|input| input.name == "token_type_ids") {
            input_tensors.insert("token_type_ids", tensor_from(seq_len, to_i64(encoding.get_type_ids()), "token type")?);
        }

        let outputs = session.run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e)))?;

        Ok(output_tensor.iter().copied().collect())
    }
}

fn tensor_from(seq_len: usize, values: Vec<i64>, what: &str) -> Result<Tensor<i64>, ClassifierError> {
    let array = Array2::from_shape_vec((1, seq_len), values)
        .map_err(|e| ClassifierError::ModelError(format!("Failed to create {} array: {}", what, e)))?;
    Tensor::from_array(array)
        .map_err(|e| ClassifierError::ModelError(format!("Failed to create {} tensor: {}", what, e)))
}

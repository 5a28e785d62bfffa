/// Hugging Face hub host used to resolve model files.
pub const HUB_URL: &str = "https://huggingface.co";

/// Represents the available built-in models in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    /// BERT-base fine-tuned on the Jigsaw toxic comment dataset
    ///
    /// Characteristics:
    /// - Labels: toxic, severe_toxic, obscene, threat, insult, identity_hate
    /// - Max sequence length: 512
    /// - Size: ~440MB
    ToxicBert,
}

/// Characteristics of a model including its capabilities and requirements
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCharacteristics {
    /// Number of independent labels in the model output
    pub num_labels: usize,
    /// Maximum sequence length the model can handle
    pub max_sequence_length: usize,
    /// Approximate size of the model on disk
    pub model_size_mb: usize,
}

/// Where the files of a model live on the hub, and the digests they must match.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Local directory name under the models cache. Distinct for every
    /// repository, revision and model file, so a changed source never reuses
    /// stale files.
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
    /// Expected SHA-256 of the model file, hex encoded. `None` skips the check.
    pub model_hash: Option<String>,
    /// Expected SHA-256 of the tokenizer file, hex encoded. `None` skips the check.
    pub tokenizer_hash: Option<String>,
}

impl ModelInfo {
    /// Describes a model hosted in a hub repository.
    ///
    /// ```
    /// use toxiclass::ModelInfo;
    ///
    /// let info = ModelInfo::from_hub("unitary/toxic-bert", "main", "onnx/model.onnx", "tokenizer.json");
    /// assert_eq!(info.name, "unitary--toxic-bert--main--onnx--model.onnx");
    /// assert_eq!(
    ///     info.tokenizer_url,
    ///     "https://huggingface.co/unitary/toxic-bert/resolve/main/tokenizer.json"
    /// );
    /// ```
    pub fn from_hub(repo_id: &str, revision: &str, model_file: &str, tokenizer_file: &str) -> Self {
        let resolve = |file: &str| format!("{}/{}/resolve/{}/{}", HUB_URL, repo_id, revision, file);
        Self {
            name: format!(
                "{}--{}--{}",
                repo_id.replace('/', "--"),
                revision.replace('/', "--"),
                model_file.replace('/', "--")
            ),
            model_url: resolve(model_file),
            tokenizer_url: resolve(tokenizer_file),
            model_hash: None,
            tokenizer_hash: None,
        }
    }

    pub fn with_hashes(mut self, model_hash: Option<String>, tokenizer_hash: Option<String>) -> Self {
        self.model_hash = model_hash.map(|h| h.to_lowercase());
        self.tokenizer_hash = tokenizer_hash.map(|h| h.to_lowercase());
        self
    }
}

impl BuiltinModel {
    pub const TOXIC_BERT_REPO: &'static str = "unitary/toxic-bert";

    /// Get the characteristics of the model
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::ToxicBert => ModelCharacteristics {
                num_labels: 6,
                max_sequence_length: 512,
                model_size_mb: 440,
            },
        }
    }

    /// Hub location of the model files
    pub fn get_model_info(&self) -> ModelInfo {
        match self {
            Self::ToxicBert => ModelInfo::from_hub(
                Self::TOXIC_BERT_REPO,
                "main",
                "onnx/model.onnx",
                "tokenizer.json",
            ),
        }
    }
}

//! Service configuration read from the process environment (and `.env`).

use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::classifier::builder::DEFAULT_THRESHOLD;
use crate::model_manager::ModelManager;
use crate::models::{BuiltinModel, ModelInfo};
use crate::runtime::RuntimeConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model: ModelConfig,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub threshold: f32,
    pub runtime: RuntimeConfig,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub hf_token: Option<String>,
    pub repo_id: String,
    pub revision: String,
    pub model_file: String,
    pub tokenizer_file: String,
    pub model_sha256: Option<String>,
    pub tokenizer_sha256: Option<String>,
    pub cache_dir: PathBuf,
    pub max_sequence_length: usize,
}

impl ModelConfig {
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo::from_hub(&self.repo_id, &self.revision, &self.model_file, &self.tokenizer_file)
            .with_hashes(self.model_sha256.clone(), self.tokenizer_sha256.clone())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let builtin = BuiltinModel::ToxicBert;
        Self {
            model: ModelConfig {
                hf_token: None,
                repo_id: BuiltinModel::TOXIC_BERT_REPO.to_string(),
                revision: "main".to_string(),
                model_file: "onnx/model.onnx".to_string(),
                tokenizer_file: "tokenizer.json".to_string(),
                model_sha256: None,
                tokenizer_sha256: None,
                cache_dir: ModelManager::get_default_models_dir(),
                max_sequence_length: builtin.characteristics().max_sequence_length,
            },
            db_path: PathBuf::from("feedback_data.db"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            threshold: DEFAULT_THRESHOLD,
            runtime: RuntimeConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Reads every setting from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let model = ModelConfig {
            hf_token: text("HF_TOKEN"),
            repo_id: text("TOXICLASS_MODEL_ID").unwrap_or(defaults.model.repo_id),
            revision: text("TOXICLASS_MODEL_REVISION").unwrap_or(defaults.model.revision),
            model_file: text("TOXICLASS_MODEL_FILE").unwrap_or(defaults.model.model_file),
            tokenizer_file: text("TOXICLASS_TOKENIZER_FILE").unwrap_or(defaults.model.tokenizer_file),
            model_sha256: text("TOXICLASS_MODEL_SHA256"),
            tokenizer_sha256: text("TOXICLASS_TOKENIZER_SHA256"),
            cache_dir: text("TOXICLASS_CACHE")
                .map(|dir| PathBuf::from(dir).join("models"))
                .unwrap_or(defaults.model.cache_dir),
            max_sequence_length: parse(&lookup, "TOXICLASS_MAX_SEQUENCE_LENGTH")?
                .unwrap_or(defaults.model.max_sequence_length),
        };

        let threshold = parse::<f32>(&lookup, "TOXICLASS_THRESHOLD")?.unwrap_or(defaults.threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                key: "TOXICLASS_THRESHOLD",
                value: threshold.to_string(),
            });
        }

        let runtime = RuntimeConfig::default().with_threads(
            parse(&lookup, "TOXICLASS_INTER_THREADS")?.unwrap_or(0),
            parse(&lookup, "TOXICLASS_INTRA_THREADS")?.unwrap_or(0),
        );

        Ok(Self {
            model,
            db_path: text("TOXICLASS_DB").map(PathBuf::from).unwrap_or(defaults.db_path),
            host: text("TOXICLASS_HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "TOXICLASS_PORT")?.unwrap_or(defaults.port),
            threshold,
            runtime,
            log_level: text("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Host and port to bind. The host may be an IP address or a name
    /// such as `localhost`; resolution happens at bind time.
    pub fn listen_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.model.repo_id, "unitary/toxic-bert");
        assert_eq!(config.db_path, PathBuf::from("feedback_data.db"));
        assert_eq!(config.port, 8000);
        assert_eq!(config.threshold, 0.5);
        assert!(config.model.hf_token.is_none());
        assert_eq!(config.listen_addr(), ("0.0.0.0", 8000));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HF_TOKEN", "hf_secret"),
            ("TOXICLASS_PORT", "9001"),
            ("TOXICLASS_THRESHOLD", "0.7"),
            ("TOXICLASS_CACHE", "/tmp/cache"),
            ("TOXICLASS_MODEL_SHA256", "ABC"),
        ])
        .unwrap();
        assert_eq!(config.model.hf_token.as_deref(), Some("hf_secret"));
        assert_eq!(config.port, 9001);
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.model.cache_dir, PathBuf::from("/tmp/cache/models"));
        assert_eq!(config.model.model_info().model_hash.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_hostname_listen_addr_binds() {
        let config = config_from(&[("TOXICLASS_HOST", "localhost"), ("TOXICLASS_PORT", "0")]).unwrap();
        assert_eq!(config.listen_addr(), ("localhost", 0));

        let listener = tokio::net::TcpListener::bind(config.listen_addr()).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[("TOXICLASS_PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "TOXICLASS_PORT", .. })
        ));
        assert!(config_from(&[("TOXICLASS_THRESHOLD", "2")]).is_err());
    }
}

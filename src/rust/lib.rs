//! A toxic comment classification service built on ONNX Runtime.
//!
//! The crate pairs a multi-label toxicity classifier (BERT fine-tuned on the
//! Jigsaw dataset, exported to ONNX) with a small SQLite table of user
//! feedback, and exposes both over a JSON HTTP API.
//!
//! # Basic Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use toxiclass::{BuiltinModel, Classifier, ModelManager};
//!
//! let manager = ModelManager::new_default()?;
//! let model = BuiltinModel::ToxicBert;
//! manager.ensure_model_downloaded(&model.get_model_info()).await?;
//!
//! let classifier = Classifier::builder()
//!     .with_builtin_model(&manager, model)?
//!     .build()?;
//!
//! let result = classifier.classify("You are wonderful", 0.5)?;
//! assert_eq!(result.labels, vec!["none"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The classifier is immutable once built and can be shared across threads
//! and requests using `Arc`. The HTTP layer holds it as an
//! `Arc<dyn CommentClassifier>` next to the feedback repository.

pub mod api;
pub mod classifier;
pub mod config;
pub mod feedback;
mod runtime;
pub mod model_manager;
pub mod models;

pub use classifier::{
    Classification, Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo,
    CommentClassifier, LabelMap, ToxicityLabel, NONE_LABEL,
};
pub use runtime::{RuntimeConfig, create_session_builder};
pub use model_manager::{ModelManager, ModelError};
pub use models::{BuiltinModel, ModelCharacteristics, ModelInfo};
pub use feedback::{FeedbackEntry, FeedbackRepository, StoreError, ValidationError};
pub use config::{ConfigError, ServiceConfig};

/// Initializes `env_logger`, honouring `RUST_LOG` and falling back to `default_level`.
/// Safe to call more than once.
pub fn init_logger(default_level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

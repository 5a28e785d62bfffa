//! User feedback: ground-truth labelings of comments, stored for later review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{LabelMap, ToxicityLabel, NONE_LABEL};

mod error;
mod store;

pub use error::{StoreError, ValidationError};
pub use store::{init_pool, FeedbackRepository};

/// Rows returned by `list` when the caller does not say.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// A persisted feedback row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: i64,
    pub comment: String,
    #[serde(flatten)]
    pub labels: LabelMap<bool>,
    pub timestamp: DateTime<Utc>,
}

/// Turns the submitted label names into one flag per toxicity label.
///
/// Every name must be a toxicity label or `none`; the error lists all
/// offending names in submission order. `none` is informational and may be
/// combined with real labels.
pub fn parse_expected_labels<S: AsRef<str>>(expected: &[S]) -> Result<LabelMap<bool>, ValidationError> {
    let invalid: Vec<String> = expected
        .iter()
        .map(|name| -> &str { name.as_ref() })
        .filter(|name| *name != NONE_LABEL && name.parse::<ToxicityLabel>().is_err())
        .map(str::to_string)
        .collect();

    if !invalid.is_empty() {
        return Err(ValidationError::InvalidLabels(invalid));
    }

    Ok(LabelMap::from_fn(|label| {
        expected.iter().any(|name| name.as_ref() == label.as_str())
    }))
}

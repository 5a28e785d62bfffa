use thiserror::Error;

/// Request input rejected before anything is stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid labels: {}", .0.join(", "))]
    InvalidLabels(Vec<String>),
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: i64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

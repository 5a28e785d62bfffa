use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Html, Redirect};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;
use crate::classifier::{Classification, ClassifierError};
use crate::feedback::{FeedbackEntry, DEFAULT_PAGE_SIZE};

/// Longest comment accepted by `/classify`, in characters.
pub const MAX_COMMENT_CHARS: usize = 1000;

pub const FEEDBACK_STORED: &str = "Feedback stored successfully";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub comment: String,
}

impl ClassifyRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let chars = self.comment.chars().count();
        if chars == 0 {
            return Err(ApiError::Validation("comment must not be empty".into()));
        }
        if chars > MAX_COMMENT_CHARS {
            return Err(ApiError::Validation(format!(
                "comment must be at most {} characters, got {}",
                MAX_COMMENT_CHARS, chars
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub comment: String,
    pub expected_labels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_feedback_entries: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn redirect_to_docs() -> Redirect {
    Redirect::temporary("/docs")
}

pub async fn docs() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

pub async fn classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<Classification>, ApiError> {
    request.validate()?;

    // Inference is CPU bound; keep it off the async workers.
    let classifier = Arc::clone(&state.classifier);
    let result = tokio::task::spawn_blocking(move || classifier.predict(&request.comment))
        .await
        .map_err(|e| {
            ApiError::Classification(ClassifierError::PredictionError(format!(
                "inference task failed: {}",
                e
            )))
        })??;

    Ok(Json(result))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = state
        .feedback
        .submit(&request.comment, request.expected_labels.as_slice())
        .await?;
    log::info!("Stored feedback entry {} with labels {:?}", id, request.expected_labels);

    Ok(Json(MessageResponse {
        message: FEEDBACK_STORED.to_string(),
    }))
}

pub async fn feedback_stats(State(state): State<AppState>) -> Result<Json<FeedbackStats>, ApiError> {
    let total_feedback_entries = state.feedback.count_all().await?;
    Ok(Json(FeedbackStats { total_feedback_entries }))
}

pub async fn view_feedback(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<FeedbackEntry>>, ApiError> {
    let entries = state
        .feedback
        .list(
            page.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            page.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(entries))
}

const DOCS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Toxic Comment Classifier</title></head>
<body>
<h1>Toxic Comment Classifier</h1>
<p>Detects toxic content with a BERT model and collects feedback on its predictions.</p>
<h2>POST /classify</h2>
<p>Body: <code>{"comment": "..."}</code> (1 to 1000 characters).</p>
<p>Returns <code>{"labels": [...], "probabilities": {...}}</code> over
<code>toxic, severe_toxic, obscene, threat, insult, identity_hate</code>.
<code>labels</code> is <code>["none"]</code> when no probability reaches the threshold (0.5 by default).</p>
<h2>POST /submit-feedback</h2>
<p>Body: <code>{"comment": "...", "expected_labels": ["toxic", ...]}</code>.
Labels must be one of the six categories or <code>none</code>.</p>
<h2>GET /feedback-stats</h2>
<p>Returns <code>{"total_feedback_entries": n}</code>.</p>
<h2>GET /view-feedback?limit=100&amp;offset=0</h2>
<p>Returns stored feedback entries in submission order.</p>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_length_counts_characters() {
        let ok = ClassifyRequest { comment: "é".repeat(MAX_COMMENT_CHARS) };
        assert!(ok.validate().is_ok());

        let long = ClassifyRequest { comment: "a".repeat(MAX_COMMENT_CHARS + 1) };
        assert!(long.validate().is_err());

        let empty = ClassifyRequest { comment: String::new() };
        assert!(empty.validate().is_err());
    }
}

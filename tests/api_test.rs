use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use toxiclass::api::{self, AppState};
use toxiclass::feedback::{init_pool, FeedbackRepository};
use toxiclass::{Classification, ClassifierError, CommentClassifier, LabelMap, ToxicityLabel};

/// Scores a comment by the words it contains, so responses are predictable
/// without loading the model.
struct KeywordClassifier;

impl CommentClassifier for KeywordClassifier {
    fn classify(&self, text: &str, threshold: f32) -> Result<Classification, ClassifierError> {
        if text.contains("explode") {
            return Err(ClassifierError::ModelError("runtime failure".into()));
        }
        let lower = text.to_lowercase();
        let probabilities = LabelMap::from_fn(|label| match label {
            ToxicityLabel::Threat if lower.contains("kill") => 0.93,
            ToxicityLabel::Toxic if lower.contains("kill") || lower.contains("idiot") => 0.88,
            ToxicityLabel::Insult if lower.contains("idiot") => 0.71,
            _ => 0.02,
        });
        let mut labels: Vec<String> = probabilities
            .iter()
            .filter(|&(_, p)| p >= threshold)
            .map(|(l, _)| l.as_str().to_string())
            .collect();
        if labels.is_empty() {
            labels.push("none".into());
        }
        Ok(Classification { labels, probabilities })
    }

    fn default_threshold(&self) -> f32 {
        0.5
    }
}

async fn setup_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = init_pool(&dir.path().join("feedback_data.db"))
        .await
        .expect("open feedback database");
    let state = AppState::new(Arc::new(KeywordClassifier), FeedbackRepository::new(pool));
    (dir, api::router(state))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_redirects_to_docs() {
    let (_dir, app) = setup_app().await;
    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/docs");

    let docs = app.oneshot(get("/docs")).await.unwrap();
    assert_eq!(docs.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_classify_benign_comment() {
    let (_dir, app) = setup_app().await;
    let (status, body) = send(&app, post_json("/classify", json!({"comment": "You are wonderful"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["labels"], json!(["none"]));
    let probabilities = body["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 6);
    for label in ToxicityLabel::ALL {
        let p = probabilities[label.as_str()].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}

#[tokio::test]
async fn test_classify_threat() {
    let (_dir, app) = setup_app().await;
    let (status, body) = send(&app, post_json("/classify", json!({"comment": "I will kill you"}))).await;

    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = body["labels"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert!(labels.contains(&"threat"));
    assert!(!labels.contains(&"none"));
}

#[tokio::test]
async fn test_classify_rejects_bad_comments() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, post_json("/classify", json!({"comment": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("empty"));

    let (status, _) = send(&app, post_json("/classify", json!({"comment": "a".repeat(1001)}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/classify", json!({"text": "wrong field"}))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_classify_model_failure_is_server_error() {
    let (_dir, app) = setup_app().await;
    let (status, body) = send(&app, post_json("/classify", json!({"comment": "explode"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Classification error"));
    assert!(detail.contains("runtime failure"));
}

#[tokio::test]
async fn test_feedback_round_trip() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/feedback-stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"total_feedback_entries": 0}));

    let (status, body) = send(
        &app,
        post_json("/submit-feedback", json!({"comment": "go away", "expected_labels": ["toxic", "insult"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Feedback stored successfully"}));

    let (_, body) = send(&app, get("/feedback-stats")).await;
    assert_eq!(body["total_feedback_entries"], 1);

    let (status, body) = send(&app, get("/view-feedback")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry["id"], 1);
    assert_eq!(entry["comment"], "go away");
    assert_eq!(entry["toxic"], true);
    assert_eq!(entry["insult"], true);
    assert_eq!(entry["threat"], false);
    assert_eq!(entry["severe_toxic"], false);
    assert_eq!(entry["obscene"], false);
    assert_eq!(entry["identity_hate"], false);
    assert!(entry["timestamp"].is_string());
}

#[tokio::test]
async fn test_invalid_feedback_labels() {
    let (_dir, app) = setup_app().await;
    let (status, body) = send(
        &app,
        post_json("/submit-feedback", json!({"comment": "hm", "expected_labels": ["toxic", "bogus"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid labels: bogus");

    let (_, body) = send(&app, get("/feedback-stats")).await;
    assert_eq!(body["total_feedback_entries"], 0);
}

#[tokio::test]
async fn test_view_feedback_pagination() {
    let (_dir, app) = setup_app().await;
    for i in 0..5 {
        let (status, _) = send(
            &app,
            post_json("/submit-feedback", json!({"comment": format!("c{}", i), "expected_labels": ["none"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, get("/view-feedback?limit=2&offset=0")).await;
    let ids: Vec<i64> = body.as_array().unwrap().iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);

    let (_, body) = send(&app, get("/view-feedback?limit=2&offset=4")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["comment"], "c4");

    let (status, body) = send(&app, get("/view-feedback?limit=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("limit"));

    let (status, _) = send(&app, get("/view-feedback?offset=-5")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

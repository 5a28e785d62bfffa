//! HTTP surface: routing, shared state and request logging.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::classifier::CommentClassifier;
use crate::feedback::FeedbackRepository;

mod error;
pub mod handlers;

pub use error::ApiError;

/// Handles built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn CommentClassifier>,
    pub feedback: FeedbackRepository,
}

impl AppState {
    pub fn new(classifier: Arc<dyn CommentClassifier>, feedback: FeedbackRepository) -> Self {
        Self { classifier, feedback }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::redirect_to_docs))
        .route("/docs", get(handlers::docs))
        .route("/classify", post(handlers::classify))
        .route("/submit-feedback", post(handlers::submit_feedback))
        .route("/feedback-stats", get(handlers::feedback_stats))
        .route("/view-feedback", get(handlers::view_feedback))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl-C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} -> {} ({:.2?})",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

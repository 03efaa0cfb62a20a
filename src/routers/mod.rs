//! HTTP front end.

use std::{sync::Arc, time::Duration};

use axum::{
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, Span};

use crate::slurm::JobSubmitter;

pub mod error;
pub mod jobs;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub submitter: Arc<dyn JobSubmitter>,
}

impl AppState {
    pub fn new(submitter: Arc<dyn JobSubmitter>) -> Self {
        Self { submitter }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/job/submit",
            post(jobs::submit_job).fallback(jobs::method_not_allowed),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http().on_response(log_response))
        .with_state(state)
}

fn log_response(response: &Response, latency: Duration, _span: &Span) {
    let status = response.status();
    let code = error::extract_error_code_from_response(response);
    if code.is_empty() {
        debug!(%status, ?latency, "finished processing request");
    } else {
        debug!(%status, code, ?latency, "request failed");
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_response_reads_error_code() {
        let failed = error::bad_request("missing_user_name", "X-SLURM-USER-NAME header is required");
        assert_eq!(
            error::extract_error_code_from_response(&failed),
            "missing_user_name"
        );
        log_response(&failed, Duration::from_millis(3), &Span::none());

        let ok = Response::new(axum::body::Body::empty());
        log_response(&ok, Duration::from_millis(1), &Span::none());
    }
}

//! Gateway contract tests for `/job/submit`.
//!
//! These tests verify:
//! - Non-POST methods are rejected with 405
//! - Missing identity or a malformed body is rejected with 400
//! - No backend call is made for rejected requests
//! - Backend success and failure are relayed as 200 / 500

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use http::Extensions;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;
use tug::{
    identity,
    routers::{build_router, error::extract_error_code_from_response, AppState},
    slurm::{JobSubmitRequest, JobSubmitResponse, JobSubmitter, SlurmClientError},
};

struct MockSubmitter {
    calls: AtomicUsize,
    fail: bool,
    seen: Mutex<Vec<(Option<String>, JobSubmitRequest)>>,
}

impl MockSubmitter {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn canned_response() -> JobSubmitResponse {
    serde_json::from_value(json!({
        "job_id": 1234,
        "step_id": "batch",
        "job_submit_user_msg": "",
        "errors": [],
        "warnings": []
    }))
    .unwrap()
}

#[async_trait]
impl JobSubmitter for MockSubmitter {
    async fn submit_job(
        &self,
        ctx: Extensions,
        request: &JobSubmitRequest,
    ) -> Result<JobSubmitResponse, SlurmClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().await.push((
            identity::user_name(&ctx).map(str::to_string),
            request.clone(),
        ));
        if self.fail {
            Err(SlurmClientError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Invalid partition specified".to_string(),
            })
        } else {
            Ok(canned_response())
        }
    }
}

fn app(submitter: Arc<MockSubmitter>) -> Router {
    build_router(AppState::new(submitter))
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let submitter = MockSubmitter::new(false);
    let response = app(submitter.clone())
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/job/submit")
                .header("X-SLURM-USER-NAME", "bob")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST");
    assert_eq!(submitter.calls(), 0);
}

#[tokio::test]
async fn test_missing_identity_is_bad_request() {
    let submitter = MockSubmitter::new(false);
    let response = app(submitter.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/job/submit")
                .body(Body::from(r#"{"job":{"name":"test"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        extract_error_code_from_response(&response),
        "missing_user_name"
    );
    assert_eq!(submitter.calls(), 0);
}

#[tokio::test]
async fn test_empty_identity_is_bad_request() {
    let submitter = MockSubmitter::new(false);
    let response = app(submitter.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/job/submit")
                .header("X-SLURM-USER-NAME", "")
                .body(Body::from(r#"{"job":{"name":"test"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(submitter.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let submitter = MockSubmitter::new(false);
    let response = app(submitter.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/job/submit")
                .header("X-SLURM-USER-NAME", "bob")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(extract_error_code_from_response(&response), "invalid_json");
    assert_eq!(submitter.calls(), 0);
}

#[tokio::test]
async fn test_json_array_is_bad_request() {
    let submitter = MockSubmitter::new(false);
    for body in ["[]", r#"["echo hi"]"#] {
        let response = app(submitter.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/job/submit")
                    .header("X-SLURM-USER-NAME", "bob")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(extract_error_code_from_response(&response), "invalid_json");
    }
    assert_eq!(submitter.calls(), 0);
}

#[tokio::test]
async fn test_success_relays_backend_response() {
    let submitter = MockSubmitter::new(false);
    let response = app(submitter.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/job/submit")
                .header("X-SLURM-USER-NAME", "bob")
                .body(Body::from(r#"{"job":{"name":"test"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json"
    );
    assert_eq!(
        body_json(response).await,
        serde_json::to_value(canned_response()).unwrap()
    );

    assert_eq!(submitter.calls(), 1);
    let seen = submitter.seen.lock().await;
    assert_eq!(seen[0].0.as_deref(), Some("bob"));
    assert_eq!(
        seen[0].1.job.as_ref().and_then(|j| j.name.as_deref()),
        Some("test")
    );
}

#[tokio::test]
async fn test_backend_failure_is_internal_error() {
    let submitter = MockSubmitter::new(true);
    let response = app(submitter.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/job/submit")
                .header("X-SLURM-USER-NAME", "bob")
                .body(Body::from(r#"{"job":{"name":"test"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("submit failed:"));
    assert!(message.contains("Invalid partition specified"));
    assert_eq!(submitter.calls(), 1);
}

#[tokio::test]
async fn test_health() {
    let submitter = MockSubmitter::new(false);
    let response = app(submitter.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
    assert_eq!(submitter.calls(), 0);
}

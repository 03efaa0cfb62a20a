//! Job submission proxy.
//!
//! `POST /job/submit`: validate the caller identity and payload, then submit
//! to slurmrestd on behalf of that identity and relay the response.

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{header::ALLOW, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::Unexpected;
use serde_json::Value;
use tracing::{error, info, warn};
use tug_auth::USER_NAME_HEADER;

use super::{error, AppState};
use crate::{identity, slurm::JobSubmitRequest};

/// Largest job submission body accepted from callers.
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Caller identity as sent by the client. The bridge does not verify it.
fn caller_identity(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|user| !user.is_empty())
}

/// Parses a submission body. Anything but a JSON object is rejected,
/// including arrays that would map onto the struct by position.
fn parse_submission(body: &[u8]) -> Result<JobSubmitRequest, serde_json::Error> {
    match serde_json::from_slice::<Value>(body)? {
        value @ Value::Object(_) => serde_json::from_value(value),
        other => Err(serde::de::Error::invalid_type(
            unexpected(&other),
            &"a job submission object",
        )),
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

pub async fn submit_job(State(state): State<AppState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let Some(user) = caller_identity(&parts.headers) else {
        return error::bad_request(
            "missing_user_name",
            "X-SLURM-USER-NAME header is required",
        );
    };

    let body = match to_bytes(body, MAX_PAYLOAD_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!(user, error = %e, "failed to read request body");
            return error::bad_request("unreadable_body", "failed to read request body");
        }
    };

    let request = match parse_submission(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(user, error = %e, "failed to unmarshal body");
            return error::bad_request("invalid_json", "invalid JSON body");
        }
    };

    let ctx = identity::with_user_name(user);
    match state.submitter.submit_job(ctx, &request).await {
        Ok(response) => {
            info!(user, job_id = ?response.job_id, "job submitted");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!(user, error = %e, "submit failed");
            error::internal_error("submit_failed", format!("submit failed: {}", e))
        }
    }
}

/// Any method other than POST on `/job/submit`.
pub async fn method_not_allowed() -> Response {
    let mut response = error::method_not_allowed("method_not_allowed", "method not allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("POST"));
    response
}

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{
    header::{ACCEPT, CONTENT_TYPE},
    Extensions, Method, Request, StatusCode,
};
use tracing::debug;
use url::Url;

use super::types::{ErrorEnvelope, JobSubmitRequest, JobSubmitResponse};
use crate::transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum SlurmClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("slurmrestd returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("decode slurmrestd response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

/// The job submission operation the gateway depends on.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submits `request` on behalf of the identity carried in `ctx`.
    async fn submit_job(
        &self,
        ctx: Extensions,
        request: &JobSubmitRequest,
    ) -> Result<JobSubmitResponse, SlurmClientError>;
}

/// Minimal slurmrestd REST client.
///
/// Carries no credentials of its own; the transport is expected to add them
/// from the request context.
pub struct SlurmClient {
    base_url: Url,
    version: String,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for SlurmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlurmClient")
            .field("base_url", &self.base_url.as_str())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl SlurmClient {
    pub fn new(base_url: Url, version: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            version: version.into(),
            transport,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, SlurmClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SlurmClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["slurm", self.version.as_str()])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    async fn post_json(
        &self,
        ctx: Extensions,
        path: &str,
        body: Vec<u8>,
    ) -> Result<Bytes, SlurmClientError> {
        let url = self.endpoint(path)?;
        let mut req = Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(Bytes::from(body))
            .map_err(|e| SlurmClientError::InvalidUrl(e.to_string()))?;
        *req.extensions_mut() = ctx;

        let res = self.transport.round_trip(req).await?;
        let status = res.status();
        let body = res.into_body();
        debug!(%status, path, bytes = body.len(), "slurmrestd responded");

        if !status.is_success() {
            return Err(SlurmClientError::Status {
                status,
                message: error_message(&body),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl JobSubmitter for SlurmClient {
    async fn submit_job(
        &self,
        ctx: Extensions,
        request: &JobSubmitRequest,
    ) -> Result<JobSubmitResponse, SlurmClientError> {
        let payload = serde_json::to_vec(request).map_err(SlurmClientError::Encode)?;
        let body = self.post_json(ctx, "job/submit", payload).await?;
        serde_json::from_slice(&body).map_err(SlurmClientError::Decode)
    }
}

/// Joins the backend's `errors[]` messages, falling back to the raw body.
fn error_message(body: &[u8]) -> String {
    let from_errors = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| {
            envelope
                .errors
                .iter()
                .filter_map(|e| e.message())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|msg| !msg.is_empty());

    from_errors.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            "empty response body".to_string()
        } else {
            text
        }
    })
}

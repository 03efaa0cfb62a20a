//! Outbound HTTP transports toward slurmrestd.
//!
//! A [`Transport`] performs one request/response exchange. [`AuthTransport`]
//! decorates another transport with per-caller credential headers; the
//! concrete network transports are [`TcpTransport`] and
//! [`UnixSocketTransport`], selected by [`build_transport`].

mod auth_transport;
mod tcp;
mod unix;

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

pub use auth_transport::AuthTransport;
pub use tcp::TcpTransport;
pub use unix::UnixSocketTransport;

use crate::config::BackendEndpoint;

/// Deadline for a whole exchange with slurmrestd.
pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle connections kept per slurmrestd host.
pub const MAX_IDLE_PER_HOST: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("connect to {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unix socket exchange failed: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, req: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn round_trip(&self, req: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        (**self).round_trip(req).await
    }
}

/// Network transport for `endpoint`, bounded by `timeout`.
pub fn build_transport(
    endpoint: &BackendEndpoint,
    timeout: Duration,
) -> Result<Arc<dyn Transport>, TransportError> {
    match endpoint {
        BackendEndpoint::Tcp(_) => Ok(Arc::new(TcpTransport::new(timeout)?)),
        BackendEndpoint::Unix(path) => Ok(Arc::new(UnixSocketTransport::new(path, timeout))),
    }
}

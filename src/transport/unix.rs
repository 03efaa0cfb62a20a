use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use http::{header::HOST, HeaderValue, Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::debug;

use super::{Transport, TransportError};

/// slurmrestd listening on a local Unix socket (`unix:///path` URIs).
///
/// Each exchange opens its own HTTP/1.1 connection.
#[derive(Debug, Clone)]
pub struct UnixSocketTransport {
    socket_path: PathBuf,
    timeout: Duration,
}

impl UnixSocketTransport {
    pub fn new(socket_path: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            timeout,
        }
    }

    async fn exchange(&self, req: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| TransportError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "slurmrestd socket connection closed with error");
            }
        });

        let req = into_origin_form(req)?;
        let res = sender.send_request(req.map(Full::new)).await?;
        let (parts, body) = res.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Response::from_parts(parts, body))
    }
}

#[async_trait]
impl Transport for UnixSocketTransport {
    async fn round_trip(&self, req: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        tokio::time::timeout(self.timeout, self.exchange(req))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

/// HTTP/1 connections expect a path-only request target plus a Host header.
fn into_origin_form(mut req: Request<Bytes>) -> Result<Request<Bytes>, TransportError> {
    if !req.headers().contains_key(HOST) {
        let host = req
            .uri()
            .authority()
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| "localhost".to_string());
        let host = HeaderValue::from_str(&host)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        req.headers_mut().insert(HOST, host);
    }

    let origin: Uri = req
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/")
        .parse()
        .map_err(|e: http::uri::InvalidUri| TransportError::InvalidRequest(e.to_string()))?;
    *req.uri_mut() = origin;
    Ok(req)
}

#[cfg(test)]
mod tests {
    use axum::{extract::Path as UrlPath, http::HeaderMap, routing::post, Router};
    use tokio::net::UnixListener;

    use super::*;

    #[test]
    fn test_origin_form() {
        let req = Request::builder()
            .uri("http://localhost/slurm/v0.0.40/job/submit?x=1")
            .body(Bytes::new())
            .unwrap();
        let req = into_origin_form(req).unwrap();
        assert_eq!(req.uri().to_string(), "/slurm/v0.0.40/job/submit?x=1");
        assert_eq!(req.headers()[HOST], "localhost");
    }

    #[tokio::test]
    async fn test_round_trip_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("slurmrestd.sock");

        let app = Router::new().route(
            "/slurm/{version}/job/submit",
            post(
                |UrlPath(version): UrlPath<String>, headers: HeaderMap, body: Bytes| async move {
                    let user = headers
                        .get("x-slurm-user-name")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    format!("{}:{}:{}", version, user, String::from_utf8_lossy(&body))
                },
            ),
        );
        let listener = UnixListener::bind(&socket_path).unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let transport = UnixSocketTransport::new(&socket_path, Duration::from_secs(5));
        let req = Request::builder()
            .method("POST")
            .uri("http://localhost/slurm/v0.0.40/job/submit")
            .header("x-slurm-user-name", "alice")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let res = transport.round_trip(req).await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.body().as_ref(), b"v0.0.40:alice:{}");
    }

    #[tokio::test]
    async fn test_missing_socket_is_connect_error() {
        let transport =
            UnixSocketTransport::new("/nonexistent/slurmrestd.sock", Duration::from_secs(1));
        let req = Request::builder()
            .uri("http://localhost/")
            .body(Bytes::new())
            .unwrap();
        assert!(matches!(
            transport.round_trip(req).await,
            Err(TransportError::Connect { .. })
        ));
    }
}

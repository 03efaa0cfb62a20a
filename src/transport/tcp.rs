use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

use super::{Transport, TransportError, MAX_IDLE_PER_HOST};

/// slurmrestd over TCP, backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    client: reqwest::Client,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn round_trip(&self, req: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let req = reqwest::Request::try_from(req)?;
        let res = self.client.execute(req).await?;

        let status = res.status();
        let version = res.version();
        let headers = res.headers().clone();
        let body = res.bytes().await?;

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.version_mut() = version;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::HeaderMap, routing::post, Router};
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        let app = Router::new().route(
            "/echo",
            post(|headers: HeaderMap, body: Bytes| async move {
                let user = headers
                    .get("x-test")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                ([("x-echo-user", user)], body)
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let transport = TcpTransport::new(Duration::from_secs(5)).unwrap();
        let req = Request::builder()
            .method("POST")
            .uri(format!("http://{}/echo", addr))
            .header("x-test", "alice")
            .body(Bytes::from_static(b"payload"))
            .unwrap();

        let res = transport.round_trip(req).await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["x-echo-user"], "alice");
        assert_eq!(res.body().as_ref(), b"payload");
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = TcpTransport::new(Duration::from_secs(5)).unwrap();
        let req = Request::builder()
            .uri(format!("http://{}/", addr))
            .body(Bytes::new())
            .unwrap();
        assert!(matches!(
            transport.round_trip(req).await,
            Err(TransportError::Http(_))
        ));
    }
}

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use http::{header::AUTHORIZATION, Request, Response};
use tracing::debug;
use tug_auth::TokenProvider;

use super::{Transport, TransportError};
use crate::identity;

/// Injects `X-SLURM-USER-NAME` / `X-SLURM-USER-TOKEN` for the caller named in
/// the request extensions, and drops any `Authorization` header.
///
/// Requests without an identity are sent as the provider's default user.
/// When the provider yields no headers the request still goes out and
/// slurmrestd answers with its own authentication error.
pub struct AuthTransport<T> {
    inner: T,
    auth: Arc<dyn TokenProvider>,
}

impl<T> AuthTransport<T> {
    pub fn new(inner: T, auth: Arc<dyn TokenProvider>) -> Self {
        Self { inner, auth }
    }

    /// Rewrites the credential headers of `req` in place.
    pub fn prepare(&self, req: &mut Request<Bytes>) {
        let username = identity::user_name(req.extensions()).unwrap_or_default();
        let credentials = self.auth.headers(username);

        let headers = req.headers_mut();
        for (name, value) in credentials.iter() {
            headers.insert(name.clone(), value.clone());
        }
        headers.remove(AUTHORIZATION);
    }
}

impl<T: fmt::Debug> fmt::Debug for AuthTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTransport")
            .field("inner", &self.inner)
            .field("default_user", &self.auth.default_user())
            .finish()
    }
}

#[async_trait]
impl<T: Transport> Transport for AuthTransport<T> {
    async fn round_trip(&self, mut req: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        self.prepare(&mut req);
        debug!(
            method = %req.method(),
            uri = %req.uri(),
            user = identity::user_name(req.extensions()).unwrap_or_default(),
            "Sending request to slurmrestd"
        );
        self.inner.round_trip(req).await
    }
}

//! Server assembly and lifecycle.

use std::{
    future::{Future, IntoFuture},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};
use tug_auth::{AuthError, Authenticator, TokenProvider};

use crate::{
    config::{BackendEndpoint, Config, ConfigError},
    routers::{build_router, AppState},
    slurm::SlurmClient,
    transport::{build_transport, AuthTransport, TransportError, BACKEND_TIMEOUT},
};

/// How long in-flight requests may run once shutdown starts.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("initialize authenticator: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("create slurm client: {0}")]
    Transport(#[from] TransportError),

    #[error("bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub struct Server {
    addr: SocketAddr,
    authenticator: Arc<Authenticator>,
    router: Router,
}

impl Server {
    /// Builds the authenticator, the slurmrestd client and the HTTP router.
    /// Fails on any configuration problem; nothing is bound yet.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        config.validate()?;
        let addr = config.listen_socket_addr()?;

        let authenticator = Arc::new(Authenticator::new(&config.slurmrestd.auth)?);
        let endpoint = BackendEndpoint::parse(&config.slurmrestd.uri)?;
        let network = build_transport(&endpoint, BACKEND_TIMEOUT)?;
        let provider: Arc<dyn TokenProvider> = authenticator.clone();
        let transport = AuthTransport::new(network, provider);

        let client = SlurmClient::new(
            endpoint.base_url(),
            config.slurmrestd.version.clone(),
            Arc::new(transport),
        );
        info!(
            mode = %authenticator.mode(),
            default_user = authenticator.default_user(),
            static_expiry = ?authenticator.static_expiry(),
            backend = %config.slurmrestd.uri,
            api_version = client.version(),
            "slurmrestd client ready"
        );
        let router = build_router(AppState::new(Arc::new(client)));

        Ok(Self {
            addr,
            authenticator,
            router,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Binds the listen address and serves until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        info!("Tug daemon listening on {}", self.addr);
        serve(listener, self.router, shutdown, SHUTDOWN_GRACE_PERIOD).await
    }
}

/// Serves `router` on `listener` until `shutdown` resolves, then lets
/// in-flight requests finish for at most `grace`.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
    grace: Duration,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let (drain_tx, mut drain_rx) = watch::channel(false);
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = drain_rx.changed().await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => return res.map_err(ServerError::Serve),
        _ = shutdown => {}
    }

    info!(
        grace_secs = grace.as_secs(),
        "Shutdown requested, waiting for in-flight requests"
    );
    let _ = drain_tx.send(true);

    match tokio::time::timeout(grace, server).await {
        Ok(res) => res.map_err(ServerError::Serve),
        Err(_) => {
            warn!("Grace period elapsed with requests still in flight; stopping anyway");
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

//! Daemon configuration.
//!
//! Loaded from a YAML file (or defaults when none is given), then overridden
//! by command-line flags.

use std::{
    net::{SocketAddr, ToSocketAddrs},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::info;
use tug_auth::{CredentialConfig, JwtMode};
use url::Url;

pub const DEFAULT_LISTEN_ADDR: &str = ":8080";
pub const DEFAULT_SLURMRESTD_URI: &str = "http://localhost:6820";
pub const DEFAULT_SLURMRESTD_VERSION: &str = "v0.0.40";

const UNIX_SCHEME_PREFIX: &str = "unix://";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Address to listen on, `host:port` or `:port` for all interfaces.
    pub listen_addr: String,

    pub slurmrestd: SlurmrestdConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            slurmrestd: SlurmrestdConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlurmrestdConfig {
    /// Base URL of slurmrestd; `unix:///path` selects a local socket.
    pub uri: String,

    /// REST API version, e.g. `v0.0.40`.
    pub version: String,

    #[serde(flatten)]
    pub auth: CredentialConfig,
}

impl Default for SlurmrestdConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_SLURMRESTD_URI.to_string(),
            version: DEFAULT_SLURMRESTD_VERSION.to_string(),
            auth: CredentialConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen_addr: Option<String>,
    pub slurm_uri: Option<String>,
    pub jwt_mode: Option<String>,
    pub jwt_key: Option<PathBuf>,
}

impl Config {
    /// File configuration (or defaults without a path) with `overrides` applied.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let config = Self::from_file(path)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                info!("Using default configuration");
                Self::default()
            }
        };
        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a defaulted struct.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(addr) = overrides.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(uri) = overrides.slurm_uri {
            self.slurmrestd.uri = uri;
        }
        if let Some(mode) = overrides.jwt_mode {
            self.slurmrestd.auth.mode = JwtMode::from(mode);
        }
        if let Some(key) = overrides.jwt_key {
            self.slurmrestd.auth.signing_key_path = key;
        }
    }

    /// Checks values the authenticator does not. Mode-specific credential
    /// material is validated when the authenticator is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_socket_addr()?;
        BackendEndpoint::parse(&self.slurmrestd.uri)?;
        validate_api_version(&self.slurmrestd.version)?;
        if self.slurmrestd.auth.lifespan_seconds == 0 {
            return Err(ConfigError::Invalid(
                "slurmrestd.jwtLifespan must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        };
        addr.to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                ConfigError::Invalid(format!("invalid listen address: {}", self.listen_addr))
            })
    }
}

fn validate_api_version(version: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = version
        .strip_prefix('v')
        .map(|rest| rest.split('.').collect())
        .unwrap_or_default();
    let numeric = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if numeric {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "slurmrestd.version must look like v0.0.40, got {:?}",
            version
        )))
    }
}

/// Where slurmrestd is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEndpoint {
    Tcp(Url),
    Unix(PathBuf),
}

impl BackendEndpoint {
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        if let Some(path) = uri.strip_prefix(UNIX_SCHEME_PREFIX) {
            if path.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "missing socket path in slurmrestd.uri: {}",
                    uri
                )));
            }
            return Ok(BackendEndpoint::Unix(PathBuf::from(path)));
        }

        let url = Url::parse(uri)
            .map_err(|e| ConfigError::Invalid(format!("invalid slurmrestd.uri {}: {}", uri, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(BackendEndpoint::Tcp(url)),
            other => Err(ConfigError::Invalid(format!(
                "unsupported slurmrestd.uri scheme: {}",
                other
            ))),
        }
    }

    /// Base URL requests are built against. Unix sockets have no authority of
    /// their own, so a fixed placeholder host is used.
    pub fn base_url(&self) -> Url {
        match self {
            BackendEndpoint::Tcp(url) => url.clone(),
            BackendEndpoint::Unix(_) => {
                Url::parse("http://localhost/").expect("static URL is valid")
            }
        }
    }
}

//! slurmrestd credential issuance.
//!
//! An [`Authenticator`] is built once at startup and runs in one of two modes:
//! - **auto**: every call mints a new HS256 token for the requested user,
//!   signed with the shared key slurmctld also holds. Nothing is cached.
//! - **static**: a single pre-issued token is returned for every user. Its
//!   expiry is only reported in the logs; an expired token is still returned.

use std::{fmt, fs, path::PathBuf};

use chrono::Utc;
use http::{HeaderMap, HeaderName, HeaderValue};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::{CredentialConfig, JwtMode};

/// Header carrying the user the request is made on behalf of.
pub const USER_NAME_HEADER: HeaderName = HeaderName::from_static("x-slurm-user-name");
/// Header carrying the slurmrestd token for that user.
pub const USER_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-slurm-user-token");

/// Static tokens closer than this to expiry are reported.
pub const EXPIRY_WARNING_WINDOW_SECS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing token in configuration for static mode")]
    MissingStaticToken,

    #[error("invalid static token: {0}")]
    InvalidStaticToken(#[source] jsonwebtoken::errors::Error),

    #[error("read JWT key file {}: {source}", path.display())]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported JWT mode: {0}")]
    UnsupportedMode(String),

    #[error("sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("user name {0:?} cannot be sent as a header value")]
    InvalidUserName(String),

    #[error("token cannot be sent as a header value")]
    InvalidTokenHeader,
}

/// Claims slurmrestd expects in an HS256 token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlurmClaims {
    /// Slurm user name
    pub sun: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    #[serde(default)]
    exp: Option<f64>,
}

/// Where a static token stands relative to its `exp` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    NoExpiry,
    Valid,
    ExpiringSoon,
    Expired,
}

impl ExpiryStatus {
    pub fn at(expires_at: Option<i64>, now: i64) -> Self {
        let Some(expires_at) = expires_at else {
            return ExpiryStatus::NoExpiry;
        };
        let gap = expires_at - now;
        if gap < 0 {
            ExpiryStatus::Expired
        } else if gap < EXPIRY_WARNING_WINDOW_SECS {
            ExpiryStatus::ExpiringSoon
        } else {
            ExpiryStatus::Valid
        }
    }
}

/// Source of slurmrestd credentials, as seen by the outbound transport.
pub trait TokenProvider: Send + Sync {
    /// Token for the configured default user.
    fn token(&self) -> Result<String, AuthError> {
        self.token_for_user(self.default_user())
    }

    fn token_for_user(&self, username: &str) -> Result<String, AuthError>;

    fn default_user(&self) -> &str;

    /// Identity headers for `username`, or for the default user when empty.
    ///
    /// Issuance failures are logged and yield an empty map; slurmrestd then
    /// rejects the unauthenticated request itself.
    fn headers(&self, username: &str) -> HeaderMap;
}

enum Signer {
    Auto { key: EncodingKey, lifespan_secs: i64 },
    Static { token: String, expires_at: Option<i64> },
}

pub struct Authenticator {
    default_user: String,
    signer: Signer,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Authenticator");
        s.field("default_user", &self.default_user);
        match &self.signer {
            Signer::Auto { lifespan_secs, .. } => {
                s.field("mode", &"auto").field("lifespan_secs", lifespan_secs)
            }
            Signer::Static { expires_at, .. } => {
                s.field("mode", &"static").field("expires_at", expires_at)
            }
        };
        s.finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(config: &CredentialConfig) -> Result<Self, AuthError> {
        let signer = match &config.mode {
            JwtMode::Static => {
                if config.static_token.is_empty() {
                    return Err(AuthError::MissingStaticToken);
                }
                let expires_at = unverified_expiry(&config.static_token)?;
                Signer::Static {
                    token: config.static_token.clone(),
                    expires_at,
                }
            }
            JwtMode::Auto => {
                let key = fs::read(&config.signing_key_path).map_err(|source| {
                    AuthError::ReadKey {
                        path: config.signing_key_path.clone(),
                        source,
                    }
                })?;
                if key.is_empty() {
                    warn!(
                        path = %config.signing_key_path.display(),
                        "JWT key file is empty; slurmrestd will reject minted tokens"
                    );
                }
                Signer::Auto {
                    key: EncodingKey::from_secret(&key),
                    lifespan_secs: i64::try_from(config.lifespan_seconds).unwrap_or(i64::MAX),
                }
            }
            JwtMode::Other(mode) => return Err(AuthError::UnsupportedMode(mode.clone())),
        };

        Ok(Self {
            default_user: config.default_user.clone(),
            signer,
        })
    }

    pub fn mode(&self) -> JwtMode {
        match self.signer {
            Signer::Auto { .. } => JwtMode::Auto,
            Signer::Static { .. } => JwtMode::Static,
        }
    }

    /// Expiry of the static token, if it carries one. Always `None` in auto mode.
    pub fn static_expiry(&self) -> Option<i64> {
        match self.signer {
            Signer::Static { expires_at, .. } => expires_at,
            Signer::Auto { .. } => None,
        }
    }

    fn check_static_expiration(expires_at: Option<i64>) {
        match ExpiryStatus::at(expires_at, Utc::now().timestamp()) {
            ExpiryStatus::Expired => {
                error!("Static JWT for slurmrestd authentication is expired")
            }
            ExpiryStatus::ExpiringSoon => {
                warn!("Static JWT for slurmrestd authentication will expire soon")
            }
            ExpiryStatus::Valid | ExpiryStatus::NoExpiry => {}
        }
    }

    fn generate_token(
        key: &EncodingKey,
        lifespan_secs: i64,
        username: &str,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = SlurmClaims {
            sun: username.to_string(),
            iat: now,
            exp: now.saturating_add(lifespan_secs),
            jti: Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(AuthError::Signing)
    }

    fn try_headers(&self, username: &str) -> Result<HeaderMap, AuthError> {
        let user_value = HeaderValue::from_str(username)
            .map_err(|_| AuthError::InvalidUserName(username.to_string()))?;
        let token = self.token_for_user(username)?;
        let mut token_value =
            HeaderValue::from_str(&token).map_err(|_| AuthError::InvalidTokenHeader)?;
        token_value.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(USER_NAME_HEADER, user_value);
        headers.insert(USER_TOKEN_HEADER, token_value);
        Ok(headers)
    }
}

impl TokenProvider for Authenticator {
    fn token_for_user(&self, username: &str) -> Result<String, AuthError> {
        match &self.signer {
            Signer::Static { token, expires_at } => {
                Self::check_static_expiration(*expires_at);
                Ok(token.clone())
            }
            Signer::Auto { key, lifespan_secs } => {
                Self::generate_token(key, *lifespan_secs, username)
            }
        }
    }

    fn default_user(&self) -> &str {
        &self.default_user
    }

    fn headers(&self, username: &str) -> HeaderMap {
        let target_user = if username.is_empty() {
            self.default_user.as_str()
        } else {
            username
        };

        match self.try_headers(target_user) {
            Ok(headers) => headers,
            Err(e) => {
                error!(user = %target_user, error = %e, "Error generating token");
                HeaderMap::new()
            }
        }
    }
}

/// Reads `exp` from a token without verifying its signature; the bridge is
/// not the issuer of static tokens.
fn unverified_expiry(token: &str) -> Result<Option<i64>, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<ExpiryClaim>(
        token,
        &DecodingKey::from_secret(&[]),
        &validation,
    )
    .map_err(AuthError::InvalidStaticToken)?;

    Ok(data.claims.exp.map(|exp| exp as i64))
}

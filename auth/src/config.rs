use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// How credentials for slurmrestd are obtained.
///
/// Parsed leniently from any string so that an unknown mode in a config
/// file surfaces as [`crate::AuthError::UnsupportedMode`] when the
/// authenticator is built, instead of as an opaque YAML error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JwtMode {
    /// Mint a fresh HS256 token per request from a shared key file.
    #[default]
    Auto,
    /// Forward one pre-issued token for every request.
    Static,
    /// Anything else; rejected at construction.
    Other(String),
}

impl JwtMode {
    pub fn as_str(&self) -> &str {
        match self {
            JwtMode::Auto => "auto",
            JwtMode::Static => "static",
            JwtMode::Other(s) => s,
        }
    }
}

impl From<String> for JwtMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "auto" => JwtMode::Auto,
            "static" => JwtMode::Static,
            _ => JwtMode::Other(value),
        }
    }
}

impl From<&str> for JwtMode {
    fn from(value: &str) -> Self {
        JwtMode::from(value.to_string())
    }
}

impl From<JwtMode> for String {
    fn from(mode: JwtMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for JwtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_JWT_USER: &str = "slurm";
pub const DEFAULT_JWT_LIFESPAN_SECS: u64 = 360;
pub const DEFAULT_JWT_KEY_PATH: &str = "/etc/slurm/jwt_hs256.key";

/// Credential settings for reaching slurmrestd.
///
/// Only one of `signing_key_path` (auto) and `static_token` (static) is
/// consulted, selected by `mode`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    #[serde(rename = "jwtMode")]
    pub mode: JwtMode,

    /// User substituted when a request carries no identity.
    #[serde(rename = "jwtUser")]
    pub default_user: String,

    /// Lifetime of minted tokens (auto mode)
    #[serde(rename = "jwtLifespan")]
    pub lifespan_seconds: u64,

    /// Path to the HS256 shared key (auto mode)
    #[serde(rename = "jwtKey")]
    pub signing_key_path: PathBuf,

    /// Pre-issued token (static mode). Empty means unset.
    #[serde(rename = "jwtToken")]
    pub static_token: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            mode: JwtMode::Auto,
            default_user: DEFAULT_JWT_USER.to_string(),
            lifespan_seconds: DEFAULT_JWT_LIFESPAN_SECS,
            signing_key_path: PathBuf::from(DEFAULT_JWT_KEY_PATH),
            static_token: String::new(),
        }
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("mode", &self.mode)
            .field("default_user", &self.default_user)
            .field("lifespan_seconds", &self.lifespan_seconds)
            .field("signing_key_path", &self.signing_key_path)
            .field(
                "static_token",
                &if self.static_token.is_empty() {
                    "<unset>"
                } else {
                    "<redacted>"
                },
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(JwtMode::from("auto"), JwtMode::Auto);
        assert_eq!(JwtMode::from("static"), JwtMode::Static);
        assert_eq!(JwtMode::from("oidc"), JwtMode::Other("oidc".to_string()));
        assert_eq!(JwtMode::from("oidc").to_string(), "oidc");
    }

    #[test]
    fn test_debug_redacts_static_token() {
        let config = CredentialConfig {
            mode: JwtMode::Static,
            static_token: "eyJhbGciOiJIUzI1NiJ9.secret.sig".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}

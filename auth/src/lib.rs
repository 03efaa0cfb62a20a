//! Credential issuance for slurmrestd.
//!
//! This crate provides:
//! - Credential configuration (auto vs static JWT mode)
//! - The [`Authenticator`], which mints per-user HS256 tokens or forwards a
//!   pre-issued one
//! - The [`TokenProvider`] seam used by the outbound transport to obtain
//!   `X-SLURM-USER-NAME` / `X-SLURM-USER-TOKEN` headers

mod authenticator;
mod config;

pub use authenticator::{
    AuthError, Authenticator, ExpiryStatus, SlurmClaims, TokenProvider,
    EXPIRY_WARNING_WINDOW_SECS, USER_NAME_HEADER, USER_TOKEN_HEADER,
};
pub use config::{
    CredentialConfig, JwtMode, DEFAULT_JWT_KEY_PATH, DEFAULT_JWT_LIFESPAN_SECS, DEFAULT_JWT_USER,
};

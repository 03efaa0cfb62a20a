//! tug: identity bridge in front of slurmrestd.
//!
//! Callers name the user they act for in `X-SLURM-USER-NAME`; tug obtains a
//! slurmrestd credential for that user (see [`tug_auth`]) and relays the
//! request, so callers never hold the Slurm JWT key.

pub mod config;
pub mod identity;
pub mod logging;
pub mod routers;
pub mod server;
pub mod slurm;
pub mod transport;
pub mod version;

pub use config::{BackendEndpoint, Config, ConfigError, ConfigOverrides};
pub use server::{Server, ServerError};

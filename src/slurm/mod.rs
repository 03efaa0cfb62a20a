//! slurmrestd REST client.

mod client;
pub mod types;

pub use client::{JobSubmitter, SlurmClient, SlurmClientError};
pub use types::{JobDescription, JobSubmitRequest, JobSubmitResponse, SlurmError, SlurmWarning};

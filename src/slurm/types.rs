//! slurmrestd v0.0.40 job submission payloads.
//!
//! Only the commonly used fields are typed; everything else is kept in the
//! flattened `extra` maps so no field is lost in transit. Relayed bodies are
//! equal as JSON values, but typed keys are written before `extra` ones.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /slurm/v0.0.40/job/submit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSubmitRequest {
    /// Batch script; superseded by `job.script` in newer payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobDescription>,

    /// Heterogeneous job components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobDescription>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_working_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `POST /slurm/v0.0.40/job/submit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSubmitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_submit_user_msg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    #[serde(default)]
    pub errors: Vec<SlurmError>,

    #[serde(default)]
    pub warnings: Vec<SlurmWarning>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlurmError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_number: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlurmWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Envelope used to pull `errors` out of non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub errors: Vec<SlurmError>,
}

impl SlurmError {
    pub fn message(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.error.as_deref().filter(|s| !s.is_empty()))
    }
}

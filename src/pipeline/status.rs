//! Pipeline health reporting.

use super::runner::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived health label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// No failures since the last success
    Healthy,
    /// At least one failure since the last success
    Degraded,
}

impl Health {
    /// `Healthy` iff `error_count == 0`
    pub fn from_error_count(error_count: u32) -> Self {
        if error_count == 0 {
            Health::Healthy
        } else {
            Health::Degraded
        }
    }
}

/// Point-in-time status of a pipeline
///
/// Serializes as
/// `{"name", "last_run", "last_success", "error_count", "last_error", "status"}`
/// with RFC 3339 timestamps (or `null`) and `status` of `"healthy"` or `"degraded"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Pipeline name
    pub name: String,
    /// Start of the most recent attempt
    pub last_run: Option<DateTime<Utc>>,
    /// Start of the most recent successful attempt
    pub last_success: Option<DateTime<Utc>>,
    /// Failures since the last success
    pub error_count: u32,
    /// Most recent failure, if any since the last success
    pub last_error: Option<String>,
    /// Derived health label
    pub status: Health,
}

impl PipelineStatus {
    pub(crate) fn new(name: &str, state: &RunState) -> Self {
        Self {
            name: name.to_string(),
            last_run: state.last_run,
            last_success: state.last_success,
            error_count: state.error_count,
            last_error: state.last_error.clone(),
            status: Health::from_error_count(state.error_count),
        }
    }

    /// Whether the pipeline is healthy
    pub fn is_healthy(&self) -> bool {
        self.status == Health::Healthy
    }
}

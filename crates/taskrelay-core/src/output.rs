//! Typed views over the `output_data` documents written by workers and auditors.
//!
//! The store keeps `output_data` schema-less; these structs describe the shapes
//! this crate writes and reads back.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{SessionId, WorkerId};

/// Why an execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The executor ran and exited non-zero.
    ProcessError,
    /// The executor never returned within the task timeout.
    Timeout,
    /// The executor could not be started.
    SpawnError,
}

/// Output of a completed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSuccess {
    pub raw_output: String,
    #[serde(default)]
    pub raw_stderr: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    /// Seconds.
    pub execution_time: f64,
    pub worker_id: WorkerId,
    pub completed_at: DateTime<Utc>,
}

/// Output of a failed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub error: String,
    pub error_kind: FailureKind,
    #[serde(default)]
    pub raw_stderr: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    /// Seconds.
    pub execution_time: f64,
    pub worker_id: WorkerId,
    pub failed_at: DateTime<Utc>,
}

/// Output attached by a planner audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub verdict: String,
    pub notes: String,
    pub approved: bool,
    pub auditor: SessionId,
}

/// Conversion between a typed output shape and the stored document.
pub trait OutputDocument: Serialize + DeserializeOwned {
    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Read the shape back; `None` if the document has a different shape.
    fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl OutputDocument for ExecutionSuccess {}
impl OutputDocument for ExecutionFailure {}
impl OutputDocument for AuditVerdict {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_is_distinguishable() {
        let failure = ExecutionFailure {
            error: "Execution timeout (300s)".to_string(),
            error_kind: FailureKind::Timeout,
            raw_stderr: String::new(),
            exit_code: None,
            execution_time: 300.0,
            worker_id: WorkerId::new("alpha"),
            failed_at: Utc::now(),
        };
        let value = failure.to_value();
        assert_eq!(value["error_kind"], "timeout");

        let back = ExecutionFailure::from_value(&value).unwrap();
        assert_eq!(back.error_kind, FailureKind::Timeout);
    }

    #[test]
    fn test_audit_verdict_shape_is_not_an_execution_result() {
        let verdict = AuditVerdict {
            verdict: "approved".to_string(),
            notes: "ok".to_string(),
            approved: true,
            auditor: SessionId::new("claude_code_planner_x"),
        };
        let value = verdict.to_value();
        assert_eq!(value["approved"], true);
        assert!(ExecutionSuccess::from_value(&value).is_none());
    }
}

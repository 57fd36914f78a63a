use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Provision,
    Update,
    Delete,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationType::Provision => "provision",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One provision/update/delete attempt against a compute backend, tracked end
/// to end by the Compute Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeExecution {
    /// Deterministic: `<tenant>-<op>-<md5(tenant:op)[:12]>` — see `crate::hash`.
    pub execution_id: String,
    pub tenant_id: String,
    pub workflow_execution_id: Option<String>,
    pub operation_type: OperationType,
    pub status: ExecutionStatus,
    pub resource_ids: Option<HashMap<String, String>>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComputeExecution {
    pub fn new(execution_id: String, tenant_id: String, operation_type: OperationType) -> Self {
        let now = Utc::now();
        Self {
            execution_id,
            tenant_id,
            workflow_execution_id: None,
            operation_type,
            status: ExecutionStatus::Pending,
            resource_ids: None,
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One entry in a [`ComputeExecution`]'s ordered history stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionHistoryEntry {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionHistoryEntry {
    pub fn new(execution_id: impl Into<String>, status: ExecutionStatus, details: Option<Value>) -> Self {
        Self {
            execution_id: execution_id.into(),
            status,
            details,
            created_at: Utc::now(),
        }
    }
}

/// A compute-callback payload that exhausted its delivery retries. Held
/// in-memory by the Compute Manager; process-local by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCallback {
    pub execution_id: String,
    pub payload: Value,
    pub error: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
}

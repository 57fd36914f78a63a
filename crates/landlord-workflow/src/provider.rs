use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WorkflowError;
use crate::state::ExecutionStatusReport;

/// Options controlling a single `PostComputeCallback` delivery attempt.
#[derive(Debug, Clone, Default)]
pub struct CallbackOptions {
    pub timeout: Option<Duration>,
}

/// Interface every workflow backend implements (C5).
#[async_trait]
pub trait WorkflowProvider: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn create_workflow(&self, spec: &Value) -> Result<String, WorkflowError>;

    /// Convenience wrapper around `StartExecution` for tenant provisioning.
    async fn invoke(&self, workflow_id: &str, request: &Value) -> Result<String, WorkflowError>;

    /// Starts (or, if `workflow_id` was already used as an idempotency key,
    /// returns) an execution. Returns the execution id.
    async fn start_execution(&self, workflow_id: &str, input: &Value) -> Result<String, WorkflowError>;

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatusReport, WorkflowError>;

    /// Idempotent: tolerates an absent execution id or an already-terminal state.
    async fn stop_execution(&self, execution_id: &str, reason: &str) -> Result<(), WorkflowError>;

    /// Idempotent.
    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), WorkflowError>;

    async fn validate(&self, spec: &Value) -> Result<(), WorkflowError>;

    async fn post_compute_callback(
        &self,
        execution_id: &str,
        payload: &Value,
        opts: &CallbackOptions,
    ) -> Result<(), WorkflowError>;
}

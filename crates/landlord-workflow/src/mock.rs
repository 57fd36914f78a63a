use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::WorkflowError;
use crate::provider::{CallbackOptions, WorkflowProvider};
use crate::state::{ExecutionState, ExecutionStatusReport};

#[derive(Debug, Clone)]
struct MockExecution {
    state: ExecutionState,
    input: Value,
    output: Option<Value>,
}

/// A reference workflow provider that completes every execution immediately
/// and successfully. Idempotency key semantics (re-invoking a `workflow_id`
/// returns the original execution) are honored. No actual scheduling or
/// retry/backoff behavior is simulated — tests that need that drive the
/// provider's state directly via [`MockWorkflowProvider::set_state`].
pub struct MockWorkflowProvider {
    name: String,
    executions: RwLock<HashMap<String, MockExecution>>,
    /// workflow_id (idempotency key) -> execution_id, so re-`invoke`s return
    /// the same execution.
    by_workflow_id: RwLock<HashMap<String, String>>,
}

impl MockWorkflowProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executions: RwLock::new(HashMap::new()),
            by_workflow_id: RwLock::new(HashMap::new()),
        }
    }

    /// Test hook: force an execution into a specific state/output, bypassing
    /// the immediate-success default.
    pub async fn set_state(&self, execution_id: &str, state: ExecutionState, output: Option<Value>) {
        let mut guard = self.executions.write().await;
        if let Some(exec) = guard.get_mut(execution_id) {
            exec.state = state;
            exec.output = output;
        }
    }
}

#[async_trait]
impl WorkflowProvider for MockWorkflowProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_workflow(&self, _spec: &Value) -> Result<String, WorkflowError> {
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn invoke(&self, workflow_id: &str, request: &Value) -> Result<String, WorkflowError> {
        self.start_execution(workflow_id, request).await
    }

    async fn start_execution(&self, workflow_id: &str, input: &Value) -> Result<String, WorkflowError> {
        if let Some(existing) = self.by_workflow_id.read().await.get(workflow_id) {
            debug!(workflow_id, execution_id = %existing, "mock: idempotent replay");
            return Ok(existing.clone());
        }

        let execution_id = format!("exec-{}", uuid::Uuid::new_v4());
        self.executions.write().await.insert(
            execution_id.clone(),
            MockExecution { state: ExecutionState::Succeeded, input: input.clone(), output: Some(input.clone()) },
        );
        self.by_workflow_id
            .write()
            .await
            .insert(workflow_id.to_string(), execution_id.clone());
        Ok(execution_id)
    }

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatusReport, WorkflowError> {
        let guard = self.executions.read().await;
        let exec = guard
            .get(execution_id)
            .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.to_string()))?;
        Ok(ExecutionStatusReport {
            state: exec.state,
            metadata: HashMap::new(),
            output: exec.output.clone(),
            error: None,
        })
    }

    async fn stop_execution(&self, execution_id: &str, _reason: &str) -> Result<(), WorkflowError> {
        let mut guard = self.executions.write().await;
        if let Some(exec) = guard.get_mut(execution_id) {
            if !exec.state.is_terminal() {
                exec.state = ExecutionState::Cancelled;
            }
        }
        Ok(())
    }

    async fn delete_workflow(&self, _workflow_id: &str) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn validate(&self, _spec: &Value) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn post_compute_callback(
        &self,
        _execution_id: &str,
        _payload: &Value,
        _opts: &CallbackOptions,
    ) -> Result<(), WorkflowError> {
        Ok(())
    }
}

pub fn new_mock_provider(name: impl Into<String>) -> Arc<dyn WorkflowProvider> {
    Arc::new(MockWorkflowProvider::new(name))
}

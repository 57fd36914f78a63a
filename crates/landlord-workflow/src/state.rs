use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::TimedOut | ExecutionState::Cancelled
        )
    }
}

/// Recognised values of `metadata["retry_state"]` on a running/pending execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrySubState {
    Running,
    BackingOff,
    Waiting,
    Succeeded,
    Failed,
}

pub const RETRY_STATE_KEY: &str = "retry_state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStatusReport {
    pub state: ExecutionState,
    pub metadata: HashMap<String, String>,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl ExecutionStatusReport {
    pub fn retry_sub_state(&self) -> Option<&str> {
        self.metadata.get(RETRY_STATE_KEY).map(|s| s.as_str())
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no action for terminal status")]
    NoAction,

    #[error("workflow timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal workflow error: {0}")]
    Internal(String),
}

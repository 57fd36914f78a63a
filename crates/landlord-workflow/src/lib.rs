pub mod client;
pub mod error;
pub mod mock;
pub mod provider;
pub mod state;

pub use client::{is_retryable_error, WorkflowClient};
pub use error::WorkflowError;
pub use mock::MockWorkflowProvider;
pub use provider::{CallbackOptions, WorkflowProvider};
pub use state::{ExecutionState, ExecutionStatusReport, RetrySubState, RETRY_STATE_KEY};

use thiserror::Error;

use landlord_store::StoreError;
use landlord_workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("{0}")]
    Internal(String),
}

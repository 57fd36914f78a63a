use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    #[error("tenant already exists: {0}")]
    TenantExists(String),

    #[error("version conflict updating tenant {tenant_id}: expected {expected}, found {actual}")]
    VersionConflict {
        tenant_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}

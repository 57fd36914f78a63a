use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("provision failed: {0}")]
    ProvisionFailed(String),

    #[error("update failed: {0}")]
    UpdateFailed(String),

    #[error("destroy failed: {0}")]
    DestroyFailed(String),

    #[error("tenant not found in provider: {0}")]
    TenantNotFound(String),

    #[error("invalid compute spec: {0}")]
    InvalidSpec(String),

    #[error("internal compute error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("provider name must not be empty")]
    EmptyName,

    #[error("provider already registered: {0}")]
    ProviderConflict(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),
}

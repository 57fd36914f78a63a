use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid compute spec: {0}")]
    InvalidSpec(String),

    #[error("compute provider error: {0}")]
    Compute(#[from] landlord_compute::ComputeError),

    #[error("provider registry error: {0}")]
    Registry(#[from] landlord_compute::RegistryError),

    #[error("execution store error: {0}")]
    Store(#[from] landlord_store::StoreError),
}

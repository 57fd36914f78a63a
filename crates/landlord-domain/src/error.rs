use thiserror::Error;

use crate::tenant::TenantStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid tenant name '{0}': must be lowercase alphanumeric-hyphen, <=255 chars")]
    InvalidTenantName(String),

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: TenantStatus, to: TenantStatus },

    #[error("no action for terminal status {0:?}")]
    NoActionForStatus(TenantStatus),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

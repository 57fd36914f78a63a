//! Core domain types and invariants for Landlord: tenants, their lifecycle
//! state machine, compute specs, and deterministic id/hash helpers. No I/O.

pub mod compute_spec;
pub mod error;
pub mod execution;
pub mod hash;
pub mod ids;
pub mod state_machine;
pub mod tenant;

pub use compute_spec::{
    ContainerSpec, HealthCheck, HealthCheckType, NetworkConfig, PortSpec, Protocol,
    ResourceRequirements, TenantComputeSpec,
};
pub use error::DomainError;
pub use execution::{ComputeExecution, ExecutionHistoryEntry, ExecutionStatus, FailedCallback, OperationType};
pub use hash::{compute_config_hash, generate_compute_execution_id, workflow_execution_name};
pub use ids::{is_valid_tenant_name, TenantId};
pub use tenant::{StateTransition, Tenant, TenantStatus, ANNOTATION_DELETE_AFTER_ARCHIVE};

#[cfg(test)]
mod tests;

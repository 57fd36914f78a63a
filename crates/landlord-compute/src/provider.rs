use std::collections::HashMap;

use async_trait::async_trait;
use landlord_domain::TenantComputeSpec;
use serde_json::Value;

use crate::error::ComputeError;

/// Outcome of a single `Provision`/`Update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStatus {
    Success,
    InProgress,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub status: ProvisionStatus,
    pub resource_ids: HashMap<String, String>,
}

/// Point-in-time view of a tenant's compute resources.
#[derive(Debug, Clone)]
pub struct TenantStatusReport {
    pub status: ProvisionStatus,
    pub resource_ids: HashMap<String, String>,
}

/// Interface every compute backend implements (C4).
///
/// `Destroy` is idempotent: a provider-side "tenant not found" is treated as
/// success by the Compute Manager, not surfaced as an error to callers.
#[async_trait]
pub trait ComputeProvider: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn provision(&self, spec: &TenantComputeSpec) -> Result<ProvisionOutcome, ComputeError>;

    async fn update(&self, tenant_id: &str, spec: &TenantComputeSpec) -> Result<ProvisionOutcome, ComputeError>;

    async fn destroy(&self, tenant_id: &str) -> Result<(), ComputeError>;

    async fn get_status(&self, tenant_id: &str) -> Result<TenantStatusReport, ComputeError>;

    async fn validate(&self, spec: &TenantComputeSpec) -> Result<(), ComputeError>;

    /// Validate an opaque per-provider config blob, independent of a full spec.
    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComputeError>;

    /// Raw JSON Schema bytes describing `provider_config`.
    fn config_schema(&self) -> Vec<u8>;

    /// Default values to seed `provider_config` with.
    fn config_defaults(&self) -> HashMap<String, Value>;
}

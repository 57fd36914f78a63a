use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use landlord_domain::TenantComputeSpec;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ComputeError;
use crate::provider::{ComputeProvider, ProvisionOutcome, ProvisionStatus, TenantStatusReport};
use crate::validate::validate_compute_spec;

/// A reference compute provider that simulates a backend in-process.
///
/// Produces synthetic `local://<tenant>/<key>` resource ids and performs no
/// actual I/O. Useful for tests, the CLI's standalone mode, and as a template
/// for writing a real provider.
pub struct MockComputeProvider {
    name: String,
    tenants: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MockComputeProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tenants: RwLock::new(HashMap::new()),
        }
    }
}

fn stub_resource_ids(spec: &TenantComputeSpec) -> HashMap<String, String> {
    spec.containers
        .iter()
        .map(|c| (c.name.clone(), format!("local://{}/{}", spec.tenant_id, c.name)))
        .collect()
}

#[async_trait]
impl ComputeProvider for MockComputeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn provision(&self, spec: &TenantComputeSpec) -> Result<ProvisionOutcome, ComputeError> {
        debug!(tenant = %spec.tenant_id, provider = %self.name, "mock provision");
        let resource_ids = stub_resource_ids(spec);
        self.tenants
            .write()
            .await
            .insert(spec.tenant_id.clone(), resource_ids.clone());
        Ok(ProvisionOutcome { status: ProvisionStatus::Success, resource_ids })
    }

    async fn update(&self, tenant_id: &str, spec: &TenantComputeSpec) -> Result<ProvisionOutcome, ComputeError> {
        debug!(tenant = %tenant_id, provider = %self.name, "mock update");
        let resource_ids = stub_resource_ids(spec);
        self.tenants
            .write()
            .await
            .insert(tenant_id.to_string(), resource_ids.clone());
        Ok(ProvisionOutcome { status: ProvisionStatus::Success, resource_ids })
    }

    async fn destroy(&self, tenant_id: &str) -> Result<(), ComputeError> {
        debug!(tenant = %tenant_id, provider = %self.name, "mock destroy");
        // Idempotent: removing an absent tenant is not an error.
        self.tenants.write().await.remove(tenant_id);
        Ok(())
    }

    async fn get_status(&self, tenant_id: &str) -> Result<TenantStatusReport, ComputeError> {
        let guard = self.tenants.read().await;
        match guard.get(tenant_id) {
            Some(resource_ids) => Ok(TenantStatusReport {
                status: ProvisionStatus::Success,
                resource_ids: resource_ids.clone(),
            }),
            None => Err(ComputeError::TenantNotFound(tenant_id.to_string())),
        }
    }

    async fn validate(&self, spec: &TenantComputeSpec) -> Result<(), ComputeError> {
        validate_compute_spec(spec)
    }

    fn validate_config(&self, _config: &HashMap<String, Value>) -> Result<(), ComputeError> {
        Ok(())
    }

    fn config_schema(&self) -> Vec<u8> {
        json!({ "type": "object", "additionalProperties": true }).to_string().into_bytes()
    }

    fn config_defaults(&self) -> HashMap<String, Value> {
        HashMap::new()
    }
}

pub fn new_mock_provider(name: impl Into<String>) -> Arc<dyn ComputeProvider> {
    Arc::new(MockComputeProvider::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use landlord_domain::{ContainerSpec, NetworkConfig, PortSpec, Protocol, ResourceRequirements};

    fn spec(tenant_id: &str) -> TenantComputeSpec {
        TenantComputeSpec {
            tenant_id: tenant_id.to_string(),
            provider_type: "mock".to_string(),
            containers: vec![ContainerSpec {
                name: "web".to_string(),
                image: "nginx:1.25".to_string(),
                ports: vec![PortSpec { container_port: 8080, protocol: Protocol::Tcp }],
                env: HashMap::new(),
                health_check: None,
            }],
            resources: ResourceRequirements { cpu_millicores: 128, memory_mb: 128 },
            network: NetworkConfig::default(),
            secret_refs: vec![],
            labels: HashMap::new(),
            provider_config: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn provision_then_status_then_destroy() {
        let provider = MockComputeProvider::new("mock");
        let s = spec("acme-prod");

        let outcome = provider.provision(&s).await.unwrap();
        assert_eq!(outcome.status, ProvisionStatus::Success);
        assert!(outcome.resource_ids.contains_key("web"));

        let status = provider.get_status("acme-prod").await.unwrap();
        assert_eq!(status.status, ProvisionStatus::Success);

        provider.destroy("acme-prod").await.unwrap();
        assert!(provider.get_status("acme-prod").await.is_err());
    }

    #[tokio::test]
    async fn destroy_of_absent_tenant_is_not_an_error() {
        let provider = MockComputeProvider::new("mock");
        provider.destroy("never-provisioned").await.unwrap();
    }
}

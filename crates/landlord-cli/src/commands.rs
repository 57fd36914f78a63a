use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use landlord_compute::{validate_compute_spec, ComputeRegistry, MockComputeProvider};
use landlord_compute_manager::ComputeManager;
use landlord_config::ControllerConfig;
use landlord_domain::{Tenant, TenantComputeSpec};
use landlord_reconciler::Reconciler;
use landlord_store::{InMemoryExecutionStore, InMemoryTenantStore, TenantStore};
use landlord_workflow::MockWorkflowProvider;
use serde_json::Value;

/// Seeds a single tenant and drives it end-to-end through the reconciler,
/// printing each status transition. Wires a [`MockComputeProvider`] and
/// [`MockWorkflowProvider`] so the run needs no external backend (mirrors
/// the compute-manager's own test harness, not a production deployment).
pub async fn demo(tenant_name: String, config_path: Option<PathBuf>) -> Result<()> {
    let desired_config = match config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let value: HashMap<String, Value> =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
            value
        }
        None => HashMap::new(),
    };

    let store: Arc<InMemoryTenantStore> = Arc::new(InMemoryTenantStore::new());
    let workflow_provider = Arc::new(MockWorkflowProvider::new("mock"));

    let tenant = Tenant::new(tenant_name.clone(), desired_config);
    let tenant_id = tenant.id;
    store.create_tenant(&tenant).await.context("seeding tenant")?;
    println!("seeded tenant {tenant_name} ({tenant_id}) in status {}", tenant.status);

    let mut config = ControllerConfig::default();
    config.workers = 1;
    let reconciler = Reconciler::new(store.clone(), workflow_provider.clone(), config);

    // Two passes suffice for the mock provider: one to trigger the
    // workflow, one to observe its (immediate) success.
    for _ in 0..2 {
        reconciler.process(&tenant_id.to_string()).await?;
        let current = store.get_tenant_by_id(&tenant_id).await?;
        println!("status -> {}", current.status);
        if current.status == landlord_domain::TenantStatus::Ready {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let history = store.get_state_history(&tenant_id).await?;
    println!("{} recorded state transitions", history.len());
    Ok(())
}

/// Validates a [`TenantComputeSpec`] JSON document, then registers and
/// exercises a mock provider to confirm the registry/manager plumbing also
/// accepts it.
pub async fn validate_spec(path: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let spec: TenantComputeSpec =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    validate_compute_spec(&spec).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("spec for tenant {} is structurally valid", spec.tenant_id);

    let registry = Arc::new(ComputeRegistry::new());
    registry.register(Arc::new(MockComputeProvider::new(spec.provider_type.clone()))).await?;
    let executions = Arc::new(InMemoryExecutionStore::new());
    let manager = ComputeManager::new(registry, executions, None);
    manager.validate_tenant_spec(&spec).await?;
    println!("provider {} accepted the spec", spec.provider_type);
    Ok(())
}

/// Prints the controller configuration resolved from `LANDLORD_*`
/// environment variables.
pub fn config_show() -> Result<()> {
    let config = landlord_config::from_env()?;
    println!("{config:#?}");
    Ok(())
}

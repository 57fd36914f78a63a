use std::sync::Arc;
use std::time::Duration;

use landlord_domain::{Tenant, TenantId};
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::error::WorkflowError;
use crate::provider::WorkflowProvider;
use crate::state::ExecutionStatusReport;

/// Single entry point the reconciler uses to talk to a workflow backend (C7).
/// Wraps every provider call with a fixed timeout `T_trigger`.
pub struct WorkflowClient {
    provider: Arc<dyn WorkflowProvider>,
    trigger_timeout: Duration,
}

impl WorkflowClient {
    pub fn new(provider: Arc<dyn WorkflowProvider>, trigger_timeout: Duration) -> Self {
        Self { provider, trigger_timeout }
    }

    /// `workflow_id = "tenant-<uuid>-<action>"`. Forwards the tenant's desired
    /// config and an explicit `compute_provider` override when present.
    pub async fn trigger_workflow(&self, tenant: &Tenant, action: &str) -> Result<String, WorkflowError> {
        self.trigger_workflow_with_source(tenant, action, "reconciler").await
    }

    pub async fn trigger_workflow_with_source(
        &self,
        tenant: &Tenant,
        action: &str,
        source: &str,
    ) -> Result<String, WorkflowError> {
        let workflow_id = format!("tenant-{}-{action}", tenant.id);
        let mut request = json!({
            "tenant_id": tenant.id.to_string(),
            "action": action,
            "desired_config": tenant.desired_config,
            "source": source,
        });
        if let Some(provider) = tenant.desired_config.get("compute_provider") {
            request["compute_provider"] = provider.clone();
        }

        run_with_timeout(self.trigger_timeout, self.provider.invoke(&workflow_id, &request)).await
    }

    pub async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatusReport, WorkflowError> {
        run_with_timeout(
            self.trigger_timeout,
            self.provider.get_execution_status(execution_id),
        )
        .await
    }

    pub async fn stop_execution(&self, execution_id: &str, reason: &str) -> Result<(), WorkflowError> {
        run_with_timeout(self.trigger_timeout, self.provider.stop_execution(execution_id, reason)).await
    }

    pub fn tenant_workflow_id(tenant_id: &TenantId, action: &str) -> String {
        format!("tenant-{tenant_id}-{action}")
    }
}

async fn run_with_timeout<T>(
    dur: Duration,
    fut: impl std::future::Future<Output = Result<T, WorkflowError>>,
) -> Result<T, WorkflowError> {
    match timeout(dur, fut).await {
        Ok(result) => result,
        Err(_) => Err(WorkflowError::Timeout(dur)),
    }
}

/// Cancellation is non-retryable; deadline-exceeded is retryable; everything
/// else defaults to retryable.
pub fn is_retryable_error(err: &WorkflowError) -> bool {
    match err {
        WorkflowError::Cancelled => false,
        WorkflowError::Timeout(_) => true,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_not_retryable_but_timeout_is() {
        assert!(!is_retryable_error(&WorkflowError::Cancelled));
        assert!(is_retryable_error(&WorkflowError::Timeout(Duration::from_secs(1))));
        assert!(is_retryable_error(&WorkflowError::Internal("boom".to_string())));
    }
}

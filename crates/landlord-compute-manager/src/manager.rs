use std::collections::HashMap;
use std::sync::Arc;

use landlord_compute::{apply_default_metadata, validate_compute_spec, ComputeProvider, ComputeRegistry, ProvisionStatus};
use landlord_domain::{
    generate_compute_execution_id, ComputeExecution, ExecutionHistoryEntry, ExecutionStatus, OperationType,
    TenantComputeSpec,
};
use landlord_store::ExecutionStore;
use landlord_workflow::WorkflowProvider;
use serde_json::json;
use tracing::{error, info};

use crate::callback::{post_callback_with_retry, CallbackPayload, FailedCallbacks};
use crate::classify::classify_provider_error;
use crate::error::ManagerError;

/// Wraps compute providers with execution tracking, history, callback
/// retry, and the failed-callback queue (C6).
pub struct ComputeManager {
    registry: Arc<ComputeRegistry>,
    executions: Arc<dyn ExecutionStore>,
    workflow_provider: Option<Arc<dyn WorkflowProvider>>,
    failed_callbacks: FailedCallbacks,
}

impl ComputeManager {
    pub fn new(
        registry: Arc<ComputeRegistry>,
        executions: Arc<dyn ExecutionStore>,
        workflow_provider: Option<Arc<dyn WorkflowProvider>>,
    ) -> Self {
        Self { registry, executions, workflow_provider, failed_callbacks: FailedCallbacks::new() }
    }

    pub fn failed_callbacks(&self) -> &FailedCallbacks {
        &self.failed_callbacks
    }

    async fn resolve(&self, provider_type: &str) -> Result<Arc<dyn ComputeProvider>, ManagerError> {
        Ok(self.registry.get(provider_type).await?)
    }

    fn prepare(&self, mut spec: TenantComputeSpec) -> Result<TenantComputeSpec, ManagerError> {
        validate_compute_spec(&spec).map_err(ManagerError::Compute)?;
        apply_default_metadata(&mut spec);
        Ok(spec)
    }

    // ── Bare operations (no tracking) ────────────────────────────────────────

    pub async fn provision_tenant(
        &self,
        spec: TenantComputeSpec,
    ) -> Result<(ProvisionStatus, HashMap<String, String>), ManagerError> {
        let spec = self.prepare(spec)?;
        let provider = self.resolve(&spec.provider_type).await?;
        let outcome = provider.provision(&spec).await?;
        Ok((outcome.status, outcome.resource_ids))
    }

    pub async fn update_tenant(
        &self,
        tenant_id: &str,
        spec: TenantComputeSpec,
    ) -> Result<(ProvisionStatus, HashMap<String, String>), ManagerError> {
        let spec = self.prepare(spec)?;
        let provider = self.resolve(&spec.provider_type).await?;
        let outcome = provider.update(tenant_id, &spec).await?;
        Ok((outcome.status, outcome.resource_ids))
    }

    pub async fn destroy_tenant(&self, provider_type: &str, tenant_id: &str) -> Result<(), ManagerError> {
        let provider = self.resolve(provider_type).await?;
        match provider.destroy(tenant_id).await {
            Ok(()) => Ok(()),
            Err(landlord_compute::ComputeError::TenantNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_tenant_status(
        &self,
        provider_type: &str,
        tenant_id: &str,
    ) -> Result<(ProvisionStatus, HashMap<String, String>), ManagerError> {
        let provider = self.resolve(provider_type).await?;
        let report = provider.get_status(tenant_id).await?;
        Ok((report.status, report.resource_ids))
    }

    pub async fn validate_tenant_spec(&self, spec: &TenantComputeSpec) -> Result<(), ManagerError> {
        validate_compute_spec(spec).map_err(ManagerError::Compute)?;
        let provider = self.resolve(&spec.provider_type).await?;
        provider.validate(spec).await?;
        Ok(())
    }

    // ── Tracked operations ────────────────────────────────────────────────────

    /// `workflow_execution_id` is the calling workflow orchestrator's own
    /// execution id (if any), stamped onto the resulting [`ComputeExecution`]
    /// so the two can be correlated later.
    pub async fn provision_tenant_with_tracking(
        &self,
        spec: TenantComputeSpec,
        workflow_execution_id: Option<String>,
    ) -> Result<ComputeExecution, ManagerError> {
        self.run_tracked(
            OperationType::Provision,
            spec.tenant_id.clone(),
            spec,
            workflow_execution_id,
            |provider, spec| Box::pin(async move { provider.provision(spec).await }),
        )
        .await
    }

    pub async fn update_tenant_with_tracking(
        &self,
        tenant_id: &str,
        spec: TenantComputeSpec,
        workflow_execution_id: Option<String>,
    ) -> Result<ComputeExecution, ManagerError> {
        let tid = tenant_id.to_string();
        self.run_tracked(
            OperationType::Update,
            spec.tenant_id.clone(),
            spec,
            workflow_execution_id,
            move |provider, spec| {
                let tid = tid.clone();
                Box::pin(async move { provider.update(&tid, spec).await })
            },
        )
        .await
    }

    pub async fn delete_tenant_with_tracking(
        &self,
        provider_type: &str,
        tenant_id: &str,
        workflow_execution_id: Option<String>,
    ) -> Result<ComputeExecution, ManagerError> {
        let execution_id = generate_compute_execution_id(tenant_id, "delete");
        let mut execution = ComputeExecution::new(execution_id.clone(), tenant_id.to_string(), OperationType::Delete);
        execution.workflow_execution_id = workflow_execution_id;
        self.executions.create_compute_execution(&execution).await?;
        self.append_history(&execution_id, execution.status, None).await;

        execution.status = ExecutionStatus::Running;
        self.executions.update_compute_execution(&execution).await?;
        self.append_history(&execution_id, execution.status, None).await;

        let provider = match self.resolve(provider_type).await {
            Ok(p) => p,
            Err(e) => return self.finish_failed(execution, "DELETE_FAILED", e.to_string()).await,
        };

        match provider.destroy(tenant_id).await {
            Ok(()) | Err(landlord_compute::ComputeError::TenantNotFound(_)) => {
                execution.status = ExecutionStatus::Succeeded;
                self.executions.update_compute_execution(&execution).await?;
                self.append_history(&execution_id, execution.status, None).await;
                self.deliver_callback(&execution, None).await;
                Ok(execution)
            }
            Err(e) => self.finish_failed(execution, "DELETE_FAILED", e.to_string()).await,
        }
    }

    async fn run_tracked<F>(
        &self,
        op: OperationType,
        tenant_id: String,
        spec: TenantComputeSpec,
        workflow_execution_id: Option<String>,
        call: F,
    ) -> Result<ComputeExecution, ManagerError>
    where
        F: for<'a> FnOnce(
            &'a Arc<dyn ComputeProvider>,
            &'a TenantComputeSpec,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<landlord_compute::ProvisionOutcome, landlord_compute::ComputeError>> + Send + 'a>,
        >,
    {
        let spec = self.prepare(spec)?;
        let op_name = op.to_string();
        let execution_id = generate_compute_execution_id(&tenant_id, &op_name);
        let mut execution = ComputeExecution::new(execution_id.clone(), tenant_id, op);
        execution.workflow_execution_id = workflow_execution_id;
        self.executions.create_compute_execution(&execution).await?;
        self.append_history(&execution_id, execution.status, None).await;

        execution.status = ExecutionStatus::Running;
        self.executions.update_compute_execution(&execution).await?;
        self.append_history(&execution_id, execution.status, None).await;

        let provider = match self.resolve(&spec.provider_type).await {
            Ok(p) => p,
            Err(e) => {
                let code = match op {
                    OperationType::Provision => "PROVISIONING_FAILED",
                    OperationType::Update => "UPDATE_FAILED",
                    OperationType::Delete => "DELETE_FAILED",
                };
                return self.finish_failed(execution, code, e.to_string()).await;
            }
        };

        match call(&provider, &spec).await {
            Ok(outcome) => {
                execution.status = ExecutionStatus::Succeeded;
                execution.resource_ids = Some(outcome.resource_ids.clone());
                self.executions.update_compute_execution(&execution).await?;
                self.append_history(
                    &execution_id,
                    execution.status,
                    Some(json!({ "resource_ids": outcome.resource_ids })),
                )
                .await;
                self.deliver_callback(&execution, None).await;
                Ok(execution)
            }
            Err(e) => {
                let code = match op {
                    OperationType::Provision => "PROVISIONING_FAILED",
                    OperationType::Update => "UPDATE_FAILED",
                    OperationType::Delete => "DELETE_FAILED",
                };
                self.finish_failed(execution, code, e.to_string()).await
            }
        }
    }

    async fn finish_failed(
        &self,
        mut execution: ComputeExecution,
        fallback_code: &str,
        raw_message: String,
    ) -> Result<ComputeExecution, ManagerError> {
        let classified = classify_provider_error(raw_message);

        execution.status = ExecutionStatus::Failed;
        execution.error_code = Some(fallback_code.to_string());
        execution.error_message = Some(classified.message.clone());
        self.executions.update_compute_execution(&execution).await?;
        self.append_history(
            &execution.execution_id,
            execution.status,
            Some(json!({ "error_code": fallback_code, "error_message": classified.message })),
        )
        .await;

        self.deliver_callback(&execution, Some((classified.code.to_string(), classified.is_retriable))).await;
        error!(execution_id = %execution.execution_id, code = fallback_code, "compute execution failed");
        Ok(execution)
    }

    async fn append_history(&self, execution_id: &str, status: ExecutionStatus, details: Option<serde_json::Value>) {
        let entry = ExecutionHistoryEntry::new(execution_id, status, details);
        if let Err(e) = self.executions.add_execution_history(&entry).await {
            error!(execution_id, error = %e, "failed to append execution history");
        }
    }

    async fn deliver_callback(&self, execution: &ComputeExecution, failure: Option<(String, bool)>) {
        let (status, error_code, error_message, is_retriable) = match failure {
            Some((code, retriable)) => {
                ("failed".to_string(), Some(code), execution.error_message.clone(), retriable)
            }
            None => ("succeeded".to_string(), None, None, false),
        };
        let payload = CallbackPayload {
            execution_id: execution.execution_id.clone(),
            tenant_id: execution.tenant_id.clone(),
            status,
            resource_ids: execution.resource_ids.clone(),
            error_code,
            error_message,
            is_retriable,
        };
        post_callback_with_retry(self.workflow_provider.as_ref(), &self.failed_callbacks, payload).await;
        info!(execution_id = %execution.execution_id, "callback delivery attempted");
    }
}

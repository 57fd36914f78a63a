use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ids::TenantId;

/// Lifecycle status of a tenant.
///
/// Transitions (see [`crate::state_machine`] for the full table):
///   requested | planning → provisioning → ready ↔ updating
///   ready | failed → deleting → archived (hard-deleted)
///   ready | failed → archiving → archived
///   * → failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Requested,
    Planning,
    Provisioning,
    Ready,
    Updating,
    Deleting,
    Archiving,
    Archived,
    Failed,
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TenantStatus::Requested => "requested",
            TenantStatus::Planning => "planning",
            TenantStatus::Provisioning => "provisioning",
            TenantStatus::Ready => "ready",
            TenantStatus::Updating => "updating",
            TenantStatus::Deleting => "deleting",
            TenantStatus::Archiving => "archiving",
            TenantStatus::Archived => "archived",
            TenantStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// The unit of reconciliation: a declaratively specified tenant workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Stable, unique among non-deleted tenants. Lowercase alphanumeric-hyphen, <=255 chars.
    pub name: String,
    pub status: TenantStatus,
    pub status_message: Option<String>,
    pub desired_config: HashMap<String, Value>,
    pub observed_config: HashMap<String, Value>,
    pub observed_resource_ids: HashMap<String, String>,
    pub workflow_execution_id: Option<String>,
    pub workflow_config_hash: Option<String>,
    pub workflow_sub_state: Option<String>,
    pub workflow_retry_count: Option<u32>,
    pub workflow_error_message: Option<String>,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonically increasing; used for optimistic concurrency by the store.
    pub version: u64,
}

/// Annotation key that, when present with value `"true"` on an archiving
/// tenant, causes the reconciler to hard-delete rather than mark archived.
pub const ANNOTATION_DELETE_AFTER_ARCHIVE: &str = "landlord/delete_after_archive";

impl Tenant {
    /// Construct a brand-new tenant in `requested` status with version 0.
    pub fn new(name: impl Into<String>, desired_config: HashMap<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name: name.into(),
            status: TenantStatus::Requested,
            status_message: None,
            desired_config,
            observed_config: HashMap::new(),
            observed_resource_ids: HashMap::new(),
            workflow_execution_id: None,
            workflow_config_hash: None,
            workflow_sub_state: None,
            workflow_retry_count: None,
            workflow_error_message: None,
            labels: HashMap::new(),
            annotations: HashMap::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn wants_delete_after_archive(&self) -> bool {
        self.annotations
            .get(ANNOTATION_DELETE_AFTER_ARCHIVE)
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

/// An append-only audit entry recording a tenant status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub from_status: Option<TenantStatus>,
    pub to_status: TenantStatus,
    pub reason: String,
    pub triggered_by: String,
    pub desired_state_snapshot: Option<HashMap<String, Value>>,
    pub observed_state_snapshot: Option<HashMap<String, Value>>,
    pub created_at: DateTime<Utc>,
}

impl StateTransition {
    pub fn new(
        tenant_id: TenantId,
        from_status: Option<TenantStatus>,
        to_status: TenantStatus,
        reason: impl Into<String>,
        triggered_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            from_status,
            to_status,
            reason: reason.into(),
            triggered_by: triggered_by.into(),
            desired_state_snapshot: None,
            observed_state_snapshot: None,
            created_at: Utc::now(),
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use landlord_domain::{StateTransition, Tenant, TenantId, TenantStatus};

use crate::error::StoreError;

/// Filters accepted by [`TenantStore::list_tenants`].
#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    pub statuses: Vec<TenantStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub include_archived: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Persistent store of tenants and their state-transition audit log (C1).
/// Implementations must be safe for concurrent callers and enforce
/// optimistic versioning on update.
#[async_trait]
pub trait TenantStore: Send + Sync + 'static {
    async fn create_tenant(&self, tenant: &Tenant) -> Result<(), StoreError>;

    async fn get_tenant_by_id(&self, id: &TenantId) -> Result<Tenant, StoreError>;

    async fn get_tenant_by_name(&self, name: &str) -> Result<Tenant, StoreError>;

    /// Optimistic update: succeeds only if the persisted `version` equals
    /// `tenant.version`. On success `version` is incremented and
    /// `updated_at` refreshed on the returned tenant.
    async fn update_tenant(&self, tenant: &Tenant) -> Result<Tenant, StoreError>;

    /// Ordered by `created_at` descending.
    async fn list_tenants(&self, filter: &TenantFilter) -> Result<Vec<Tenant>, StoreError>;

    /// Convenience filter: every tenant whose status is non-terminal.
    async fn list_tenants_for_reconciliation(&self) -> Result<Vec<Tenant>, StoreError>;

    /// Hard-delete; cascades state-history.
    async fn delete_tenant(&self, id: &TenantId) -> Result<(), StoreError>;

    async fn record_state_transition(&self, transition: &StateTransition) -> Result<(), StoreError>;

    /// Ordered oldest-first.
    async fn get_state_history(&self, id: &TenantId) -> Result<Vec<StateTransition>, StoreError>;
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use landlord_domain::{StateTransition, Tenant, TenantId};
    use tokio::sync::RwLock;
    use tracing::debug;

    use super::{TenantFilter, TenantStore};
    use crate::error::StoreError;

    #[derive(Debug, Default)]
    struct Inner {
        tenants: HashMap<TenantId, Tenant>,
        names: HashMap<String, TenantId>,
        history: HashMap<TenantId, Vec<StateTransition>>,
    }

    /// In-memory [`TenantStore`]. All data is lost on process exit; suitable
    /// for tests and the CLI's standalone mode.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryTenantStore {
        inner: Arc<RwLock<Inner>>,
    }

    impl InMemoryTenantStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl TenantStore for InMemoryTenantStore {
        async fn create_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
            let mut guard = self.inner.write().await;
            if guard.names.contains_key(&tenant.name) {
                return Err(StoreError::TenantExists(tenant.name.clone()));
            }
            guard.names.insert(tenant.name.clone(), tenant.id);
            guard.tenants.insert(tenant.id, tenant.clone());
            debug!(tenant = %tenant.name, "created tenant");
            Ok(())
        }

        async fn get_tenant_by_id(&self, id: &TenantId) -> Result<Tenant, StoreError> {
            let guard = self.inner.read().await;
            guard
                .tenants
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::TenantNotFound(id.to_string()))
        }

        async fn get_tenant_by_name(&self, name: &str) -> Result<Tenant, StoreError> {
            let guard = self.inner.read().await;
            let id = guard
                .names
                .get(name)
                .ok_or_else(|| StoreError::TenantNotFound(name.to_string()))?;
            guard
                .tenants
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::TenantNotFound(name.to_string()))
        }

        async fn update_tenant(&self, tenant: &Tenant) -> Result<Tenant, StoreError> {
            let mut guard = self.inner.write().await;
            let current = guard
                .tenants
                .get(&tenant.id)
                .ok_or_else(|| StoreError::TenantNotFound(tenant.id.to_string()))?;
            if current.version != tenant.version {
                return Err(StoreError::VersionConflict {
                    tenant_id: tenant.id.to_string(),
                    expected: tenant.version,
                    actual: current.version,
                });
            }
            let mut updated = tenant.clone();
            updated.version += 1;
            updated.updated_at = chrono::Utc::now();
            guard.tenants.insert(updated.id, updated.clone());
            Ok(updated)
        }

        async fn list_tenants(&self, filter: &TenantFilter) -> Result<Vec<Tenant>, StoreError> {
            let guard = self.inner.read().await;
            let mut items: Vec<Tenant> = guard
                .tenants
                .values()
                .filter(|t| {
                    if !filter.statuses.is_empty() && !filter.statuses.contains(&t.status) {
                        return false;
                    }
                    if !filter.include_archived && t.status == landlord_domain::TenantStatus::Archived {
                        return false;
                    }
                    if let Some(after) = filter.created_after {
                        if t.created_at < after {
                            return false;
                        }
                    }
                    if let Some(before) = filter.created_before {
                        if t.created_at > before {
                            return false;
                        }
                    }
                    true
                })
                .cloned()
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let offset = filter.offset.unwrap_or(0) as usize;
            let items = if offset < items.len() {
                items.split_off(offset)
            } else {
                Vec::new()
            };
            let items = if let Some(limit) = filter.limit {
                items.into_iter().take(limit as usize).collect()
            } else {
                items
            };
            Ok(items)
        }

        async fn list_tenants_for_reconciliation(&self) -> Result<Vec<Tenant>, StoreError> {
            let guard = self.inner.read().await;
            Ok(guard
                .tenants
                .values()
                .filter(|t| landlord_domain::state_machine::should_reconcile(t.status))
                .cloned()
                .collect())
        }

        async fn delete_tenant(&self, id: &TenantId) -> Result<(), StoreError> {
            let mut guard = self.inner.write().await;
            if let Some(tenant) = guard.tenants.remove(id) {
                guard.names.remove(&tenant.name);
            }
            guard.history.remove(id);
            Ok(())
        }

        async fn record_state_transition(&self, transition: &StateTransition) -> Result<(), StoreError> {
            let mut guard = self.inner.write().await;
            guard
                .history
                .entry(transition.tenant_id)
                .or_default()
                .push(transition.clone());
            Ok(())
        }

        async fn get_state_history(&self, id: &TenantId) -> Result<Vec<StateTransition>, StoreError> {
            let guard = self.inner.read().await;
            Ok(guard.history.get(id).cloned().unwrap_or_default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn tenant(name: &str) -> Tenant {
            Tenant::new(name, HashMap::new())
        }

        #[tokio::test]
        async fn create_and_get_by_id_and_name() {
            let store = InMemoryTenantStore::new();
            let t = tenant("acme-prod");
            store.create_tenant(&t).await.unwrap();

            let by_id = store.get_tenant_by_id(&t.id).await.unwrap();
            assert_eq!(by_id.name, "acme-prod");

            let by_name = store.get_tenant_by_name("acme-prod").await.unwrap();
            assert_eq!(by_name.id, t.id);
        }

        #[tokio::test]
        async fn duplicate_name_rejected() {
            let store = InMemoryTenantStore::new();
            store.create_tenant(&tenant("acme-prod")).await.unwrap();
            let err = store.create_tenant(&tenant("acme-prod")).await.unwrap_err();
            assert!(matches!(err, StoreError::TenantExists(_)));
        }

        #[tokio::test]
        async fn update_with_stale_version_conflicts() {
            let store = InMemoryTenantStore::new();
            let t = tenant("acme-prod");
            store.create_tenant(&t).await.unwrap();

            let updated = store.update_tenant(&t).await.unwrap();
            assert_eq!(updated.version, 1);

            // Re-submitting the original (now-stale) version must conflict.
            let err = store.update_tenant(&t).await.unwrap_err();
            assert!(matches!(err, StoreError::VersionConflict { .. }));
        }

        #[tokio::test]
        async fn missing_tenant_is_not_found() {
            let store = InMemoryTenantStore::new();
            let err = store.get_tenant_by_id(&TenantId::new()).await.unwrap_err();
            assert!(matches!(err, StoreError::TenantNotFound(_)));
        }

        #[tokio::test]
        async fn list_for_reconciliation_excludes_terminal_statuses() {
            let store = InMemoryTenantStore::new();
            let mut ready = tenant("ready-one");
            ready.status = landlord_domain::TenantStatus::Ready;
            store.create_tenant(&ready).await.unwrap();
            store.create_tenant(&tenant("pending-one")).await.unwrap();

            let pending = store.list_tenants_for_reconciliation().await.unwrap();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].name, "pending-one");
        }

        #[tokio::test]
        async fn delete_cascades_history() {
            let store = InMemoryTenantStore::new();
            let t = tenant("acme-prod");
            store.create_tenant(&t).await.unwrap();
            store
                .record_state_transition(&StateTransition::new(
                    t.id,
                    None,
                    landlord_domain::TenantStatus::Requested,
                    "created",
                    "test",
                ))
                .await
                .unwrap();

            store.delete_tenant(&t.id).await.unwrap();
            assert!(store.get_state_history(&t.id).await.unwrap().is_empty());
        }
    }
}

pub mod postgres {
    use async_trait::async_trait;
    use landlord_domain::{StateTransition, Tenant, TenantId};
    use sqlx::PgPool;

    use super::{TenantFilter, TenantStore};
    use crate::error::StoreError;

    const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS tenants (
    id         UUID PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE,
    state      JSONB NOT NULL,
    version    BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS tenant_state_transitions (
    seq         BIGSERIAL PRIMARY KEY,
    tenant_id   UUID NOT NULL,
    transition  JSONB NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_tenant_state_transitions_tenant
    ON tenant_state_transitions (tenant_id, seq);
"#;

    /// Persistent [`TenantStore`] backed by PostgreSQL. Tables are created
    /// automatically on first connect via [`PostgresTenantStore::connect`].
    #[derive(Clone)]
    pub struct PostgresTenantStore {
        pool: PgPool,
    }

    impl PostgresTenantStore {
        pub async fn connect(url: &str) -> Result<Self, StoreError> {
            let pool = PgPool::connect(url)
                .await
                .map_err(|e| StoreError::Internal(format!("postgres connect: {e}")))?;
            let store = Self { pool };
            store.migrate().await?;
            Ok(store)
        }

        async fn migrate(&self) -> Result<(), StoreError> {
            sqlx::query(MIGRATIONS)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(format!("migration: {e}")))?;
            Ok(())
        }
    }

    fn to_json<T: serde::Serialize>(v: &T) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(v).map_err(StoreError::Serialization)
    }

    fn from_json<T: serde::de::DeserializeOwned>(v: serde_json::Value) -> Result<T, StoreError> {
        serde_json::from_value(v).map_err(StoreError::Serialization)
    }

    #[async_trait]
    impl TenantStore for PostgresTenantStore {
        async fn create_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
            let json = to_json(tenant)?;
            let result = sqlx::query(
                "INSERT INTO tenants (id, name, state, version, updated_at)
                 VALUES ($1, $2, $3::jsonb, $4, NOW())
                 ON CONFLICT (name) DO NOTHING",
            )
            .bind(tenant.id.as_uuid())
            .bind(&tenant.name)
            .bind(&json)
            .bind(tenant.version as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(StoreError::TenantExists(tenant.name.clone()));
            }
            Ok(())
        }

        async fn get_tenant_by_id(&self, id: &TenantId) -> Result<Tenant, StoreError> {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as("SELECT state FROM tenants WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::Internal(e.to_string()))?;
            match row {
                Some((v,)) => from_json(v),
                None => Err(StoreError::TenantNotFound(id.to_string())),
            }
        }

        async fn get_tenant_by_name(&self, name: &str) -> Result<Tenant, StoreError> {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as("SELECT state FROM tenants WHERE name = $1")
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::Internal(e.to_string()))?;
            match row {
                Some((v,)) => from_json(v),
                None => Err(StoreError::TenantNotFound(name.to_string())),
            }
        }

        async fn update_tenant(&self, tenant: &Tenant) -> Result<Tenant, StoreError> {
            let mut updated = tenant.clone();
            updated.version += 1;
            updated.updated_at = chrono::Utc::now();
            let json = to_json(&updated)?;

            let result = sqlx::query(
                "UPDATE tenants SET state = $1::jsonb, version = $2, updated_at = NOW()
                 WHERE id = $3 AND version = $4",
            )
            .bind(&json)
            .bind(updated.version as i64)
            .bind(tenant.id.as_uuid())
            .bind(tenant.version as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

            if result.rows_affected() == 0 {
                let current = self.get_tenant_by_id(&tenant.id).await?;
                return Err(StoreError::VersionConflict {
                    tenant_id: tenant.id.to_string(),
                    expected: tenant.version,
                    actual: current.version,
                });
            }
            Ok(updated)
        }

        async fn list_tenants(&self, filter: &TenantFilter) -> Result<Vec<Tenant>, StoreError> {
            // Filtering/paging happens in-process over the JSONB blob; the
            // tenant count per controller is small enough that this is not
            // a bottleneck (see DESIGN.md).
            let rows: Vec<(serde_json::Value,)> =
                sqlx::query_as("SELECT state FROM tenants ORDER BY updated_at DESC")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| StoreError::Internal(e.to_string()))?;

            let mut items: Vec<Tenant> = rows
                .into_iter()
                .map(|(v,)| from_json(v))
                .collect::<Result<_, _>>()?;

            items.retain(|t| {
                if !filter.statuses.is_empty() && !filter.statuses.contains(&t.status) {
                    return false;
                }
                if !filter.include_archived && t.status == landlord_domain::TenantStatus::Archived {
                    return false;
                }
                if let Some(after) = filter.created_after {
                    if t.created_at < after {
                        return false;
                    }
                }
                if let Some(before) = filter.created_before {
                    if t.created_at > before {
                        return false;
                    }
                }
                true
            });
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let offset = filter.offset.unwrap_or(0) as usize;
            let items = if offset < items.len() {
                items.split_off(offset)
            } else {
                Vec::new()
            };
            let items = if let Some(limit) = filter.limit {
                items.into_iter().take(limit as usize).collect()
            } else {
                items
            };
            Ok(items)
        }

        async fn list_tenants_for_reconciliation(&self) -> Result<Vec<Tenant>, StoreError> {
            let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM tenants")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
            let items: Vec<Tenant> = rows
                .into_iter()
                .map(|(v,)| from_json(v))
                .collect::<Result<_, _>>()?;
            Ok(items
                .into_iter()
                .filter(|t| landlord_domain::state_machine::should_reconcile(t.status))
                .collect())
        }

        async fn delete_tenant(&self, id: &TenantId) -> Result<(), StoreError> {
            sqlx::query("DELETE FROM tenant_state_transitions WHERE tenant_id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
            sqlx::query("DELETE FROM tenants WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
            Ok(())
        }

        async fn record_state_transition(&self, transition: &StateTransition) -> Result<(), StoreError> {
            let json = to_json(transition)?;
            sqlx::query(
                "INSERT INTO tenant_state_transitions (tenant_id, transition, occurred_at)
                 VALUES ($1, $2::jsonb, NOW())",
            )
            .bind(transition.tenant_id.as_uuid())
            .bind(&json)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
            Ok(())
        }

        async fn get_state_history(&self, id: &TenantId) -> Result<Vec<StateTransition>, StoreError> {
            let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
                "SELECT transition FROM tenant_state_transitions
                 WHERE tenant_id = $1 ORDER BY seq ASC",
            )
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
            rows.into_iter().map(|(v,)| from_json(v)).collect()
        }
    }

}

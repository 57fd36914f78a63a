use async_trait::async_trait;
use landlord_domain::{ComputeExecution, ExecutionHistoryEntry, ExecutionStatus, OperationType};

use crate::error::StoreError;

/// Filters accepted by [`ExecutionStore::list_compute_executions`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub status: Option<ExecutionStatus>,
    pub operation: Option<OperationType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Persistent store of compute executions and their history entries (C2).
#[async_trait]
pub trait ExecutionStore: Send + Sync + 'static {
    async fn create_compute_execution(&self, execution: &ComputeExecution) -> Result<(), StoreError>;

    /// Must distinguish not-found from success.
    async fn update_compute_execution(&self, execution: &ComputeExecution) -> Result<(), StoreError>;

    async fn get_compute_execution(&self, execution_id: &str) -> Result<ComputeExecution, StoreError>;

    /// Ordered newest-first.
    async fn list_compute_executions(
        &self,
        tenant_id: &str,
        filter: &ExecutionFilter,
    ) -> Result<Vec<ComputeExecution>, StoreError>;

    async fn add_execution_history(&self, entry: &ExecutionHistoryEntry) -> Result<(), StoreError>;

    /// Ordered oldest-first.
    async fn get_execution_history(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ExecutionHistoryEntry>, StoreError>;
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use landlord_domain::{ComputeExecution, ExecutionHistoryEntry};
    use tokio::sync::RwLock;

    use super::{ExecutionFilter, ExecutionStore};
    use crate::error::StoreError;

    #[derive(Debug, Default)]
    struct Inner {
        executions: HashMap<String, ComputeExecution>,
        history: HashMap<String, Vec<ExecutionHistoryEntry>>,
    }

    /// In-memory [`ExecutionStore`]. All data is lost on process exit.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryExecutionStore {
        inner: Arc<RwLock<Inner>>,
    }

    impl InMemoryExecutionStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ExecutionStore for InMemoryExecutionStore {
        async fn create_compute_execution(&self, execution: &ComputeExecution) -> Result<(), StoreError> {
            let mut guard = self.inner.write().await;
            guard
                .executions
                .insert(execution.execution_id.clone(), execution.clone());
            Ok(())
        }

        async fn update_compute_execution(&self, execution: &ComputeExecution) -> Result<(), StoreError> {
            let mut guard = self.inner.write().await;
            if !guard.executions.contains_key(&execution.execution_id) {
                return Err(StoreError::ExecutionNotFound(execution.execution_id.clone()));
            }
            guard
                .executions
                .insert(execution.execution_id.clone(), execution.clone());
            Ok(())
        }

        async fn get_compute_execution(&self, execution_id: &str) -> Result<ComputeExecution, StoreError> {
            let guard = self.inner.read().await;
            guard
                .executions
                .get(execution_id)
                .cloned()
                .ok_or_else(|| StoreError::ExecutionNotFound(execution_id.to_string()))
        }

        async fn list_compute_executions(
            &self,
            tenant_id: &str,
            filter: &ExecutionFilter,
        ) -> Result<Vec<ComputeExecution>, StoreError> {
            let guard = self.inner.read().await;
            let mut items: Vec<ComputeExecution> = guard
                .executions
                .values()
                .filter(|e| e.tenant_id == tenant_id)
                .filter(|e| filter.status.map_or(true, |s| e.status == s))
                .filter(|e| filter.operation.map_or(true, |op| e.operation_type == op))
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

        async fn add_execution_history(&self, entry: &ExecutionHistoryEntry) -> Result<(), StoreError> {
            let mut guard = self.inner.write().await;
            guard
                .history
                .entry(entry.execution_id.clone())
                .or_default()
                .push(entry.clone());
            Ok(())
        }

        async fn get_execution_history(
            &self,
            execution_id: &str,
        ) -> Result<Vec<ExecutionHistoryEntry>, StoreError> {
            let guard = self.inner.read().await;
            Ok(guard.history.get(execution_id).cloned().unwrap_or_default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use landlord_domain::OperationType;

        #[tokio::test]
        async fn create_update_and_get() {
            let store = InMemoryExecutionStore::new();
            let exec = ComputeExecution::new(
                "acme-prod-provision-abc123456789".to_string(),
                "acme-prod".to_string(),
                OperationType::Provision,
            );
            store.create_compute_execution(&exec).await.unwrap();

            let mut updated = exec.clone();
            updated.status = landlord_domain::ExecutionStatus::Running;
            store.update_compute_execution(&updated).await.unwrap();

            let fetched = store.get_compute_execution(&exec.execution_id).await.unwrap();
            assert_eq!(fetched.status, landlord_domain::ExecutionStatus::Running);
        }

        #[tokio::test]
        async fn update_of_unknown_execution_is_not_found() {
            let store = InMemoryExecutionStore::new();
            let exec = ComputeExecution::new("nope".to_string(), "acme".to_string(), OperationType::Provision);
            let err = store.update_compute_execution(&exec).await.unwrap_err();
            assert!(matches!(err, StoreError::ExecutionNotFound(_)));
        }

        #[tokio::test]
        async fn history_is_ordered_oldest_first() {
            let store = InMemoryExecutionStore::new();
            store
                .add_execution_history(&ExecutionHistoryEntry::new("exec-1", landlord_domain::ExecutionStatus::Pending, None))
                .await
                .unwrap();
            store
                .add_execution_history(&ExecutionHistoryEntry::new("exec-1", landlord_domain::ExecutionStatus::Running, None))
                .await
                .unwrap();

            let history = store.get_execution_history("exec-1").await.unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].status, landlord_domain::ExecutionStatus::Pending);
            assert_eq!(history[1].status, landlord_domain::ExecutionStatus::Running);
        }
    }
}

pub mod postgres {
    use async_trait::async_trait;
    use landlord_domain::{ComputeExecution, ExecutionHistoryEntry};
    use sqlx::PgPool;

    use super::{ExecutionFilter, ExecutionStore};
    use crate::error::StoreError;

    const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS compute_executions (
    execution_id TEXT PRIMARY KEY,
    tenant_id    TEXT NOT NULL,
    state        JSONB NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_compute_executions_tenant
    ON compute_executions (tenant_id, updated_at DESC);

CREATE TABLE IF NOT EXISTS execution_history (
    seq          BIGSERIAL PRIMARY KEY,
    execution_id TEXT NOT NULL,
    entry        JSONB NOT NULL,
    occurred_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_execution_history_execution
    ON execution_history (execution_id, seq);
"#;

    /// Persistent [`ExecutionStore`] backed by PostgreSQL.
    #[derive(Clone)]
    pub struct PostgresExecutionStore {
        pool: PgPool,
    }

    impl PostgresExecutionStore {
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
    impl ExecutionStore for PostgresExecutionStore {
        async fn create_compute_execution(&self, execution: &ComputeExecution) -> Result<(), StoreError> {
            let json = to_json(execution)?;
            sqlx::query(
                "INSERT INTO compute_executions (execution_id, tenant_id, state, updated_at)
                 VALUES ($1, $2, $3::jsonb, NOW())
                 ON CONFLICT (execution_id) DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()",
            )
            .bind(&execution.execution_id)
            .bind(&execution.tenant_id)
            .bind(&json)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
            Ok(())
        }

        async fn update_compute_execution(&self, execution: &ComputeExecution) -> Result<(), StoreError> {
            let json = to_json(execution)?;
            let result = sqlx::query(
                "UPDATE compute_executions SET state = $1::jsonb, updated_at = NOW()
                 WHERE execution_id = $2",
            )
            .bind(&json)
            .bind(&execution.execution_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(StoreError::ExecutionNotFound(execution.execution_id.clone()));
            }
            Ok(())
        }

        async fn get_compute_execution(&self, execution_id: &str) -> Result<ComputeExecution, StoreError> {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as("SELECT state FROM compute_executions WHERE execution_id = $1")
                    .bind(execution_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::Internal(e.to_string()))?;
            match row {
                Some((v,)) => from_json(v),
                None => Err(StoreError::ExecutionNotFound(execution_id.to_string())),
            }
        }

        async fn list_compute_executions(
            &self,
            tenant_id: &str,
            filter: &ExecutionFilter,
        ) -> Result<Vec<ComputeExecution>, StoreError> {
            let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
                "SELECT state FROM compute_executions WHERE tenant_id = $1 ORDER BY updated_at DESC",
            )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

            let mut items: Vec<ComputeExecution> = rows
                .into_iter()
                .map(|(v,)| from_json(v))
                .collect::<Result<_, _>>()?;

            items.retain(|e| {
                filter.status.map_or(true, |s| e.status == s)
                    && filter.operation.map_or(true, |op| e.operation_type == op)
            });

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

        async fn add_execution_history(&self, entry: &ExecutionHistoryEntry) -> Result<(), StoreError> {
            let json = to_json(entry)?;
            sqlx::query(
                "INSERT INTO execution_history (execution_id, entry, occurred_at)
                 VALUES ($1, $2::jsonb, NOW())",
            )
            .bind(&entry.execution_id)
            .bind(&json)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
            Ok(())
        }

        async fn get_execution_history(
            &self,
            execution_id: &str,
        ) -> Result<Vec<ExecutionHistoryEntry>, StoreError> {
            let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
                "SELECT entry FROM execution_history WHERE execution_id = $1 ORDER BY seq ASC",
            )
            .bind(execution_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
            rows.into_iter().map(|(v,)| from_json(v)).collect()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use landlord_domain::OperationType;

        fn test_url() -> Option<String> {
            std::env::var("TEST_POSTGRES_URL").ok()
        }

        #[tokio::test]
        #[ignore = "requires TEST_POSTGRES_URL"]
        async fn create_update_get_roundtrip() {
            let url = test_url().unwrap();
            let store = PostgresExecutionStore::connect(&url).await.unwrap();

            let exec = ComputeExecution::new(
                "pg-exec-store-test-abc123456789".to_string(),
                "pg-exec-store-tenant".to_string(),
                OperationType::Provision,
            );
            store.create_compute_execution(&exec).await.unwrap();

            let fetched = store.get_compute_execution(&exec.execution_id).await.unwrap();
            assert_eq!(fetched.tenant_id, exec.tenant_id);
        }
    }
}

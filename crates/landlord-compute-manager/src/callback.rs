use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use landlord_workflow::{CallbackOptions, WorkflowProvider};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const PER_CALL_TIMEOUT: Duration = Duration::from_secs(30);
const BACKOFF: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub execution_id: String,
    pub tenant_id: String,
    pub status: String,
    pub resource_ids: Option<HashMap<String, String>>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub is_retriable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCallbackRecord {
    pub payload: CallbackPayload,
    pub error: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
}

/// In-memory record of callback payloads that exhausted delivery retries.
/// Process-local by design (see DESIGN.md) — a restart drops this queue.
#[derive(Default)]
pub struct FailedCallbacks {
    inner: RwLock<HashMap<String, FailedCallbackRecord>>,
}

impl FailedCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, execution_id: &str) -> Option<FailedCallbackRecord> {
        self.inner.read().await.get(execution_id).cloned()
    }

    pub async fn list(&self) -> Vec<FailedCallbackRecord> {
        self.inner.read().await.values().cloned().collect()
    }

    async fn record(&self, payload: CallbackPayload, error: String) {
        let mut guard = self.inner.write().await;
        let now = Utc::now();
        guard
            .entry(payload.execution_id.clone())
            .and_modify(|existing| {
                existing.attempts += 1;
                existing.error = error.clone();
                existing.last_attempt_at = now;
            })
            .or_insert_with(|| FailedCallbackRecord {
                payload,
                error,
                attempts: 1,
                failed_at: now,
                last_attempt_at: now,
            });
    }

    async fn remove(&self, execution_id: &str) {
        self.inner.write().await.remove(execution_id);
    }
}

/// `postCallbackWithRetry`. If `provider` is `None`, delivery is skipped
/// silently (no workflow provider configured). Otherwise retries up to
/// [`MAX_RETRIES`] times with exponential backoff; on final failure the
/// payload is recorded in `failed`.
pub async fn post_callback_with_retry(
    provider: Option<&Arc<dyn WorkflowProvider>>,
    failed: &FailedCallbacks,
    payload: CallbackPayload,
) {
    let Some(provider) = provider else {
        debug!(execution_id = %payload.execution_id, "no workflow provider configured, skipping callback");
        return;
    };

    let body = json!({
        "execution_id": payload.execution_id,
        "tenant_id": payload.tenant_id,
        "status": payload.status,
        "resource_ids": payload.resource_ids,
        "error_code": payload.error_code,
        "error_message": payload.error_message,
        "is_retriable": payload.is_retriable,
    });
    let opts = CallbackOptions { timeout: Some(PER_CALL_TIMEOUT) };

    let mut last_err = String::new();
    for attempt in 0..MAX_RETRIES {
        match provider.post_compute_callback(&payload.execution_id, &body, &opts).await {
            Ok(()) => {
                failed.remove(&payload.execution_id).await;
                return;
            }
            Err(e) => {
                last_err = e.to_string();
                warn!(
                    execution_id = %payload.execution_id,
                    attempt = attempt + 1,
                    error = %last_err,
                    "compute callback delivery failed"
                );
                if attempt + 1 < MAX_RETRIES {
                    tokio::time::sleep(BACKOFF[attempt as usize]).await;
                }
            }
        }
    }

    failed.record(payload, last_err).await;
}

/// `RetryFailedCallback`: attempts one more delivery. On success, removes the
/// record; on failure, updates its attempt count.
pub async fn retry_failed_callback(
    provider: Option<&Arc<dyn WorkflowProvider>>,
    failed: &FailedCallbacks,
    execution_id: &str,
) -> Result<(), String> {
    let Some(record) = failed.get(execution_id).await else {
        return Ok(());
    };
    let Some(provider) = provider else {
        return Err("no workflow provider configured".to_string());
    };

    let body = json!({
        "execution_id": record.payload.execution_id,
        "tenant_id": record.payload.tenant_id,
        "status": record.payload.status,
        "resource_ids": record.payload.resource_ids,
        "error_code": record.payload.error_code,
        "error_message": record.payload.error_message,
        "is_retriable": record.payload.is_retriable,
    });
    let opts = CallbackOptions { timeout: Some(PER_CALL_TIMEOUT) };

    match provider
        .post_compute_callback(&record.payload.execution_id, &body, &opts)
        .await
    {
        Ok(()) => {
            failed.remove(execution_id).await;
            Ok(())
        }
        Err(e) => {
            failed.record(record.payload, e.to_string()).await;
            Err(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landlord_workflow::MockWorkflowProvider;

    fn payload(execution_id: &str) -> CallbackPayload {
        CallbackPayload {
            execution_id: execution_id.to_string(),
            tenant_id: "acme-prod".to_string(),
            status: "succeeded".to_string(),
            resource_ids: None,
            error_code: None,
            error_message: None,
            is_retriable: false,
        }
    }

    #[tokio::test]
    async fn missing_provider_skips_delivery_without_recording_failure() {
        let failed = FailedCallbacks::new();
        post_callback_with_retry(None, &failed, payload("exec-1")).await;
        assert!(failed.get("exec-1").await.is_none());
    }

    #[tokio::test]
    async fn successful_delivery_leaves_no_failed_record() {
        let provider: Arc<dyn WorkflowProvider> = Arc::new(MockWorkflowProvider::new("mock"));
        let failed = FailedCallbacks::new();
        post_callback_with_retry(Some(&provider), &failed, payload("exec-2")).await;
        assert!(failed.get("exec-2").await.is_none());
    }

    #[tokio::test]
    async fn retrying_an_unknown_execution_is_a_no_op() {
        let failed = FailedCallbacks::new();
        let result = retry_failed_callback(None, &failed, "never-failed").await;
        assert!(result.is_ok());
    }
}

use std::time::Duration;

use crate::error::ConfigError;

/// Workflow providers a [`ControllerConfig`] may name.
const KNOWN_WORKFLOW_PROVIDERS: &[&str] = &["mock", "step-functions", "restate"];

/// Tunables for the reconciler and its dependent collaborators. One instance
/// is built at startup and shared (read-only) across worker tasks.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Master switch; when false the reconciler accepts no work.
    pub enabled: bool,
    /// Name of the registered workflow provider to drive with, when set.
    pub workflow_provider: Option<String>,
    /// Cadence of the full-scan poll loop (C9 loop 1).
    pub reconciliation_interval: Duration,
    /// Cadence of the in-flight-execution status poll loop (C9 loop 2).
    pub status_poll_interval: Duration,
    /// Number of concurrent worker tasks draining the work queue.
    pub workers: usize,
    /// Deadline for a single `TriggerWorkflow` round-trip.
    pub workflow_trigger_timeout: Duration,
    /// Grace period given to in-flight workers on `Stop`.
    pub shutdown_timeout: Duration,
    /// Upper bound on requeue attempts before a tenant is marked `failed`.
    pub max_retries: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workflow_provider: Some("mock".to_string()),
            reconciliation_interval: Duration::from_secs(30),
            status_poll_interval: Duration::from_secs(5),
            workers: 4,
            workflow_trigger_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            max_retries: 15,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.workflow_provider {
            if provider.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "workflow_provider must not be empty when set".to_string(),
                ));
            }
            if !KNOWN_WORKFLOW_PROVIDERS.contains(&provider.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "workflow_provider must be one of {KNOWN_WORKFLOW_PROVIDERS:?}, got '{provider}'"
                )));
            }
        }
        if self.workers == 0 {
            return Err(ConfigError::Validation(
                "workers must be at least 1".to_string(),
            ));
        }
        // "all durations positive when enabled" (spec.md §6) — a disabled
        // controller never starts its loops, so stale/zeroed durations are
        // harmless and shouldn't block startup.
        if self.enabled {
            if self.reconciliation_interval.is_zero() {
                return Err(ConfigError::Validation(
                    "reconciliation_interval must be positive".to_string(),
                ));
            }
            if self.status_poll_interval.is_zero() {
                return Err(ConfigError::Validation(
                    "status_poll_interval must be positive".to_string(),
                ));
            }
            if self.workflow_trigger_timeout.is_zero() {
                return Err(ConfigError::Validation(
                    "workflow_trigger_timeout must be positive".to_string(),
                ));
            }
            if self.shutdown_timeout.is_zero() {
                return Err(ConfigError::Validation(
                    "shutdown_timeout must be positive".to_string(),
                ));
            }
        }
        // max_retries has no floor ("max_retries >= 0"); any u32 is valid.
        Ok(())
    }
}

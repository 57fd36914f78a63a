use std::time::Duration;

use tracing::debug;

use crate::controller::ControllerConfig;
use crate::error::ConfigError;

const PREFIX: &str = "LANDLORD_";

/// Build a [`ControllerConfig`] from `LANDLORD_*` environment variables,
/// falling back to [`ControllerConfig::default`] for anything unset.
pub fn from_env() -> Result<ControllerConfig, ConfigError> {
    let mut cfg = ControllerConfig::default();

    if let Some(v) = var("ENABLED")? {
        cfg.enabled = parse_bool("ENABLED", &v)?;
    }
    if let Some(v) = var("WORKFLOW_PROVIDER")? {
        cfg.workflow_provider = Some(v);
    }
    if let Some(v) = var("RECONCILIATION_INTERVAL_SECS")? {
        cfg.reconciliation_interval = Duration::from_secs(parse_u64("RECONCILIATION_INTERVAL_SECS", &v)?);
    }
    if let Some(v) = var("STATUS_POLL_INTERVAL_SECS")? {
        cfg.status_poll_interval = Duration::from_secs(parse_u64("STATUS_POLL_INTERVAL_SECS", &v)?);
    }
    if let Some(v) = var("WORKERS")? {
        cfg.workers = parse_u64("WORKERS", &v)? as usize;
    }
    if let Some(v) = var("WORKFLOW_TRIGGER_TIMEOUT_SECS")? {
        cfg.workflow_trigger_timeout = Duration::from_secs(parse_u64("WORKFLOW_TRIGGER_TIMEOUT_SECS", &v)?);
    }
    if let Some(v) = var("SHUTDOWN_TIMEOUT_SECS")? {
        cfg.shutdown_timeout = Duration::from_secs(parse_u64("SHUTDOWN_TIMEOUT_SECS", &v)?);
    }
    if let Some(v) = var("MAX_RETRIES")? {
        cfg.max_retries = parse_u64("MAX_RETRIES", &v)? as u32;
    }

    cfg.validate()?;
    debug!(workers = cfg.workers, provider = ?cfg.workflow_provider, "loaded controller config");
    Ok(cfg)
}

fn var(suffix: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(format!("{PREFIX}{suffix}")) {
        Ok(v) => Ok(Some(v)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            var: format!("{PREFIX}{suffix}"),
            message: "value is not valid unicode".to_string(),
        }),
    }
}

fn parse_u64(suffix: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        var: format!("{PREFIX}{suffix}"),
        message: e.to_string(),
    })
}

fn parse_bool(suffix: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: format!("{PREFIX}{suffix}"),
            message: format!("'{other}' is not a recognized boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_forms() {
        assert!(parse_bool("ENABLED", "true").unwrap());
        assert!(parse_bool("ENABLED", "1").unwrap());
        assert!(!parse_bool("ENABLED", "false").unwrap());
        assert!(parse_bool("ENABLED", "garbage").is_err());
    }

    #[test]
    fn parse_u64_rejects_non_numeric() {
        assert!(parse_u64("WORKERS", "not-a-number").is_err());
        assert_eq!(parse_u64("WORKERS", "8").unwrap(), 8);
    }
}

use std::collections::HashMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Deterministic digest over a desired-config map: canonical JSON (object
/// keys sorted recursively) fed through SHA-256. Equal inputs produce equal
/// strings; an empty config hashes to the empty string.
pub fn compute_config_hash(desired_config: &HashMap<String, Value>) -> String {
    if desired_config.is_empty() {
        return String::new();
    }
    let value = Value::Object(desired_config.clone().into_iter().collect());
    let canonical = sort_json_keys(value);
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    format!("{:x}", digest)
}

/// Recursively sort JSON object keys so HashMap iteration order never affects the hash.
fn sort_json_keys(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_json_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json_keys).collect()),
        other => other,
    }
}

/// `<tenant>-<op>-<md5(<tenant>:<op>)[0:12]>` — the deterministic compute
/// execution id. A pure function of `(tenant, op)`.
pub fn generate_compute_execution_id(tenant: &str, operation: &str) -> String {
    let digest = md5::compute(format!("{tenant}:{operation}"));
    let hex = format!("{:x}", digest);
    format!("{tenant}-{operation}-{}", &hex[..12])
}

/// `tenant-<tenant-name-or-uuid>-<workflow_id>-<operation>` — the workflow
/// execution name/idempotency key.
pub fn workflow_execution_name(tenant: &str, workflow_id: &str, operation: &str) -> String {
    format!("tenant-{tenant}-{workflow_id}-{operation}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_hashes_to_empty_string() {
        assert_eq!(compute_config_hash(&HashMap::new()), "");
    }

    #[test]
    fn equal_configs_hash_equal() {
        let mut a = HashMap::new();
        a.insert("image".to_string(), Value::String("nginx:1.25".to_string()));
        a.insert("replicas".to_string(), Value::from(3));

        let mut b = HashMap::new();
        b.insert("replicas".to_string(), Value::from(3));
        b.insert("image".to_string(), Value::String("nginx:1.25".to_string()));

        assert_eq!(compute_config_hash(&a), compute_config_hash(&b));
    }

    #[test]
    fn unequal_configs_hash_unequal() {
        let mut a = HashMap::new();
        a.insert("image".to_string(), Value::String("nginx:1.25".to_string()));
        let mut b = HashMap::new();
        b.insert("image".to_string(), Value::String("nginx:1.26".to_string()));
        assert_ne!(compute_config_hash(&a), compute_config_hash(&b));
    }

    #[test]
    fn execution_id_is_pure_function_of_tenant_and_op() {
        let a = generate_compute_execution_id("acme-prod", "provision");
        let b = generate_compute_execution_id("acme-prod", "provision");
        assert_eq!(a, b);
        assert!(a.starts_with("acme-prod-provision-"));
        assert_eq!(a.len(), "acme-prod-provision-".len() + 12);
    }

    #[test]
    fn execution_id_differs_by_operation() {
        let provision = generate_compute_execution_id("acme-prod", "provision");
        let delete = generate_compute_execution_id("acme-prod", "delete");
        assert_ne!(provision, delete);
    }

    #[test]
    fn workflow_execution_name_format() {
        assert_eq!(
            workflow_execution_name("acme-prod", "wf-123", "provision"),
            "tenant-acme-prod-wf-123-provision"
        );
    }
}

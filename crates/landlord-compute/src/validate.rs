use landlord_domain::{HealthCheckType, TenantComputeSpec};
use serde_json::Value;

use crate::error::ComputeError;

fn is_dns_label(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// `ValidateComputeSpec` (C10): structural validation independent of any
/// provider's JSON Schema. Returns the first violation found.
pub fn validate_compute_spec(spec: &TenantComputeSpec) -> Result<(), ComputeError> {
    if spec.tenant_id.is_empty() || !is_dns_label(&spec.tenant_id) {
        return Err(ComputeError::InvalidSpec(format!(
            "tenant_id '{}' must match ^[a-z0-9-]+$",
            spec.tenant_id
        )));
    }
    if spec.provider_type.is_empty() {
        return Err(ComputeError::InvalidSpec("provider_type must not be empty".to_string()));
    }
    if spec.containers.is_empty() {
        return Err(ComputeError::InvalidSpec("at least one container is required".to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    for c in &spec.containers {
        if c.name.is_empty() || !is_dns_label(&c.name) {
            return Err(ComputeError::InvalidSpec(format!(
                "container name '{}' must match ^[a-z0-9-]+$",
                c.name
            )));
        }
        if !seen.insert(c.name.clone()) {
            return Err(ComputeError::InvalidSpec(format!("duplicate container name '{}'", c.name)));
        }
        if c.image.is_empty() {
            return Err(ComputeError::InvalidSpec(format!("container '{}' has an empty image", c.name)));
        }
        for port in &c.ports {
            if port.container_port == 0 || port.container_port > 65535 {
                return Err(ComputeError::InvalidSpec(format!(
                    "container '{}' port {} out of range [1, 65535]",
                    c.name, port.container_port
                )));
            }
        }
        if let Some(hc) = &c.health_check {
            match hc.check_type {
                HealthCheckType::Http | HealthCheckType::Tcp | HealthCheckType::Exec => {}
            }
            if hc.interval_seconds < 5 {
                return Err(ComputeError::InvalidSpec(format!(
                    "container '{}' health check interval_seconds must be >= 5",
                    c.name
                )));
            }
            if hc.timeout_seconds < 1 {
                return Err(ComputeError::InvalidSpec(format!(
                    "container '{}' health check timeout_seconds must be >= 1",
                    c.name
                )));
            }
            if hc.timeout_seconds >= hc.interval_seconds {
                return Err(ComputeError::InvalidSpec(format!(
                    "container '{}' health check timeout_seconds must be strictly less than interval_seconds",
                    c.name
                )));
            }
        }
    }

    if spec.resources.cpu_millicores < 128 {
        return Err(ComputeError::InvalidSpec("resources.cpu_millicores must be >= 128".to_string()));
    }
    if spec.resources.memory_mb < 128 {
        return Err(ComputeError::InvalidSpec("resources.memory_mb must be >= 128".to_string()));
    }

    Ok(())
}

/// One violation produced by [`SchemaValidator::validate`].
#[derive(Debug, Clone)]
pub struct SchemaViolation {
    pub instance_location: String,
    pub message: String,
}

/// Validates an opaque provider config blob against a JSON Schema. Kept
/// behind a trait so a provider's schema engine can be swapped in tests.
pub trait SchemaValidator: Send + Sync + 'static {
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<SchemaViolation>;
}

/// Default [`SchemaValidator`] backed by the `jsonschema` crate.
#[derive(Debug, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<SchemaViolation> {
        let compiled = match jsonschema::validator_for(schema) {
            Ok(c) => c,
            Err(e) => {
                return vec![SchemaViolation {
                    instance_location: "".to_string(),
                    message: format!("invalid schema: {e}"),
                }]
            }
        };
        compiled
            .iter_errors(instance)
            .map(|e| SchemaViolation {
                instance_location: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landlord_domain::{ContainerSpec, NetworkConfig, PortSpec, Protocol, ResourceRequirements};
    use std::collections::HashMap;

    fn valid_spec() -> TenantComputeSpec {
        TenantComputeSpec {
            tenant_id: "acme-prod".to_string(),
            provider_type: "k8s".to_string(),
            containers: vec![ContainerSpec {
                name: "web".to_string(),
                image: "nginx:1.25".to_string(),
                ports: vec![PortSpec { container_port: 8080, protocol: Protocol::Tcp }],
                env: HashMap::new(),
                health_check: None,
            }],
            resources: ResourceRequirements { cpu_millicores: 128, memory_mb: 128 },
            network: NetworkConfig::default(),
            secret_refs: vec![],
            labels: HashMap::new(),
            provider_config: HashMap::new(),
        }
    }

    #[test]
    fn valid_spec_passes() {
        validate_compute_spec(&valid_spec()).unwrap();
    }

    #[test]
    fn empty_containers_rejected() {
        let mut s = valid_spec();
        s.containers.clear();
        assert!(validate_compute_spec(&s).is_err());
    }

    #[test]
    fn cpu_boundary() {
        let mut s = valid_spec();
        s.resources.cpu_millicores = 127;
        assert!(validate_compute_spec(&s).is_err());
        s.resources.cpu_millicores = 128;
        assert!(validate_compute_spec(&s).is_ok());
    }

    #[test]
    fn memory_boundary() {
        let mut s = valid_spec();
        s.resources.memory_mb = 127;
        assert!(validate_compute_spec(&s).is_err());
        s.resources.memory_mb = 128;
        assert!(validate_compute_spec(&s).is_ok());
    }

    #[test]
    fn port_out_of_range_rejected() {
        let mut s = valid_spec();
        s.containers[0].ports[0].container_port = 70000;
        assert!(validate_compute_spec(&s).is_err());
    }

    #[test]
    fn port_boundary() {
        let mut s = valid_spec();
        s.containers[0].ports[0].container_port = 0;
        assert!(validate_compute_spec(&s).is_err());
        s.containers[0].ports[0].container_port = 65536;
        assert!(validate_compute_spec(&s).is_err());
        s.containers[0].ports[0].container_port = 65535;
        assert!(validate_compute_spec(&s).is_ok());
        s.containers[0].ports[0].container_port = 1;
        assert!(validate_compute_spec(&s).is_ok());
    }

    #[test]
    fn duplicate_container_names_rejected() {
        let mut s = valid_spec();
        let dup = s.containers[0].clone();
        s.containers.push(dup);
        assert!(validate_compute_spec(&s).is_err());
    }

    #[test]
    fn health_check_timeout_must_be_less_than_interval() {
        let mut s = valid_spec();
        s.containers[0].health_check = Some(landlord_domain::HealthCheck {
            check_type: HealthCheckType::Http,
            interval_seconds: 10,
            timeout_seconds: 10,
        });
        assert!(validate_compute_spec(&s).is_err());

        s.containers[0].health_check = Some(landlord_domain::HealthCheck {
            check_type: HealthCheckType::Http,
            interval_seconds: 10,
            timeout_seconds: 9,
        });
        assert!(validate_compute_spec(&s).is_ok());
    }

    #[test]
    fn health_check_interval_floor() {
        let mut s = valid_spec();
        s.containers[0].health_check = Some(landlord_domain::HealthCheck {
            check_type: HealthCheckType::Tcp,
            interval_seconds: 4,
            timeout_seconds: 1,
        });
        assert!(validate_compute_spec(&s).is_err());
    }

    #[test]
    fn json_schema_validator_flags_violations() {
        let validator = JsonSchemaValidator;
        let schema = serde_json::json!({
            "type": "object",
            "required": ["replicas"],
            "properties": { "replicas": { "type": "integer", "minimum": 1 } }
        });
        let instance = serde_json::json!({ "replicas": 0 });
        let violations = validator.validate(&schema, &instance);
        assert!(!violations.is_empty());

        let ok_instance = serde_json::json!({ "replicas": 3 });
        assert!(validator.validate(&schema, &ok_instance).is_empty());
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input to a compute backend describing how to materialize one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantComputeSpec {
    pub tenant_id: String,
    pub provider_type: String,
    pub containers: Vec<ContainerSpec>,
    pub resources: ResourceRequirements,
    pub network: NetworkConfig,
    pub secret_refs: Vec<String>,
    pub labels: HashMap<String, String>,
    /// Opaque per-provider configuration, validated against the provider's JSON Schema.
    pub provider_config: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub ports: Vec<PortSpec>,
    pub env: HashMap<String, String>,
    pub health_check: Option<HealthCheck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSpec {
    pub container_port: u32,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckType {
    Http,
    Tcp,
    Exec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub check_type: HealthCheckType,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// CPU millicores. Must be >= 128.
    pub cpu_millicores: u32,
    /// Memory in MB. Must be >= 128.
    pub memory_mb: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub vpc_id: Option<String>,
    pub subnet_ids: Vec<String>,
    pub public: bool,
}

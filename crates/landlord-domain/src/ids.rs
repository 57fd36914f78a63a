use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        TenantId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TenantId {
    fn from(u: Uuid) -> Self {
        TenantId(u)
    }
}

/// Returns true if `name` is a valid tenant name: lowercase alphanumeric and
/// hyphen only, non-empty, at most 255 characters.
pub fn is_valid_tenant_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_tenant_name("acme-prod"));
        assert!(is_valid_tenant_name("a"));
        assert!(is_valid_tenant_name("tenant-123"));
    }

    #[test]
    fn invalid_names() {
        assert!(!is_valid_tenant_name(""));
        assert!(!is_valid_tenant_name("Acme"));
        assert!(!is_valid_tenant_name("acme_prod"));
        assert!(!is_valid_tenant_name("acme prod"));
        assert!(!is_valid_tenant_name(&"a".repeat(256)));
    }
}

use landlord_domain::TenantComputeSpec;

pub const LABEL_OWNER: &str = "landlord.owner";
pub const LABEL_TENANT_ID: &str = "landlord.tenant_id";
pub const LABEL_PROVIDER: &str = "landlord.provider";

/// Merge reserved `landlord.*` labels over `spec.labels`, overwriting any
/// user-supplied value for those keys. Called by the Compute Manager before
/// every `Provision`/`Update`.
pub fn apply_default_metadata(spec: &mut TenantComputeSpec) {
    spec.labels.insert(LABEL_OWNER.to_string(), "landlord".to_string());
    spec.labels
        .insert(LABEL_TENANT_ID.to_string(), spec.tenant_id.clone());
    spec.labels
        .insert(LABEL_PROVIDER.to_string(), spec.provider_type.clone());
}

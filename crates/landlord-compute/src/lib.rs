pub mod error;
pub mod metadata;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod validate;

pub use error::{ComputeError, RegistryError};
pub use metadata::apply_default_metadata;
pub use mock::MockComputeProvider;
pub use provider::{ComputeProvider, ProvisionOutcome, ProvisionStatus, TenantStatusReport};
pub use registry::ComputeRegistry;
pub use validate::{validate_compute_spec, JsonSchemaValidator, SchemaValidator, SchemaViolation};

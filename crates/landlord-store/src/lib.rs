pub mod error;
pub mod execution;
pub mod tenant;

pub use error::StoreError;
pub use execution::{memory::InMemoryExecutionStore, postgres::PostgresExecutionStore, ExecutionFilter, ExecutionStore};
pub use tenant::{memory::InMemoryTenantStore, postgres::PostgresTenantStore, TenantFilter, TenantStore};

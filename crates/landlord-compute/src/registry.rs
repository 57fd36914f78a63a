use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::RegistryError;
use crate::provider::ComputeProvider;

/// Name → compute-provider map, guarded by a readers-writer lock so
/// concurrent reconciler workers never block each other on a read (C3).
///
/// Unlike a registry that is only ever populated once at startup, this one
/// expects registration to happen at any point in the process lifetime (the
/// CLI and tests both register providers after construction), so every
/// operation — including reads — goes through the lock.
#[derive(Default)]
pub struct ComputeRegistry {
    providers: RwLock<HashMap<String, Arc<dyn ComputeProvider>>>,
}

impl ComputeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, provider: Arc<dyn ComputeProvider>) -> Result<(), RegistryError> {
        let name = provider.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut guard = self.providers.write().await;
        if guard.contains_key(&name) {
            return Err(RegistryError::ProviderConflict(name));
        }
        guard.insert(name, provider);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<Arc<dyn ComputeProvider>, RegistryError> {
        let guard = self.providers.read().await;
        guard
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ProviderNotFound(name.to_string()))
    }

    pub async fn list(&self) -> Vec<String> {
        let guard = self.providers.read().await;
        guard.keys().cloned().collect()
    }

    pub async fn has(&self, name: &str) -> bool {
        let guard = self.providers.read().await;
        guard.contains_key(name)
    }

    /// `(schema bytes, defaults)` for API introspection.
    pub async fn get_provider_schema(
        &self,
        name: &str,
    ) -> Result<(Vec<u8>, HashMap<String, Value>), RegistryError> {
        let provider = self.get(name).await?;
        Ok((provider.config_schema(), provider.config_defaults()))
    }
}

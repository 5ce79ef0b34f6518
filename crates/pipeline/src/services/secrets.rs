//! Secret store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Failure to retrieve a secret; always fatal to the invocation.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {name} unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

/// Trait for the key-value secret store.
///
/// Secrets are fetched once per invocation and never cached across
/// invocations, so credential rotation takes effect on the next event.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Retrieves the secret value for a well-known identifier.
    async fn access(&self, name: &str) -> Result<String, SecretError>;
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for Arc<S> {
    async fn access(&self, name: &str) -> Result<String, SecretError> {
        (**self).access(name).await
    }
}

#[derive(Debug, Default)]
struct SecretState {
    secrets: HashMap<String, String>,
    accesses: u32,
}

/// In-memory secret store for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    state: Arc<RwLock<SecretState>>,
}

impl InMemorySecretStore {
    /// Creates an empty in-memory secret store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a secret value.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .secrets
            .insert(name.into(), value.into());
    }

    /// Returns the number of access calls made so far.
    pub fn access_count(&self) -> u32 {
        self.state.read().unwrap().accesses
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn access(&self, name: &str) -> Result<String, SecretError> {
        let mut state = self.state.write().unwrap();
        state.accesses += 1;
        state
            .secrets
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::Unavailable {
                name: name.to_string(),
                reason: "not found".to_string(),
            })
    }
}

//! Object store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Failure to read the triggering object.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {bucket}/{name} not found")]
    NotFound { bucket: String, name: String },

    #[error("object storage error: {0}")]
    Io(String),
}

/// Trait for the cloud object store holding the webhook event files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads an object's raw bytes.
    async fn download(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn download(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        (**self).download(bucket, name).await
    }
}

/// In-memory object store for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
}

impl InMemoryObjectStore {
    /// Creates an empty in-memory object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object.
    pub fn put(&self, bucket: impl Into<String>, name: impl Into<String>, bytes: Vec<u8>) {
        self.objects
            .write()
            .unwrap()
            .insert((bucket.into(), name.into()), bytes);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn download(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stored_objects_are_downloadable() {
        let store = InMemoryObjectStore::new();
        store.put("invoices", "event.json", b"{}".to_vec());

        let bytes = store.download("invoices", "event.json").await.unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.download("invoices", "missing.json").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}

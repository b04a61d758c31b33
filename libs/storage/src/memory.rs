//! In-process store for tests and local runs.

use crate::error::StorageError;
use crate::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// [`ObjectStore`] backed by a map. Clones share the same objects.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    unavailable: bool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that fails every request.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Object under `key`, if any.
    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_available(&self, operation: &'static str, key: &str) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::request(operation, key, "service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.check_available("put", key)?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        self.check_available("get", key)?;
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.body.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

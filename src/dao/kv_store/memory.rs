use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{kv_store::KeyValueStore, storage::StorageResult};

/// In-process key-value cache backed by a [`DashMap`].
///
/// Used by the test suites and as an ephemeral fallback when no cache
/// directory is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let entries = self.entries.clone();
        let key = key.to_owned();
        Box::pin(async move { Ok(entries.get(&key).map(|entry| entry.value().clone())) })
    }

    fn put(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        let key = key.to_owned();
        Box::pin(async move {
            entries.insert(key, value);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        let key = key.to_owned();
        Box::pin(async move {
            entries.remove(&key);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_put_remove() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.put("k", "v".into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}

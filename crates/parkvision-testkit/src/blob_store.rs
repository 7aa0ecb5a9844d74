// SPDX-License-Identifier: Apache-2.0
//! In-memory [`BlobStore`] fake for testing without real object storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parkvision_blobstore::{BlobStore, BlobStoreError};

/// In-memory implementation of [`BlobStore`] for testing.
///
/// Tracks call counts per operation and can be told to fail on the next N
/// calls, so retry/backoff paths can be exercised deterministically.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<String, (Vec<u8>, String)>,
    put_count: usize,
    get_count: usize,
    delete_count: usize,
    fail_next_puts: usize,
    fail_next_gets: usize,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to [`BlobStore::put`] return
    /// [`BlobStoreError::Transient`].
    pub fn fail_next_puts(&self, count: usize) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.fail_next_puts = count;
    }

    /// Make the next `count` calls to [`BlobStore::get`] return
    /// [`BlobStoreError::Transient`].
    pub fn fail_next_gets(&self, count: usize) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.fail_next_gets = count;
    }

    /// Number of `put` calls made so far.
    pub fn put_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).put_count
    }

    /// Number of `get` calls made so far.
    pub fn get_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).get_count
    }

    /// Number of `delete` calls made so far.
    pub fn delete_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).delete_count
    }

    /// Whether an object exists under `object_name`.
    pub fn contains(&self, object_name: &str) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).objects.contains_key(object_name)
    }
}

#[async_trait::async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, object_name: &str, bytes: Vec<u8>, mime: &str) -> Result<String, BlobStoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.put_count += 1;
        if inner.fail_next_puts > 0 {
            inner.fail_next_puts -= 1;
            return Err(BlobStoreError::Transient { message: "scripted put failure".to_owned() });
        }
        inner.objects.insert(object_name.to_owned(), (bytes, mime.to_owned()));
        Ok(format!("memory://{object_name}"))
    }

    async fn get(&self, object_name: &str) -> Result<Vec<u8>, BlobStoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.get_count += 1;
        if inner.fail_next_gets > 0 {
            inner.fail_next_gets -= 1;
            return Err(BlobStoreError::Transient { message: "scripted get failure".to_owned() });
        }
        inner
            .objects
            .get(object_name)
            .map(|(bytes, _mime)| bytes.clone())
            .ok_or_else(|| BlobStoreError::NotFound(object_name.to_owned()))
    }

    async fn delete(&self, object_name: &str) -> Result<(), BlobStoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.delete_count += 1;
        inner.objects.remove(object_name);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let store = InMemoryBlobStore::new();
        let url = store.put("images/a.png", vec![1, 2, 3], "image/png").await.unwrap();
        assert_eq!(url, "memory://images/a.png");
        let bytes = store.get("images/a.png").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn get_missing_object_returns_not_found() {
        let store = InMemoryBlobStore::new();
        let result = store.get("images/missing.png").await;
        assert!(matches!(result, Err(BlobStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn fail_next_puts_is_consumed_then_succeeds() {
        let store = InMemoryBlobStore::new();
        store.fail_next_puts(1);
        let first = store.put("a", vec![1], "image/png").await;
        assert!(matches!(first, Err(BlobStoreError::Transient { .. })));
        let second = store.put("a", vec![1], "image/png").await;
        assert!(second.is_ok());
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let store = InMemoryBlobStore::new();
        store.put("a", vec![1], "image/png").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(!store.contains("a"));
        assert_eq!(store.delete_count(), 1);
    }
}

//! In-process blob store.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::cache::blob::{Blob, BlobMeta, BlobStore, StoreError, StoreResult};

const URL_SCHEME: &str = "memory://";

#[derive(Debug, Clone)]
struct StoredBlob {
    meta: BlobMeta,
    body: Bytes,
}

/// A concurrent map standing in for a remote blob service.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<DashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write with an explicit upload time.
    pub fn put_at(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        uploaded_at: DateTime<Utc>,
    ) -> BlobMeta {
        let meta = BlobMeta {
            pathname: key.to_string(),
            url: format!("{URL_SCHEME}{key}"),
            content_type: content_type.to_string(),
            size: body.len() as u64,
            uploaded_at,
        };
        self.inner.insert(
            key.to_string(),
            StoredBlob {
                meta: meta.clone(),
                body,
            },
        );
        meta
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Stored body for `key`, bypassing the URL indirection.
    pub fn body(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key).map(|r| r.value().body.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<BlobMeta> {
        Ok(self.put_at(key, body, content_type, Utc::now()))
    }

    async fn head(&self, key: &str) -> StoreResult<Option<BlobMeta>> {
        Ok(self.inner.get(key).map(|r| r.value().meta.clone()))
    }

    async fn fetch(&self, url: &str) -> StoreResult<Blob> {
        let key = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
        self.inner
            .get(key)
            .map(|r| Blob {
                body: r.value().body.clone(),
                content_type: r.value().meta.content_type.clone(),
            })
            .ok_or_else(|| StoreError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_head_fetch() {
        let store = MemoryBlobStore::new();
        assert!(store.head("k").await.unwrap().is_none());

        let meta = store
            .put("k", Bytes::from_static(b"<p>hi</p>"), "text/html")
            .await
            .unwrap();
        assert_eq!(meta.url, "memory://k");
        assert_eq!(meta.size, 9);

        let head = store.head("k").await.unwrap().unwrap();
        assert_eq!(head, meta);

        let blob = store.fetch(&head.url).await.unwrap();
        assert_eq!(&blob.body[..], b"<p>hi</p>");
        assert_eq!(blob.content_type, "text/html");
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryBlobStore::new();
        store.put("k", Bytes::from_static(b"one"), "text/plain").await.unwrap();
        store.put("k", Bytes::from_static(b"two"), "text/html").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.body("k").unwrap(), Bytes::from_static(b"two"));
        assert_eq!(store.head("k").await.unwrap().unwrap().content_type, "text/html");
    }

    #[tokio::test]
    async fn test_fetch_unknown_url() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.fetch("memory://missing").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.fetch("https://elsewhere/k").await,
            Err(StoreError::NotFound(_))
        ));
    }
}

//! Cache store adapter.
//!
//! Wraps a [`BlobStore`] behind the two operations the orchestrator needs.
//! Reads never fail the caller: "not found" and "store unreachable" both
//! come back as `None` and are told apart only in the logs. Writes return a
//! `Result` the caller is expected to log and discard.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::blob::{BlobStore, StoreError};
use crate::cache::key::CacheKey;
use crate::observability::metrics;

/// A cached, already-rewritten response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub content_type: String,
    /// Handle into the blob store.
    pub body_ref: String,
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh iff `now - written_at < ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.written_at) < ttl,
            // A TTL too large for chrono never expires.
            Err(_) => true,
        }
    }
}

/// A cache population failure. Never a request failure.
#[derive(Debug, Error)]
#[error("cache write for '{key}' failed: {source}")]
pub struct CacheWriteError {
    pub key: CacheKey,
    #[source]
    pub source: StoreError,
}

#[derive(Clone)]
pub struct CacheStore {
    blobs: Arc<dyn BlobStore>,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(blobs: Arc<dyn BlobStore>, ttl: Duration) -> Self {
        Self { blobs, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up the entry for `key`. Freshness is left to the caller.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.blobs.head(key.as_str()).await {
            Ok(Some(meta)) => Some(CacheEntry {
                key: key.clone(),
                content_type: meta.content_type,
                body_ref: meta.url,
                written_at: meta.uploaded_at,
            }),
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss: no entry");
                None
            }
            Err(e) => {
                metrics::record_cache_read_failure();
                tracing::warn!(key = %key, error = %e, "Cache miss: store lookup failed");
                None
            }
        }
    }

    /// Download the stored body of an entry.
    pub async fn load_body(&self, entry: &CacheEntry) -> Option<(Bytes, String)> {
        match self.blobs.fetch(&entry.body_ref).await {
            Ok(blob) => Some((blob.body, blob.content_type)),
            Err(e) => {
                metrics::record_cache_read_failure();
                tracing::warn!(key = %entry.key, error = %e, "Cached body unavailable");
                None
            }
        }
    }

    /// Replace whatever is stored under `key`.
    pub async fn put(
        &self,
        key: &CacheKey,
        body: Bytes,
        content_type: &str,
    ) -> Result<CacheEntry, CacheWriteError> {
        let meta = self
            .blobs
            .put(key.as_str(), body, content_type)
            .await
            .map_err(|source| CacheWriteError {
                key: key.clone(),
                source,
            })?;

        Ok(CacheEntry {
            key: key.clone(),
            content_type: meta.content_type,
            body_ref: meta.url,
            written_at: meta.uploaded_at,
        })
    }
}

//! Blob store contract.
//!
//! The cache persists into an external key→blob service with three
//! operations: `put` (upsert), `head` (metadata lookup by key) and `fetch`
//! (download by the URL `head` handed out).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for blob store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    #[error("blob store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob metadata error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata the store keeps for every blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    /// Key the blob was written under.
    pub pathname: String,
    /// Location to download the body from.
    pub url: String,
    pub content_type: String,
    pub size: u64,
    /// Time of the last write; the cache freshness clock.
    pub uploaded_at: DateTime<Utc>,
}

/// A downloaded blob.
#[derive(Debug, Clone)]
pub struct Blob {
    pub body: Bytes,
    pub content_type: String,
}

/// Opaque key→blob service.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `body` under `key`, replacing any previous blob.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<BlobMeta>;

    /// Look up metadata for `key`. `Ok(None)` when nothing is stored.
    async fn head(&self, key: &str) -> StoreResult<Option<BlobMeta>>;

    /// Download a blob by the URL from its metadata.
    async fn fetch(&self, url: &str) -> StoreResult<Blob>;
}

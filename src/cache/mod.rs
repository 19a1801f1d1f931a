//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyRequest (path, query, host)
//!     → key.rs (CacheKey, single- or multi-tenant)
//!     → store.rs (CacheStore: get / load_body / put)
//!     → blob.rs (BlobStore trait: put / head / fetch)
//!     → memory.rs | fs.rs (concrete stores)
//! ```
//!
//! # Design Decisions
//! - Entries are replaced wholesale, never updated in place
//! - Freshness is a pure function of the write timestamp and the TTL
//! - No in-process locking; concurrent writers of one key race and the
//!   last write wins

pub mod blob;
pub mod fs;
pub mod key;
pub mod memory;
pub mod store;

use std::sync::Arc;

pub use blob::{Blob, BlobMeta, BlobStore, StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use key::{CacheKey, KeyStrategy};
pub use memory::MemoryBlobStore;
pub use store::{CacheEntry, CacheStore, CacheWriteError};

use crate::config::{CacheConfig, StoreKind};

/// Build the blob store selected by configuration.
pub async fn open_blob_store(config: &CacheConfig) -> StoreResult<Arc<dyn BlobStore>> {
    Ok(match config.store {
        StoreKind::Memory => Arc::new(MemoryBlobStore::new()),
        StoreKind::Filesystem => Arc::new(FsBlobStore::open(&config.directory).await?),
    })
}

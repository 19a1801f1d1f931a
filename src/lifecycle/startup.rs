//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the origin client and open the blob store
//! - Assemble the orchestrator from validated configuration
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;
use thiserror::Error;

use crate::cache::{open_blob_store, StoreError};
use crate::config::ProxyConfig;
use crate::proxy::{Orchestrator, OrchestratorBuildError};
use crate::upstream::HttpOriginClient;

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build origin client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to open blob store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorBuildError),
}

/// Build the production orchestrator for `config`.
pub async fn bootstrap(config: &ProxyConfig) -> Result<Orchestrator, StartupError> {
    let fetcher = Arc::new(HttpOriginClient::new(&config.upstream, &config.timeouts)?);
    let blobs = open_blob_store(&config.cache).await?;

    let orchestrator = Orchestrator::from_config(config, fetcher, blobs)?;
    tracing::info!(
        origin = %config.upstream.origin_url,
        store = ?config.cache.store,
        multi_tenant = config.cache.multi_tenant,
        ttl_secs = config.cache.ttl_secs,
        "Proxy core initialized"
    );
    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreKind;

    #[tokio::test]
    async fn test_bootstrap_defaults() {
        assert!(bootstrap(&ProxyConfig::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_filesystem_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = ProxyConfig::default();
        config.cache.store = StoreKind::Filesystem;
        config.cache.directory = dir.path().join("blobs").display().to_string();

        assert!(bootstrap(&config).await.is_ok());
        assert!(dir.path().join("blobs").is_dir());
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_bad_origin() {
        let mut config = ProxyConfig::default();
        config.upstream.origin_url = "::not-a-url".into();
        assert!(matches!(
            bootstrap(&config).await,
            Err(StartupError::Orchestrator(OrchestratorBuildError::Origin(_)))
        ));
    }
}

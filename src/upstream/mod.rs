//! Upstream origin subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyRequest
//!     → target.rs (origin base + path + forwarded query)
//!     → headers.rs (transparent / forced-refresh / form policy)
//!     → client.rs (OriginFetcher: send, buffer body, classify status)
//!     → UpstreamResponse | UpstreamError
//! ```
//!
//! # Design Decisions
//! - Exactly one origin; no load balancing or failover
//! - Compression is never negotiated, bodies arrive as plain bytes
//! - No retries; a failed fetch is reported once

pub mod client;
pub mod headers;
pub mod target;

use thiserror::Error;

pub use client::{HttpOriginClient, OriginFetcher, OriginRequest, UpstreamResponse};
pub use headers::HeaderPolicy;
pub use target::OriginTarget;

/// Error type for origin fetches.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network-level failure: DNS, connect, timeout, truncated body.
    #[error("origin unreachable: {0}")]
    Unreachable(String),

    /// The origin answered, but not with a 2xx.
    #[error("origin returned {}", .0.status)]
    Status(Box<UpstreamResponse>),

    #[error("invalid origin URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

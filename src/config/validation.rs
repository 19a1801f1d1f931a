//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the origin URL is an absolute http(s) URL
//! - Validate value ranges (TTL > 0, body limit > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("upstream.origin_url '{0}' is not a valid URL")]
    OriginUrl(String),

    #[error("upstream.origin_url must use http or https, got '{0}'")]
    OriginScheme(String),

    #[error("cache.ttl_secs must be greater than zero")]
    ZeroTtl,

    #[error("cache.key_prefix must not be empty")]
    EmptyKeyPrefix,

    #[error("cache.directory must not be empty when the filesystem store is selected")]
    EmptyCacheDirectory,

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error(
        "upstream.timeout_secs ({upstream}) must be at least 1 and below timeouts.request_secs ({request})"
    )]
    UpstreamTimeout { upstream: u64, request: u64 },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match Url::parse(&config.upstream.origin_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::OriginScheme(url.scheme().to_string())),
        Err(_) => errors.push(ValidationError::OriginUrl(
            config.upstream.origin_url.clone(),
        )),
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroTtl);
    }
    if config.cache.key_prefix.is_empty() {
        errors.push(ValidationError::EmptyKeyPrefix);
    }
    if config.cache.store == crate::config::StoreKind::Filesystem
        && config.cache.directory.trim().is_empty()
    {
        errors.push(ValidationError::EmptyCacheDirectory);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    // The origin deadline has to fire first, or a stalled origin is
    // reported by the request timeout instead of as an origin failure.
    let (upstream, request) = (config.upstream.timeout_secs, config.timeouts.request_secs);
    if upstream == 0 || (request > 0 && upstream >= request) {
        errors.push(ValidationError::UpstreamTimeout { upstream, request });
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

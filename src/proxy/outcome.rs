//! What the orchestrator hands back to the HTTP layer.

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

/// Value of the `X-Cache-Status` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    BypassedForForm,
    ClearedAndUpdated,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::BypassedForForm => "BYPASSED_FOR_FORM",
            Self::ClearedAndUpdated => "CLEARED_AND_UPDATED",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response ready for emission.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub cache_status: Option<CacheStatus>,
    /// Cache write time on a hit, otherwise the time of serving.
    pub timestamp: DateTime<Utc>,
    /// `Cache-Control: public, max-age=N` for downstream caches.
    pub max_age: Option<u64>,
    /// Origin headers copied through verbatim.
    pub passthrough: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, content_type: impl Into<String>, body: Bytes) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            cache_status: None,
            timestamp: Utc::now(),
            max_age: None,
            passthrough: HeaderMap::new(),
            body,
        }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, "text/html; charset=utf-8", Bytes::from(body.into()))
    }

    pub fn with_cache_status(mut self, status: CacheStatus, at: DateTime<Utc>) -> Self {
        self.cache_status = Some(status);
        self.timestamp = at;
        self
    }

    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn with_passthrough(mut self, headers: HeaderMap) -> Self {
        self.passthrough = headers;
        self
    }

    /// `X-Cache-Status` label for logs and metrics.
    pub fn cache_label(&self) -> &'static str {
        self.cache_status.map(CacheStatus::as_str).unwrap_or("NONE")
    }
}

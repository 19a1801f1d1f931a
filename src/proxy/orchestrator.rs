//! Per-request state machine.
//!
//! # Routes (first match wins)
//! 1. `debug=true`       → raw origin diagnostics, no cache
//! 2. POST               → fresh fetch, rewrite, no cache
//! 3. `test=true` on `/` → liveness echo
//! 4. `clear_cache=true` → forced-refresh fetch, rewrite, overwrite cache
//! 5. otherwise          → fresh cache hit, or fetch + rewrite + write-through
//!
//! # Design Decisions
//! - No locks: two concurrent misses for one key both fetch and both write
//! - Cache failures are logged and absorbed; origin failures are surfaced
//! - Cached bodies are rewritten again on the way out so rule changes apply
//!   to entries written before them

use axum::http::{
    header::{
        CONTENT_ENCODING, CONTENT_SECURITY_POLICY, ETAG, LAST_MODIFIED, STRICT_TRANSPORT_SECURITY,
        VARY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
    },
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;

use crate::cache::{BlobStore, CacheKey, CacheStore, KeyStrategy};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::observability::metrics;
use crate::proxy::outcome::{CacheStatus, ProxyResponse};
use crate::proxy::pages;
use crate::proxy::request::{EntryPoint, ProxyRequest};
use crate::rewrite::{BrandingRules, ContentTransformer};
use crate::upstream::{
    HeaderPolicy, OriginFetcher, OriginRequest, OriginTarget, UpstreamError, UpstreamResponse,
};

pub const DEBUG_PARAM: &str = "debug";
pub const TEST_PARAM: &str = "test";
pub const CLEAR_CACHE_PARAM: &str = crate::cache::key::CLEAR_CACHE_PARAM;

/// Origin headers copied onto a standard miss.
const PASSTHROUGH_HEADERS: [HeaderName; 9] = [
    CONTENT_ENCODING,
    LAST_MODIFIED,
    ETAG,
    VARY,
    X_FRAME_OPTIONS,
    X_CONTENT_TYPE_OPTIONS,
    X_XSS_PROTECTION,
    STRICT_TRANSPORT_SECURITY,
    CONTENT_SECURITY_POLICY,
];

/// Which path a request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Debug,
    FormSubmission,
    Liveness,
    ClearCache,
    Standard,
}

impl Route {
    /// Classify a request. Pure; priority order is the declaration order.
    pub fn classify(request: &ProxyRequest) -> Self {
        if request.query.flag(DEBUG_PARAM) {
            Self::Debug
        } else if request.method == Method::POST {
            Self::FormSubmission
        } else if request.entry == EntryPoint::Root && request.query.flag(TEST_PARAM) {
            Self::Liveness
        } else if request.query.flag(CLEAR_CACHE_PARAM) {
            Self::ClearCache
        } else {
            Self::Standard
        }
    }
}

/// Ties key derivation, origin fetches, rewriting and the cache together.
#[derive(Clone)]
pub struct Orchestrator {
    origin: OriginTarget,
    fetcher: Arc<dyn OriginFetcher>,
    cache: CacheStore,
    keys: KeyStrategy,
    transformer: Arc<ContentTransformer>,
    max_age: u64,
}

impl Orchestrator {
    pub fn new(
        origin: OriginTarget,
        fetcher: Arc<dyn OriginFetcher>,
        cache: CacheStore,
        keys: KeyStrategy,
        transformer: Arc<ContentTransformer>,
    ) -> Self {
        let max_age = cache.ttl().as_secs();
        Self {
            origin,
            fetcher,
            cache,
            keys,
            transformer,
            max_age,
        }
    }

    /// Wire an orchestrator from configuration and its two I/O collaborators.
    pub fn from_config(
        config: &ProxyConfig,
        fetcher: Arc<dyn OriginFetcher>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self, OrchestratorBuildError> {
        let origin = OriginTarget::new(&config.upstream.origin_url)?;
        let keys = if config.cache.multi_tenant {
            KeyStrategy::multi_tenant(&config.cache.key_prefix, &config.upstream.origin_url)
        } else {
            KeyStrategy::single_tenant(&config.cache.key_prefix)
        };
        let rules = BrandingRules::new(config.rewrite.extra_phrases.as_slice())?;

        Ok(Self::new(
            origin,
            fetcher,
            CacheStore::new(blobs, config.cache.ttl()),
            keys,
            Arc::new(ContentTransformer::new(rules)),
        ))
    }

    pub fn key_for(&self, request: &ProxyRequest) -> CacheKey {
        self.keys
            .derive(&request.path, &request.query, request.tenant.as_deref())
    }

    /// Serve one request.
    pub async fn handle(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let route = Route::classify(&request);
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            host = request.tenant.as_deref().unwrap_or("unknown"),
            route = ?route,
            "Routing request"
        );

        match route {
            Route::Debug => self.debug(&request).await,
            Route::FormSubmission => self.form_submission(&request).await,
            Route::Liveness => Ok(ProxyResponse::html(pages::liveness_page(
                &request.method,
                &request.uri,
            ))),
            Route::ClearCache => self.clear_and_refresh(&request).await,
            Route::Standard => self.standard(&request).await,
        }
    }

    async fn debug(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let url = self
            .origin
            .url_for(&request.path, &request.query.without(&[DEBUG_PARAM]))?;
        let upstream = match self
            .fetch(request, HeaderPolicy::Plain, Method::GET, url.clone(), None)
            .await
        {
            Ok(r) => r,
            Err(UpstreamError::Status(r)) => *r,
            Err(e) => return Err(self.surface(e)),
        };

        let raw = String::from_utf8_lossy(&upstream.body);
        Ok(ProxyResponse::html(pages::debug_page(
            url.as_str(),
            upstream.status,
            &raw,
        )))
    }

    async fn form_submission(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        tracing::info!(path = %request.path, "Form submission detected, bypassing cache");

        let url = self.origin.url_for(&request.path, &request.query)?;
        let upstream = match self
            .fetch(
                request,
                HeaderPolicy::FormSubmission,
                request.method.clone(),
                url,
                request.body.clone(),
            )
            .await
        {
            Ok(r) => r,
            // The form's own error page is the answer to the submission.
            Err(UpstreamError::Status(r)) => *r,
            Err(e) => return Err(self.surface(e)),
        };

        let encoding = content_encoding(&upstream.headers);
        let body = self.rewrite(upstream.body, &upstream.content_type, encoding.as_ref());
        Ok(
            ProxyResponse::new(upstream.status, upstream.content_type, body)
                .with_cache_status(CacheStatus::BypassedForForm, Utc::now())
                .with_passthrough(encoding_header(encoding)),
        )
    }

    async fn clear_and_refresh(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let key = self.key_for(request);
        tracing::info!(key = %key, "Cache clear requested, fetching fresh content");

        let url = self.origin.url_for(&request.path, &request.query)?;
        let upstream = self
            .fetch(
                request,
                HeaderPolicy::ForcedRefresh,
                request.method.clone(),
                url,
                None,
            )
            .await
            .map_err(|e| self.surface(e))?;

        let encoding = content_encoding(&upstream.headers);
        let body = self.rewrite(upstream.body, &upstream.content_type, encoding.as_ref());
        if request.method == Method::GET && encoding.is_none() {
            self.write_through(&key, body.clone(), &upstream.content_type)
                .await;
        }

        Ok(
            ProxyResponse::new(StatusCode::OK, upstream.content_type, body)
                .with_cache_status(CacheStatus::ClearedAndUpdated, Utc::now())
                .with_max_age(self.max_age)
                .with_passthrough(encoding_header(encoding)),
        )
    }

    async fn standard(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let key = self.key_for(request);
        let reads_cache = request.method == Method::GET || request.method == Method::HEAD;

        if reads_cache {
            if let Some(hit) = self.lookup(&key).await {
                return Ok(hit);
            }
        }

        let url = self.origin.url_for(&request.path, &request.query)?;
        let upstream = self
            .fetch(
                request,
                HeaderPolicy::Transparent,
                request.method.clone(),
                url,
                request.body.clone(),
            )
            .await
            .map_err(|e| self.surface(e))?;

        let raw_len = upstream.body.len();
        let passthrough = select_passthrough(&upstream.headers);
        let encoding = content_encoding(&upstream.headers);
        let body = self.rewrite(upstream.body, &upstream.content_type, encoding.as_ref());
        tracing::debug!(key = %key, raw_len, rewritten_len = body.len(), "Origin content rewritten");

        if request.method == Method::GET && encoding.is_none() {
            self.write_through(&key, body.clone(), &upstream.content_type)
                .await;
        }

        Ok(
            ProxyResponse::new(upstream.status, upstream.content_type, body)
                .with_cache_status(CacheStatus::Miss, Utc::now())
                .with_max_age(self.max_age)
                .with_passthrough(passthrough),
        )
    }

    /// A fresh, readable cache entry rendered as a HIT.
    async fn lookup(&self, key: &CacheKey) -> Option<ProxyResponse> {
        let entry = self.cache.get(key).await?;
        if !entry.is_fresh_at(Utc::now(), self.cache.ttl()) {
            tracing::debug!(key = %key, written_at = %entry.written_at, "Cache entry stale");
            return None;
        }

        let (body, content_type) = self.cache.load_body(&entry).await?;
        let body = self.transformer.transform_bytes(body, &content_type);
        tracing::debug!(key = %key, "Cache hit");

        Some(
            ProxyResponse::new(StatusCode::OK, content_type, body)
                .with_cache_status(CacheStatus::Hit, entry.written_at)
                .with_max_age(self.max_age),
        )
    }

    /// Rewrite an origin body. Bodies the origin compressed despite the
    /// identity request are opaque and pass through as-is.
    fn rewrite(&self, body: Bytes, content_type: &str, encoding: Option<&HeaderValue>) -> Bytes {
        match encoding {
            Some(encoding) => {
                tracing::warn!(
                    encoding = ?encoding,
                    "Origin ignored identity encoding, passing body through unrewritten"
                );
                body
            }
            None => self.transformer.transform_bytes(body, content_type),
        }
    }

    /// Best-effort cache population.
    async fn write_through(&self, key: &CacheKey, body: Bytes, content_type: &str) {
        match self.cache.put(key, body, content_type).await {
            Ok(entry) => tracing::debug!(key = %entry.key, "Content cached"),
            Err(e) => {
                metrics::record_cache_write_failure();
                tracing::error!(error = %e, "Failed to cache content, serving uncached");
            }
        }
    }

    async fn fetch(
        &self,
        request: &ProxyRequest,
        policy: HeaderPolicy,
        method: Method,
        url: url::Url,
        body: Option<Bytes>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.fetcher
            .fetch(OriginRequest {
                method,
                url,
                headers: policy.build(&request.headers),
                body,
            })
            .await
    }

    /// Map an origin failure onto the error the client sees.
    fn surface(&self, error: UpstreamError) -> ProxyError {
        match error {
            UpstreamError::Status(response) => {
                let UpstreamResponse {
                    status,
                    headers,
                    content_type,
                    body,
                } = *response;
                let content_encoding = content_encoding(&headers);
                ProxyError::UpstreamNonSuccess {
                    status,
                    body: self.rewrite(body, &content_type, content_encoding.as_ref()),
                    content_type,
                    content_encoding,
                }
            }
            UpstreamError::Unreachable(reason) => ProxyError::UpstreamUnreachable(reason),
            UpstreamError::InvalidUrl(e) => ProxyError::InvalidTarget(e),
        }
    }
}

/// A `Content-Encoding` other than identity. Such bodies are never rewritten
/// or cached: the cache does not keep the encoding alongside the body.
fn content_encoding(headers: &HeaderMap) -> Option<HeaderValue> {
    headers
        .get(CONTENT_ENCODING)
        .filter(|v| {
            !v.to_str().is_ok_and(|v| {
                let v = v.trim();
                v.is_empty() || v.eq_ignore_ascii_case("identity")
            })
        })
        .cloned()
}

fn encoding_header(encoding: Option<HeaderValue>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(encoding) = encoding {
        headers.insert(CONTENT_ENCODING, encoding);
    }
    headers
}

fn select_passthrough(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in PASSTHROUGH_HEADERS {
        if let Some(value) = headers.get(&name) {
            out.insert(name, value.clone());
        }
    }
    out
}

/// Error type for building an orchestrator from configuration.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorBuildError {
    #[error("invalid origin URL: {0}")]
    Origin(#[from] url::ParseError),

    #[error("invalid rewrite phrase: {0}")]
    Rules(#[from] regex::Error),
}

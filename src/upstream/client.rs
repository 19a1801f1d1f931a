//! Origin fetcher.
//!
//! # Responsibilities
//! - Issue the outbound request to the origin
//! - Buffer the full response body (it is rewritten as a whole)
//! - Report non-success statuses as errors; the caller decides what they mean

use async_trait::async_trait;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode};
use bytes::Bytes;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::observability::metrics;
use crate::rewrite::DEFAULT_CONTENT_TYPE;
use crate::upstream::{UpstreamError, UpstreamResult};

/// A fully specified outbound request.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// A buffered origin response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Content-Type` of the response, defaulted to `text/html`.
    pub content_type: String,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        Self {
            status,
            headers,
            content_type,
            body,
        }
    }
}

/// Anything that can reach the origin.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fails with `Unreachable` on network failure and with `Status` when
    /// the origin answers with a non-2xx status.
    async fn fetch(&self, request: OriginRequest) -> UpstreamResult<UpstreamResponse>;
}

/// `reqwest`-backed fetcher with a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpOriginClient {
    client: reqwest::Client,
}

impl HttpOriginClient {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if let Some(timeout) = upstream.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OriginFetcher for HttpOriginClient {
    async fn fetch(&self, request: OriginRequest) -> UpstreamResult<UpstreamResponse> {
        let start = Instant::now();
        let OriginRequest {
            method,
            url,
            headers,
            body,
        } = request;

        tracing::debug!(method = %method, url = %url, "Fetching from origin");

        let mut builder = self.client.request(method, url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                metrics::record_origin_fetch("unreachable", start);
                tracing::error!(url = %url, error = %e, timeout = e.is_timeout(), "Origin unreachable");
                return Err(UpstreamError::Unreachable(e.to_string()));
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            metrics::record_origin_fetch("unreachable", start);
            tracing::error!(url = %url, error = %e, "Origin body read failed");
            UpstreamError::Unreachable(e.to_string())
        })?;

        let response = UpstreamResponse::new(status, headers, body);
        if !status.is_success() {
            metrics::record_origin_fetch("error_status", start);
            tracing::warn!(url = %url, status = %status, "Origin returned non-success status");
            return Err(UpstreamError::Status(Box::new(response)));
        }

        metrics::record_origin_fetch("ok", start);
        tracing::debug!(url = %url, status = %status, bytes = response.body.len(), "Origin fetch complete");
        Ok(response)
    }
}

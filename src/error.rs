//! Request-level errors and how they reach the client.

use axum::{
    http::{header::{CONTENT_ENCODING, CONTENT_TYPE}, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use thiserror::Error;

/// Failures that end a request without a normal response.
///
/// Cache failures never appear here; they degrade to serving uncached.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Network-level failure reaching the origin.
    #[error("origin unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The origin answered with a non-2xx status. Forwarded as-is.
    #[error("origin returned {status}")]
    UpstreamNonSuccess {
        status: StatusCode,
        content_type: String,
        body: Bytes,
        /// Set when the origin compressed the body anyway.
        content_encoding: Option<HeaderValue>,
    },

    /// The target URL could not be built from the request.
    #[error("invalid target URL: {0}")]
    InvalidTarget(#[from] url::ParseError),

    /// Request body over the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The request body could not be read, e.g. the client went away mid-upload.
    #[error("failed to read request body: {0}")]
    BadRequestBody(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamUnreachable(_) | Self::InvalidTarget(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::UpstreamNonSuccess { status, .. } => *status,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequestBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::UpstreamNonSuccess {
                content_type,
                body,
                content_encoding,
                ..
            } => {
                let mut response = (status, body).into_response();
                let headers = response.headers_mut();
                if let Ok(value) = HeaderValue::from_str(&content_type) {
                    headers.insert(CONTENT_TYPE, value);
                }
                if let Some(encoding) = content_encoding {
                    headers.insert(CONTENT_ENCODING, encoding);
                }
                response
            }
            Self::PayloadTooLarge { limit } => (
                status,
                Json(json!({ "error": "Payload too large", "limit": limit })),
            )
                .into_response(),
            Self::BadRequestBody(reason) => (
                status,
                Json(json!({ "error": "Bad request", "message": reason })),
            )
                .into_response(),
            other => (
                status,
                Json(json!({ "error": "Internal server error", "message": other.to_string() })),
            )
                .into_response(),
        }
    }
}

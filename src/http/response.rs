//! Response emission.
//!
//! # Responsibilities
//! - Turn a `ProxyResponse` into an HTTP response
//! - Set `Content-Type`, `X-Cache-Status`, `X-Cache-Timestamp`
//! - Add `Cache-Control: public, max-age=N` where the path allows it
//! - Copy selected origin headers through
//!
//! # Design Decisions
//! - Every orchestrator path ends here, so header policy lives in one place
//! - `Content-Length` always describes the emitted (rewritten) body

use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, HeaderValue,
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::proxy::ProxyResponse;

pub const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");
pub const X_CACHE_TIMESTAMP: HeaderName = HeaderName::from_static("x-cache-timestamp");

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();

        for (name, value) in self.passthrough.iter() {
            if *name != CONTENT_LENGTH {
                headers.insert(name.clone(), value.clone());
            }
        }

        if let Ok(value) = HeaderValue::from_str(&self.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        if let Some(status) = self.cache_status {
            headers.insert(X_CACHE_STATUS, HeaderValue::from_static(status.as_str()));
        }
        if let Ok(value) = HeaderValue::from_str(&format_timestamp(self.timestamp)) {
            headers.insert(X_CACHE_TIMESTAMP, value);
        }
        if let Some(max_age) = self.max_age {
            if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={max_age}")) {
                headers.insert(CACHE_CONTROL, value);
            }
        }

        response
    }
}

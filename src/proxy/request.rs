//! Per-request routing facts.

use axum::http::{header::HOST, request::Parts, HeaderMap, Method, Uri};
use bytes::Bytes;
use url::form_urlencoded;

/// Ordered query parameters with unique names.
///
/// Inserting an existing name replaces its value in place, so the first
/// position wins and the last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(raw: &str) -> Self {
        form_urlencoded::parse(raw.as_bytes()).collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `name=true` is present.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name) == Some("true")
    }

    /// A copy without the named parameters.
    pub fn without(&self, names: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !names.contains(&k.as_str()))
                .cloned()
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::default();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Which HTTP binding accepted the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// `/`
    Root,
    /// `/{*path}`
    Wildcard,
}

/// Everything the orchestrator needs to know about an inbound request.
///
/// Built once by the HTTP binding and never modified.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub entry: EntryPoint,
    pub method: Method,
    /// Slash-joined non-empty path segments, still percent-encoded, without
    /// a leading slash. The root is `""`.
    pub path: String,
    pub query: QueryParams,
    /// Inbound host, used to scope cache keys per consuming domain.
    pub tenant: Option<String>,
    pub headers: HeaderMap,
    /// Present for every method except GET and HEAD.
    pub body: Option<Bytes>,
    /// Original request target, for diagnostics.
    pub uri: String,
}

impl ProxyRequest {
    pub fn from_parts(entry: EntryPoint, parts: &Parts, body: Bytes) -> Self {
        let body = if parts.method == Method::GET || parts.method == Method::HEAD {
            None
        } else {
            Some(body)
        };

        Self {
            entry,
            method: parts.method.clone(),
            path: normalize_path(parts.uri.path()),
            query: QueryParams::parse(parts.uri.query().unwrap_or_default()),
            tenant: tenant_signal(&parts.headers, &parts.uri),
            headers: parts.headers.clone(),
            body,
            uri: parts.uri.to_string(),
        }
    }
}

/// Collapse a request path into slash-joined non-empty segments.
///
/// Dot segments are dropped, encoded or not. URL parsing would otherwise
/// resolve them against the origin and climb out of its base path.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && !is_dot_segment(segment))
        .collect::<Vec<_>>()
        .join("/")
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

fn tenant_signal(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .filter(|host| !host.is_empty())
}

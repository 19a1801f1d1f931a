//! Cache key derivation.
//!
//! Single-tenant: `{prefix}:{path}[?{query}]`
//! Multi-tenant:  `{prefix}:{origin}:{host}:{path}[?{query}]`
//!
//! `origin` and `host` are sanitized (non-alphanumerics stripped,
//! lowercased) before they are joined, so the `:` separators can never be
//! forged by either token.

use std::fmt;
use url::form_urlencoded;

use crate::proxy::request::QueryParams;

/// Query parameter that forces a refresh; never part of a key.
pub const CLEAR_CACHE_PARAM: &str = "clear_cache";
/// Query parameter some hosting layers use to carry the captured path.
pub const PATH_CAPTURE_PARAM: &str = "...path";

/// Opaque, deterministic cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip every non-alphanumeric character and lowercase the rest.
pub fn sanitize_identity(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Whether a query parameter is a routing/control signal rather than a
/// cache-varying dimension.
pub fn is_control_param(name: &str) -> bool {
    name == CLEAR_CACHE_PARAM || name == PATH_CAPTURE_PARAM
}

/// Serialize the non-control parameters, sorted by name.
pub fn canonical_query(query: &QueryParams) -> String {
    let mut pairs: Vec<(&str, &str)> = query
        .iter()
        .filter(|(k, _)| !is_control_param(k))
        .collect();
    pairs.sort_unstable();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

/// How keys are scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    /// One deployment, one site: keys vary by path and query only.
    SingleTenant { prefix: String },
    /// Keys additionally scoped by origin identity and inbound host.
    MultiTenant { prefix: String, origin_token: String },
}

impl KeyStrategy {
    pub fn single_tenant(prefix: impl Into<String>) -> Self {
        Self::SingleTenant {
            prefix: prefix.into(),
        }
    }

    pub fn multi_tenant(prefix: impl Into<String>, origin: &str) -> Self {
        Self::MultiTenant {
            prefix: prefix.into(),
            origin_token: sanitize_identity(origin),
        }
    }

    /// Derive the key for a normalized path, its query and the tenant signal.
    ///
    /// `path` is expected without a leading slash; the root is `""`. A missing
    /// tenant signal scopes the key to `unknown`.
    pub fn derive(&self, path: &str, query: &QueryParams, tenant: Option<&str>) -> CacheKey {
        let query = canonical_query(query);
        let resource = if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        };

        let key = match self {
            Self::SingleTenant { prefix } => format!("{prefix}:{resource}"),
            Self::MultiTenant {
                prefix,
                origin_token,
            } => {
                let host_token = sanitize_identity(tenant.unwrap_or("unknown"));
                format!("{prefix}:{origin_token}:{host_token}:{resource}")
            }
        };
        CacheKey(key)
    }
}

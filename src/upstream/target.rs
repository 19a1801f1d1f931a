//! Target URL construction.

use url::{form_urlencoded, Url};

use crate::cache::key::is_control_param;
use crate::proxy::request::QueryParams;

/// The configured origin, normalized once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginTarget {
    base: String,
}

impl OriginTarget {
    /// `origin` must be an absolute URL; a trailing slash is dropped.
    pub fn new(origin: &str) -> Result<Self, url::ParseError> {
        Url::parse(origin)?;
        Ok(Self {
            base: origin.trim_end_matches('/').to_string(),
        })
    }

    /// The origin as configured, without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Origin URL for a normalized path and the forwarded query parameters.
    ///
    /// Control parameters are stripped; the rest keep their inbound order.
    pub fn url_for(&self, path: &str, query: &QueryParams) -> Result<Url, url::ParseError> {
        let mut target = self.base.clone();
        if !path.is_empty() {
            target.push('/');
            target.push_str(path);
        }

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut forwarded = 0;
        for (k, v) in query.iter().filter(|(k, _)| !is_control_param(k)) {
            serializer.append_pair(k, v);
            forwarded += 1;
        }
        if forwarded > 0 {
            target.push('?');
            target.push_str(&serializer.finish());
        }

        Url::parse(&target)
    }
}

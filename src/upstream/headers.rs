//! Outbound header policies.
//!
//! Every policy asks for `Accept-Encoding: identity` so bodies arrive
//! uncompressed and can be rewritten as text.

use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL,
    CONTENT_TYPE, ORIGIN, PRAGMA, REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; RewriteProxy/1.0)";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const DOCUMENT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Which identity to present to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Mirror the client's negotiation headers, defaulting the missing ones.
    Transparent,
    /// Fixed browser identity that defeats intermediate caches.
    ForcedRefresh,
    /// Fixed browser identity plus the form's content type.
    FormSubmission,
    /// Nothing beyond the encoding request.
    Plain,
}

impl HeaderPolicy {
    /// Build the outbound header set from the inbound headers.
    pub fn build(self, inbound: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::new();
        match self {
            Self::Transparent => {
                mirror(&mut out, inbound, USER_AGENT, Some(DEFAULT_USER_AGENT));
                mirror(&mut out, inbound, ACCEPT, Some("*/*"));
                mirror(&mut out, inbound, ACCEPT_LANGUAGE, Some("en-US,en;q=0.9"));
                mirror(&mut out, inbound, CACHE_CONTROL, Some("no-cache"));
                mirror(&mut out, inbound, PRAGMA, Some("no-cache"));
                mirror(&mut out, inbound, REFERER, None);
                mirror(&mut out, inbound, ORIGIN, None);
            }
            Self::ForcedRefresh => {
                out.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
                out.insert(
                    ACCEPT,
                    HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
                    ),
                );
                out.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
                out.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                out.insert(PRAGMA, HeaderValue::from_static("no-cache"));
                out.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
                out.insert(
                    HeaderName::from_static("sec-fetch-dest"),
                    HeaderValue::from_static("document"),
                );
                out.insert(
                    HeaderName::from_static("sec-fetch-mode"),
                    HeaderValue::from_static("navigate"),
                );
                out.insert(
                    HeaderName::from_static("sec-fetch-site"),
                    HeaderValue::from_static("none"),
                );
            }
            Self::FormSubmission => {
                out.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
                out.insert(ACCEPT, HeaderValue::from_static(DOCUMENT_ACCEPT));
                mirror(&mut out, inbound, CONTENT_TYPE, Some(DEFAULT_FORM_CONTENT_TYPE));
            }
            Self::Plain => {}
        }
        out.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        out
    }
}

fn mirror(out: &mut HeaderMap, inbound: &HeaderMap, name: HeaderName, default: Option<&'static str>) {
    match (inbound.get(&name), default) {
        (Some(value), _) => {
            out.insert(name, value.clone());
        }
        (None, Some(default)) => {
            out.insert(name, HeaderValue::from_static(default));
        }
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(pairs: &[(HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(k.clone(), HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_transparent_mirrors_and_defaults() {
        let out = HeaderPolicy::Transparent.build(&inbound(&[
            (USER_AGENT, "curl/8"),
            (REFERER, "https://ref.test/"),
            (ACCEPT_ENCODING, "gzip, br"),
        ]));

        assert_eq!(out[USER_AGENT], "curl/8");
        assert_eq!(out[REFERER], "https://ref.test/");
        assert_eq!(out[ACCEPT], "*/*");
        assert_eq!(out[ACCEPT_LANGUAGE], "en-US,en;q=0.9");
        assert_eq!(out[CACHE_CONTROL], "no-cache");
        assert_eq!(out[ACCEPT_ENCODING], "identity");
        assert!(out.get(ORIGIN).is_none());
    }

    #[test]
    fn test_forced_refresh_ignores_inbound() {
        let out = HeaderPolicy::ForcedRefresh.build(&inbound(&[(USER_AGENT, "curl/8")]));
        assert_eq!(out[USER_AGENT], BROWSER_USER_AGENT);
        assert_eq!(out[PRAGMA], "no-cache");
        assert_eq!(out["sec-fetch-mode"], "navigate");
        assert_eq!(out[ACCEPT_ENCODING], "identity");
    }

    #[test]
    fn test_form_submission_keeps_content_type() {
        let out = HeaderPolicy::FormSubmission
            .build(&inbound(&[(CONTENT_TYPE, "multipart/form-data; boundary=x")]));
        assert_eq!(out[CONTENT_TYPE], "multipart/form-data; boundary=x");

        let out = HeaderPolicy::FormSubmission.build(&HeaderMap::new());
        assert_eq!(out[CONTENT_TYPE], DEFAULT_FORM_CONTENT_TYPE);
    }

    #[test]
    fn test_plain_only_sets_encoding() {
        let out = HeaderPolicy::Plain.build(&inbound(&[(USER_AGENT, "curl/8")]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[ACCEPT_ENCODING], "identity");
    }
}

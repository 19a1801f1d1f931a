//! Content rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! origin body + content type
//!     → is_html() gate (anything else passes through untouched)
//!     → branding.rs (phrase removal, stylesheet injection)
//!     → rewritten body
//! ```
//!
//! # Design Decisions
//! - Pure and deterministic; no I/O, safe to run on cached bodies again
//! - Non-HTML bodies are never decoded as text, so binaries stay intact
//! - Idempotent: a second pass finds no phrases and the stylesheet present

pub mod branding;

use bytes::Bytes;
use std::borrow::Cow;

pub use branding::{BrandingRules, DEFAULT_PHRASES, HIDE_BADGE_CSS};

/// Content type assumed when the origin omits one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Whether a content type names an HTML document.
pub fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Rewrites HTML bodies according to a compiled rule set.
#[derive(Debug, Clone)]
pub struct ContentTransformer {
    rules: BrandingRules,
}

impl ContentTransformer {
    pub fn new(rules: BrandingRules) -> Self {
        Self { rules }
    }

    /// Transformer with only the built-in phrases.
    pub fn with_defaults() -> Self {
        // The default phrases are escaped literals; compiling them cannot fail.
        Self::new(BrandingRules::new::<&str>(&[]).expect("built-in branding rules compile"))
    }

    pub fn rules(&self) -> &BrandingRules {
        &self.rules
    }

    /// Rewrite a text body. Non-HTML content is returned unchanged.
    pub fn transform(&self, body: &str, content_type: &str) -> String {
        if !is_html(content_type) {
            return body.to_string();
        }
        self.rules.apply(body)
    }

    /// Rewrite a raw body without decoding it.
    ///
    /// Non-HTML content, and HTML the rules leave untouched, come back as the
    /// same buffer.
    pub fn transform_bytes(&self, body: Bytes, content_type: &str) -> Bytes {
        if !is_html(content_type) {
            return body;
        }
        match self.rules.apply_bytes(&body) {
            Cow::Borrowed(_) => body,
            Cow::Owned(out) => Bytes::from(out),
        }
    }
}

impl Default for ContentTransformer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("Text/HTML; charset=utf-8"));
        assert!(is_html("application/xhtml+xml"));
        assert!(!is_html("text/css"));
        assert!(!is_html("application/json"));
        assert!(!is_html("image/png"));
        assert!(!is_html(""));
    }

    #[test]
    fn test_non_html_bytes_untouched() {
        let transformer = ContentTransformer::default();
        let png = Bytes::from_static(&[0x89, b'P', b'N', b'G', 0xff, 0xfe, b'<', b'/']);
        assert_eq!(transformer.transform_bytes(png.clone(), "image/png"), png);

        let js = "console.log('Made in Framer')";
        assert_eq!(transformer.transform(js, "application/javascript"), js);
    }

    #[test]
    fn test_non_utf8_html_keeps_its_bytes() {
        let transformer = ContentTransformer::default();
        let page = Bytes::from_static(b"<html><body>caf\xe9</body></html>");
        let out = transformer.transform_bytes(page.clone(), "text/html; charset=windows-1252");
        assert_eq!(out, page);

        let branded = Bytes::from_static(
            b"<html><head></head><body>caf\xe9<a>Made in Framer</a></body></html>",
        );
        let out = transformer.transform_bytes(branded, "text/html; charset=windows-1252");
        let expected = [
            &b"<html><head>"[..],
            HIDE_BADGE_CSS.as_bytes(),
            &b"</head><body>caf\xe9</body></html>"[..],
        ]
        .concat();
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn test_html_document() {
        let transformer = ContentTransformer::default();
        let page = "<html><head><title>Home</title></head>\
                    <body><div>Hello</div><a>Made in Framer</a></body></html>";
        let out = transformer.transform(page, "text/html; charset=utf-8");

        assert!(!out.contains("Made in Framer"));
        assert!(out.contains(HIDE_BADGE_CSS));
        assert!(out.contains("<div>Hello</div>"));
    }
}

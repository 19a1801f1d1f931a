//! Branding removal for HTML documents.

use regex::bytes::Regex;
use std::borrow::Cow;

/// Built-in attribution phrases. Matched case-insensitively.
pub const DEFAULT_PHRASES: &[&str] = &[
    "Made in Framer",
    "Built with Framer",
    "the website builder loved by startups, designers and agencies",
];

/// Injected before `</head>`. Hides badge elements that text removal cannot
/// reach (SVG/image badges, shadow roots).
pub const HIDE_BADGE_CSS: &str = r#"<style data-rewrite-proxy="branding">
[class*="framer-"][data-framer-name="Light"][href*="framer.com"],
.framer-6jWyo[data-framer-name="Light"],
.framer-6jWyo[href="https://www.framer.com"],
[class*="__framer-badge__"],
.framer-13yxzio[data-framer-name="Backdrop"] {
  display: none !important;
  visibility: hidden !important;
  opacity: 0 !important;
  height: 0 !important;
  width: 0 !important;
  overflow: hidden !important;
}
[class*="framer-"][data-framer-name="Backdrop"][style*="background-color: rgb(255, 255, 255)"][style*="border-radius: 10px"] {
  display: none !important;
}
</style>"#;

const HEAD_CLOSE: &[u8] = b"</head>";

/// Compiled rule set for stripping attribution markup.
///
/// Rules run over raw bytes, so documents in any ASCII-compatible charset
/// come back unchanged apart from the removed phrases and injected CSS.
#[derive(Debug, Clone)]
pub struct BrandingRules {
    /// An element whose entire text content is a branding phrase.
    wrapped: Regex,
    /// A bare branding phrase anywhere in the document.
    bare: Regex,
    css: String,
}

impl BrandingRules {
    /// Build rules from the default phrases plus `extra`.
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Result<Self, regex::Error> {
        let phrases: Vec<String> = DEFAULT_PHRASES
            .iter()
            .map(|p| p.to_string())
            .chain(extra.iter().map(|p| p.as_ref().trim().to_string()))
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(&p))
            .collect();
        let alternation = phrases.join("|");

        Ok(Self {
            wrapped: Regex::new(&format!(
                r"(?i)<(?-u:[^<>])*>(?:{alternation})</(?-u:[^<>])*>"
            ))?,
            bare: Regex::new(&format!("(?i){alternation}"))?,
            css: HIDE_BADGE_CSS.to_string(),
        })
    }

    /// The style block injected into documents.
    pub fn css(&self) -> &str {
        &self.css
    }

    /// Strip phrases, then inject the hiding stylesheet.
    pub fn apply(&self, html: &str) -> String {
        match self.apply_bytes(html.as_bytes()) {
            Cow::Borrowed(_) => html.to_string(),
            // Matches start and end on ASCII bytes, so removal keeps UTF-8 intact.
            Cow::Owned(out) => String::from_utf8(out)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        }
    }

    /// Byte-level `apply`. Borrows the input when nothing changes.
    ///
    /// Removal repeats until nothing matches: deleting one occurrence can
    /// splice a new one together from its neighbours.
    pub fn apply_bytes<'a>(&self, html: &'a [u8]) -> Cow<'a, [u8]> {
        let mut out = Cow::Borrowed(html);
        loop {
            let next = {
                let unwrapped = self.wrapped.replace_all(&out, &b""[..]);
                self.bare.replace_all(&unwrapped, &b""[..]).into_owned()
            };
            if next.len() == out.len() {
                break;
            }
            out = Cow::Owned(next);
        }
        self.inject_css(out)
    }

    fn inject_css<'a>(&self, html: Cow<'a, [u8]>) -> Cow<'a, [u8]> {
        let css = self.css.as_bytes();
        if find(&html, css).is_some() {
            return html;
        }
        match find_ascii_case_insensitive(&html, HEAD_CLOSE) {
            Some(idx) => {
                let mut out = Vec::with_capacity(html.len() + css.len());
                out.extend_from_slice(&html[..idx]);
                out.extend_from_slice(css);
                out.extend_from_slice(&html[idx..]);
                Cow::Owned(out)
            }
            None => html,
        }
    }

    /// Whether `text` still contains any branding phrase.
    pub fn matches(&self, text: &str) -> bool {
        self.bare.is_match(text.as_bytes())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn find_ascii_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

//! Diagnostic HTML pages.

use axum::http::{Method, StatusCode};

/// Markers reported on the debug page.
pub const DEBUG_MARKERS: &[&str] = &["Framer", "Made in", "Built with"];

/// Escape text for inclusion in HTML element content.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Raw origin content with marker checks.
pub fn debug_page(target: &str, status: StatusCode, raw: &str) -> String {
    let markers: String = DEBUG_MARKERS
        .iter()
        .map(|m| format!("<h3>Contains \"{}\": {}</h3>\n", escape_html(m), raw.contains(m)))
        .collect();

    format!(
        "<html>\n<body>\n\
         <h1>DEBUG: Raw HTML from origin</h1>\n\
         <h3>Target: {}</h3>\n\
         <h3>Origin Status: {}</h3>\n\
         <h3>Original Content Length: {}</h3>\n\
         {markers}\
         <textarea style=\"width:100%;height:500px;\">{}</textarea>\n\
         </body>\n</html>\n",
        escape_html(target),
        status.as_u16(),
        raw.chars().count(),
        escape_html(raw),
    )
}

/// Liveness echo.
pub fn liveness_page(method: &Method, uri: &str) -> String {
    format!(
        "<html>\n<body>\n\
         <h1 style=\"color: red; font-size: 50px;\">PROXY HANDLER IS WORKING!</h1>\n\
         <p>Method: {}</p>\n\
         <p>URL: {}</p>\n\
         </body>\n</html>\n",
        escape_html(method.as_str()),
        escape_html(uri),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_debug_page_reports_markers() {
        let page = debug_page("https://o.test/", StatusCode::OK, "<p>Made in Framer</p></textarea>");
        assert!(page.contains("Contains \"Framer\": true"));
        assert!(page.contains("Contains \"Built with\": false"));
        assert!(page.contains("Original Content Length: 32"));
        // The body cannot close the textarea early.
        assert_eq!(page.matches("</textarea>").count(), 1);
    }

    #[test]
    fn test_liveness_page() {
        let page = liveness_page(&Method::GET, "/?test=true&x=<b>");
        assert!(page.contains("PROXY HANDLER IS WORKING!"));
        assert!(page.contains("<p>Method: GET</p>"));
        assert!(page.contains("/?test=true&amp;x=&lt;b&gt;"));
    }
}

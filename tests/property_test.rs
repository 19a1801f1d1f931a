//! Property tests for rewriting and cache key derivation.

use bytes::Bytes;
use proptest::prelude::*;

use rewrite_proxy::cache::KeyStrategy;
use rewrite_proxy::proxy::QueryParams;
use rewrite_proxy::rewrite::{ContentTransformer, DEFAULT_PHRASES, HIDE_BADGE_CSS};

/// A phrase with an arbitrary mix of upper and lower case.
fn cased_phrase() -> impl Strategy<Value = String> {
    (prop::sample::select(DEFAULT_PHRASES.to_vec()), any::<u64>()).prop_map(|(phrase, bits)| {
        phrase
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if bits >> (i % 64) & 1 == 1 {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    })
}

fn html_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        cased_phrase(),
        cased_phrase().prop_map(|p| format!("<a class=\"badge\">{p}</a>")),
        Just("<head>".to_string()),
        Just("</head>".to_string()),
        Just("</HEAD>".to_string()),
        Just("<p>".to_string()),
        Just("</p>".to_string()),
        "[a-zA-Z ,.]{0,12}",
    ]
}

fn html_document() -> impl Strategy<Value = String> {
    prop::collection::vec(html_fragment(), 0..16).prop_map(|parts| parts.concat())
}

fn unique_params() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9 &=?]{0,6}", 0..6)
        .prop_map(|m| m.into_iter().collect::<Vec<_>>())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Rewriting an already rewritten document changes nothing.
    #[test]
    fn prop_rewrite_is_idempotent(html in html_document()) {
        let transformer = ContentTransformer::with_defaults();
        let once = transformer.transform(&html, "text/html");
        let twice = transformer.transform(&once, "text/html");
        prop_assert_eq!(once, twice);
    }

    /// No branding phrase survives, in any casing.
    #[test]
    fn prop_no_phrase_survives(html in html_document()) {
        let transformer = ContentTransformer::with_defaults();
        let out = transformer.transform(&html, "text/html; charset=utf-8");
        prop_assert!(!transformer.rules().matches(&out), "branding left in {}", out);
    }

    /// The stylesheet appears at most once, and is missing only when the
    /// document has no closing head tag left.
    #[test]
    fn prop_css_injected_once(html in html_document()) {
        let out = ContentTransformer::with_defaults().transform(&html, "text/html");
        match out.matches(HIDE_BADGE_CSS).count() {
            0 => prop_assert!(!out.to_ascii_lowercase().contains("</head>")),
            1 => {}
            n => prop_assert!(false, "stylesheet injected {} times", n),
        }
    }

    /// Non-HTML bodies come back byte-for-byte.
    #[test]
    fn prop_non_html_untouched(
        body in prop::collection::vec(any::<u8>(), 0..512),
        content_type in prop::sample::select(vec![
            "image/png", "application/javascript", "text/css", "application/octet-stream",
        ]),
    ) {
        let input = Bytes::from(body);
        let out = ContentTransformer::with_defaults().transform_bytes(input.clone(), content_type);
        prop_assert_eq!(out, input);
    }

    /// Parameter order never changes the key.
    #[test]
    fn prop_key_ignores_param_order(
        params in unique_params().prop_shuffle(),
        path in "[a-z0-9/-]{0,20}",
    ) {
        let keys = KeyStrategy::single_tenant("proxy-cache");
        let mut sorted = params.clone();
        sorted.sort();

        let a: QueryParams = params.into_iter().collect();
        let b: QueryParams = sorted.into_iter().collect();
        prop_assert_eq!(keys.derive(&path, &a, None), keys.derive(&path, &b, None));
    }

    /// `clear_cache` never contributes to the key.
    #[test]
    fn prop_clear_cache_not_in_key(
        params in unique_params(),
        flag in prop::sample::select(vec!["true", "false", ""]),
    ) {
        let keys = KeyStrategy::multi_tenant("proxy-cache", "https://site.test");
        let base: QueryParams = params.iter().cloned().collect();
        let mut with_flag = base.clone();
        with_flag.insert("clear_cache", flag);

        prop_assert_eq!(
            keys.derive("page", &base, Some("a.test")),
            keys.derive("page", &with_flag, Some("a.test"))
        );
    }

    /// Different queries on one path never share a key.
    #[test]
    fn prop_distinct_queries_distinct_keys(a in unique_params(), b in unique_params()) {
        prop_assume!(a != b);
        let keys = KeyStrategy::single_tenant("proxy-cache");
        let qa: QueryParams = a.into_iter().collect();
        let qb: QueryParams = b.into_iter().collect();
        prop_assert_ne!(keys.derive("p", &qa, None), keys.derive("p", &qb, None));
    }
}

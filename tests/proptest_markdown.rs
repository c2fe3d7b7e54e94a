//! Property-based tests for conversion and metadata invariants.

mod common;

use common::StaticRenderer;
use mcp_fetch::extraction::{MarkdownConverter, MetaDeclaration, MetadataExtractor};
use mcp_fetch::fetch::FetchOptions;
use proptest::prelude::*;

fn arb_word() -> impl Strategy<Value = String> {
    "[a-z]{1,10}"
}

fn arb_paragraphs() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::collection::vec(arb_word(), 1..8), 1..6)
        .prop_map(|paras| paras.into_iter().map(|words| words.join(" ")).collect())
}

fn arb_inline_element() -> impl Strategy<Value = String> {
    (
        prop_oneof![
            Just("em"),
            Just("strong"),
            Just("code"),
            Just("span"),
            Just("b"),
            Just("i")
        ],
        arb_word(),
    )
        .prop_map(|(tag, word)| format!("<{tag}>{word}</{tag}>"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn conversion_never_fails_on_arbitrary_text(input in "\\PC{0,200}") {
        prop_assert!(MarkdownConverter::default().convert(&input).is_ok());
    }

    #[test]
    fn output_is_trimmed(input in "[ \\n\\t]{0,5}<p>[a-z ]{0,20}</p>[ \\n\\t]{0,5}") {
        let md = MarkdownConverter::default().convert(&input).unwrap();
        prop_assert_eq!(md.trim(), md.as_str());
    }

    #[test]
    fn paragraphs_separated_by_single_blank_line(paras in arb_paragraphs()) {
        let html: String = paras.iter().map(|p| format!("<p>{}</p>\n\n\n", p)).collect();
        let md = MarkdownConverter::default().convert(&html).unwrap();
        prop_assert!(!md.contains("\n\n\n"));
        prop_assert_eq!(md, paras.join("\n\n"));
    }

    #[test]
    fn removed_elements_never_leak(
        before in arb_word(),
        after in arb_word(),
        tag in prop_oneof![Just("script"), Just("style"), Just("noscript"), Just("iframe")],
    ) {
        let html = format!("<p>{before}</p><{tag}>LEAKED</{tag}><p>{after}</p>");
        let md = MarkdownConverter::new(true).convert(&html).unwrap();
        prop_assert!(!md.contains("LEAKED"));
        prop_assert_eq!(md, format!("{before}\n\n{after}"));
    }

    #[test]
    fn images_only_with_flag(alt in arb_word(), src in "[a-z]{1,8}\\.png") {
        let html = format!(r#"<p><img src="{src}" alt="{alt}"></p>"#);
        let without = MarkdownConverter::new(false).convert(&html).unwrap();
        let with = MarkdownConverter::new(true).convert(&html).unwrap();
        prop_assert_eq!(without, "");
        prop_assert_eq!(with, format!("![{alt}]({src})"));
    }

    #[test]
    fn inline_elements_keep_their_words(elements in prop::collection::vec(arb_inline_element(), 1..6)) {
        let html = format!("<p>{}</p>", elements.join(" "));
        let md = MarkdownConverter::default().convert(&html).unwrap();
        prop_assert_eq!(md.lines().count(), 1);
    }

    #[test]
    fn raw_map_keeps_last_value(key in "[a-z:]{1,12}", values in prop::collection::vec("[a-z]{1,8}", 1..5)) {
        let decls: Vec<MetaDeclaration> = values.iter().map(|v| MetaDeclaration::named(&key, v)).collect();
        let raw = MetadataExtractor::raw_map(&decls);
        prop_assert_eq!(raw.len(), 1);
        prop_assert_eq!(raw.get(&key), values.last());
    }

    #[test]
    fn fetch_echoes_requested_url(path in "[a-zA-Z0-9_-]{1,20}", query in "[a-z]{0,6}") {
        let url = if query.is_empty() {
            format!("https://example.com/{path}")
        } else {
            format!("https://example.com/{path}?q={query}")
        };
        let fetcher = StaticRenderer::new()
            .page(&url, "t", "<html><body><main><p>x</p></main></body></html>")
            .into_fetcher();

        let result = tokio_test::block_on(fetcher.fetch_url(&url, &FetchOptions::default())).unwrap();
        prop_assert_eq!(result.url, url);
        prop_assert_eq!(result.markdown, "x");
    }
}

//! Fetch pipeline tests
//!
//! These run the full pipeline against in-memory renderers, so no browser
//! is needed.

mod common;

use common::{CountingRenderer, StaticRenderer, ARTICLE};
use mcp_fetch::error::{Error, ErrorKind, NavigationError};
use mcp_fetch::extraction::{ContentLocator, MetadataExtractor};
use mcp_fetch::fetch::{FetchOptions, Fetcher};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const URL: &str = "https://example.com/compilers";

fn article_fetcher() -> Fetcher {
    StaticRenderer::new()
        .page(URL, "Compilers | Example", ARTICLE)
        .into_fetcher()
}

#[tokio::test]
async fn test_fetch_article() {
    let result = article_fetcher()
        .fetch_url(URL, &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(result.url, URL);
    assert_eq!(result.title, "Compilers | Example");
    assert_eq!(
        result.markdown,
        "# Compilers\n\nA **compiler** translates *source* code.\n\n- Lexing\n- Parsing"
    );
    assert_eq!(result.metadata["description"], "Social description");
    assert_eq!(result.metadata["author"], "Grace Hopper");
    assert_eq!(result.metadata["ogTitle"], "Compilers");
    assert_eq!(result.metadata.len(), 3);
}

#[tokio::test]
async fn test_fetch_article_with_images() {
    let options = FetchOptions::builder().include_images(true).build();
    let result = article_fetcher().fetch_url(URL, &options).await.unwrap();

    assert_eq!(
        result.markdown,
        "# Compilers\n\nA **compiler** translates *source* code.\n\n\
         ![Pipeline](/diagram.png)\n\n- Lexing\n- Parsing"
    );
}

#[tokio::test]
async fn test_markdown_document_layout() {
    let result = article_fetcher()
        .fetch_url(URL, &FetchOptions::default())
        .await
        .unwrap();
    let doc = result.to_markdown_document();
    assert!(doc.starts_with("# Compilers | Example\n\n# Compilers\n\n"));
}

#[tokio::test]
async fn test_body_fallback_drops_nothing_but_removed_elements() {
    let fetcher = StaticRenderer::new()
        .page(
            URL,
            "",
            "<html><body><p>Just text</p><style>p{}</style></body></html>",
        )
        .into_fetcher();
    let result = fetcher.fetch_url(URL, &FetchOptions::default()).await.unwrap();
    assert_eq!(result.title, "");
    assert_eq!(result.markdown, "Just text");
    assert!(result.metadata.is_empty());
}

#[tokio::test]
async fn test_custom_locator_and_metadata_field() {
    let renderer = StaticRenderer::new().page(URL, "T", ARTICLE);
    let fetcher = Fetcher::builder()
        .renderer(Arc::new(renderer))
        .locator(ContentLocator::with_selectors(["footer"]).unwrap())
        .metadata_extractor(MetadataExtractor::new().with_field("viewport", &["viewport"]))
        .build();

    let result = fetcher.fetch_url(URL, &FetchOptions::default()).await.unwrap();
    assert_eq!(result.markdown, "Copyright");
    assert_eq!(result.metadata["viewport"], "width=device-width");
}

#[tokio::test]
async fn test_invalid_url_rejected_before_rendering() {
    let renderer = CountingRenderer::new(Duration::ZERO);
    let fetcher = Fetcher::new(renderer.clone());

    for url in ["", "not a url", "ftp://example.com/file", "https://"] {
        let err = fetcher
            .fetch_url(url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{url}");
    }
    assert_eq!(renderer.total(), 0);
}

#[tokio::test]
async fn test_zero_timeout_rejected() {
    let options = FetchOptions::builder().timeout(0).build();
    let err = article_fetcher().fetch_url(URL, &options).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_missing_selector_is_selector_wait_failure() {
    let options = FetchOptions::builder()
        .wait_for_selector("#never")
        .timeout(1000)
        .build();
    let err = article_fetcher().fetch_url(URL, &options).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SelectorWait);
    assert!(matches!(
        err,
        Error::Navigation(NavigationError::SelectorTimeout { timeout_ms: 1000, .. })
    ));
}

#[tokio::test]
async fn test_present_selector_succeeds() {
    let options = FetchOptions::builder().wait_for_selector("article h1").build();
    assert!(article_fetcher().fetch_url(URL, &options).await.is_ok());
}

#[tokio::test]
async fn test_unreachable_is_navigation_failure() {
    let err = article_fetcher()
        .fetch_url("https://unreachable.invalid/", &FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Navigation);
}

#[tokio::test]
async fn test_fetch_is_repeatable() {
    let fetcher = article_fetcher();
    let first = fetcher.fetch_url(URL, &FetchOptions::default()).await.unwrap();
    let second = fetcher.fetch_url(URL, &FetchOptions::default()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_batch_keeps_going_after_failure() {
    let fetcher = article_fetcher();
    let urls = [URL, "not a url", "https://unreachable.invalid/"];
    let report = fetcher.fetch_many(&urls, &FetchOptions::default()).await;

    assert_eq!(report.len(), 3);
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.failure_count(), 2);
    assert_eq!(
        report.get("not a url").unwrap().as_ref().unwrap_err().kind,
        ErrorKind::InvalidInput
    );
    assert_eq!(
        report
            .get("https://unreachable.invalid/")
            .unwrap()
            .as_ref()
            .unwrap_err()
            .kind,
        ErrorKind::Navigation
    );

    let order: Vec<&str> = report.iter().map(|(url, _)| url).collect();
    assert_eq!(order, urls.to_vec());
}

#[tokio::test]
async fn test_fetch_multiple_urls_drops_failures() {
    let fetcher = article_fetcher();
    let results = fetcher
        .fetch_multiple_urls(&[URL, "not a url"], &FetchOptions::default())
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[URL].title, "Compilers | Example");
    assert!(!results.contains_key("not a url"));
}

#[tokio::test]
async fn test_batch_dedups_urls() {
    let renderer = CountingRenderer::new(Duration::ZERO);
    let fetcher = Fetcher::new(renderer.clone());
    let report = fetcher
        .fetch_many(&["https://a.test/", "https://a.test/"], &FetchOptions::default())
        .await;

    assert_eq!(report.len(), 1);
    assert_eq!(renderer.total(), 1);
}

#[tokio::test]
async fn test_empty_batch() {
    let urls: [&str; 0] = [];
    let report = article_fetcher()
        .fetch_many(&urls, &FetchOptions::default())
        .await;
    assert!(report.is_empty());
    assert!(!report.all_failed());
}

#[tokio::test]
async fn test_batch_respects_concurrency_bound() {
    let renderer = CountingRenderer::new(Duration::from_millis(20));
    let fetcher = Fetcher::builder()
        .renderer(renderer.clone())
        .max_concurrency(3)
        .build();

    let urls: Vec<String> = (0..12).map(|i| format!("https://site{}.test/", i)).collect();
    let report = fetcher.fetch_many(&urls, &FetchOptions::default()).await;

    assert_eq!(report.success_count(), 12);
    assert_eq!(renderer.total(), 12);
    assert!(renderer.peak() <= 3, "peak was {}", renderer.peak());
    assert!(renderer.peak() >= 2, "renders never overlapped");
}

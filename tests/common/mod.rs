//! Shared test doubles for the fetch pipeline

#![allow(dead_code)]

use async_trait::async_trait;
use mcp_fetch::browser::{PageRenderer, RenderedPage};
use mcp_fetch::error::{NavigationError, Result};
use mcp_fetch::fetch::{FetchOptions, Fetcher};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serves canned pages from memory
#[derive(Debug, Default, Clone)]
pub struct StaticRenderer {
    pages: HashMap<String, RenderedPage>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, title: &str, html: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            RenderedPage {
                title: title.to_string(),
                html: html.to_string(),
            },
        );
        self
    }

    pub fn into_fetcher(self) -> Fetcher {
        Fetcher::new(Arc::new(self))
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage> {
        let page = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| NavigationError::LoadFailed(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))?;

        if let Some(selector) = options.wait_for_selector.as_deref() {
            let parsed = Selector::parse(selector)
                .map_err(|_| NavigationError::InvalidSelector(selector.to_string()))?;
            let present = Html::parse_document(&page.html).select(&parsed).next().is_some();
            if !present {
                return Err(NavigationError::SelectorTimeout {
                    selector: selector.to_string(),
                    timeout_ms: options.timeout,
                }
                .into());
            }
        }

        Ok(page)
    }
}

/// Records how many renders overlap
#[derive(Debug, Default)]
pub struct CountingRenderer {
    active: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
    delay: Duration,
}

impl CountingRenderer {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for CountingRenderer {
    async fn render(&self, url: &str, _options: &FetchOptions) -> Result<RenderedPage> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(RenderedPage {
            title: url.to_string(),
            html: format!("<html><body><main><p>{}</p></main></body></html>", url),
        })
    }
}

/// A small article page with metadata, navigation chrome and an image
pub const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Ignored in favour of the renderer title</title>
  <meta name="description" content="Plain description">
  <meta property="og:description" content="Social description">
  <meta name="author" content="Grace Hopper">
  <meta property="og:title" content="Compilers">
  <meta name="viewport" content="width=device-width">
</head>
<body>
  <nav><a href="/">Home</a></nav>
  <article>
    <h1>Compilers</h1>
    <p>A <strong>compiler</strong> translates <em>source</em> code.</p>
    <img src="/diagram.png" alt="Pipeline">
    <ul><li>Lexing</li><li>Parsing</li></ul>
    <script>track()</script>
  </article>
  <footer>Copyright</footer>
</body>
</html>"#;

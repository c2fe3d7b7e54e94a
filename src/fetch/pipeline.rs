//! Single-URL fetch pipeline

use crate::browser::{BrowserConfig, ChromeRenderer, PageRenderer, RenderedPage, UrlValidator};
use crate::error::Result;
use crate::extraction::{ContentLocator, HtmlSnapshot, MarkdownConverter, MetadataExtractor};
use crate::fetch::options::{FetchOptions, FetchResult};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Browser instances a batch may run at once unless configured otherwise
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Renders pages and turns them into [`FetchResult`]s
#[derive(Clone)]
pub struct Fetcher {
    pub(crate) renderer: Arc<dyn PageRenderer>,
    pub(crate) locator: ContentLocator,
    pub(crate) extractor: MetadataExtractor,
    pub(crate) max_concurrency: usize,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("locator", &self.locator)
            .field("extractor", &self.extractor)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Fetcher {
    /// Fetcher with default extraction settings over `renderer`
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self::builder().renderer(renderer).build()
    }

    /// Create a new fetcher builder
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// Upper bound on concurrent renders in a batch
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Fetch one URL and convert its main content to Markdown.
    ///
    /// The URL and options are checked before any browser work starts. Any
    /// failure after that is fatal to this fetch; there are no retries.
    #[instrument(skip(self, options))]
    pub async fn fetch_url(&self, url: &str, options: &FetchOptions) -> Result<FetchResult> {
        UrlValidator::check(url)?;
        options.validate()?;

        info!("Fetching {}", url);
        let page = self.renderer.render(url, options).await?;
        self.assemble(url, page, options)
    }

    /// Locate, extract and convert a rendered page
    fn assemble(&self, url: &str, page: RenderedPage, options: &FetchOptions) -> Result<FetchResult> {
        let document = HtmlSnapshot::parse(&page.html);
        let metadata = self.extractor.extract(&document);
        let content = self.locator.locate(&document)?;
        debug!("Main content from {:?}", content.source);

        let markdown = MarkdownConverter::new(options.include_images).convert(&content.html)?;

        Ok(FetchResult {
            url: url.to_string(),
            title: page.title,
            markdown,
            metadata,
        })
    }
}

/// Builder for Fetcher
#[derive(Default)]
pub struct FetcherBuilder {
    renderer: Option<Arc<dyn PageRenderer>>,
    locator: Option<ContentLocator>,
    extractor: Option<MetadataExtractor>,
    max_concurrency: Option<usize>,
}

impl FetcherBuilder {
    /// Render through a custom backend
    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Render with Chromium using this configuration
    pub fn browser_config(mut self, config: BrowserConfig) -> Self {
        self.renderer = Some(Arc::new(ChromeRenderer::new(config)));
        self
    }

    /// Replace the main-content heuristic
    pub fn locator(mut self, locator: ContentLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Replace the metadata allow-list
    pub fn metadata_extractor(mut self, extractor: MetadataExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Limit concurrent renders in a batch (minimum 1)
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max.max(1));
        self
    }

    /// Build the fetcher
    pub fn build(self) -> Fetcher {
        Fetcher {
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(ChromeRenderer::default())),
            locator: self.locator.unwrap_or_default(),
            extractor: self.extractor.unwrap_or_default(),
            max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
        }
    }
}

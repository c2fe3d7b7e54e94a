//! Page rendering
//!
//! [`PageRenderer`] is the seam between the fetch pipeline and a rendering
//! backend. [`ChromeRenderer`] drives a fresh Chromium process per call and
//! always tears it down before returning.

use crate::browser::controller::{BrowserConfig, BrowserSession};
use crate::browser::navigation::{NavigationOptions, PageNavigator, UrlValidator};
use crate::error::Result;
use crate::fetch::FetchOptions;
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// A page after rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// Document title, empty when the page has none
    pub title: String,
    /// Serialized DOM after scripts ran
    pub html: String,
}

/// Something that can turn a URL into a rendered page
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `url` according to `options`
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage>;
}

/// Renders pages in headless Chromium, one browser process per call
#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    config: BrowserConfig,
}

impl ChromeRenderer {
    /// Create a renderer with the given browser configuration
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Browser configuration used for every render
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    async fn render_in(
        session: &BrowserSession,
        url: &str,
        options: &FetchOptions,
    ) -> Result<RenderedPage> {
        let page = session.new_page(&options.user_agent).await?;

        let nav = PageNavigator::goto(&page, url, &NavigationOptions::with_timeout(options.timeout))
            .await?;
        debug!("Settled on {} after {}ms", nav.final_url, nav.duration_ms);

        if let Some(selector) = options.wait_for_selector.as_deref() {
            PageNavigator::wait_for_selector(&page, selector, options.timeout).await?;
        }

        let title = page.get_title().await?.unwrap_or_default();
        let html = page.content().await?;

        Ok(RenderedPage { title, html })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    #[instrument(skip(self, options))]
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage> {
        UrlValidator::check(url)?;

        let session = BrowserSession::launch(&self.config).await?;
        let outcome = Self::render_in(&session, url, options).await;

        if let Err(e) = session.close(self.config.close_timeout_ms).await {
            warn!("Failed to close browser cleanly: {}", e);
        }

        outcome
    }
}

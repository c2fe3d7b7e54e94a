//! Fetch options and results

use crate::error::{Error, Result};
use crate::extraction::Metadata;
use serde::{Deserialize, Serialize};

/// Default navigation and selector-wait timeout, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// Desktop Chrome identifier sent when no user agent is given
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Per-fetch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchOptions {
    /// Timeout for navigation and for the selector wait, in milliseconds
    pub timeout: u64,
    /// CSS selector that must appear before extraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    /// Keep images as Markdown image references
    pub include_images: bool,
    /// User agent sent with every request of the page
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_MS,
            wait_for_selector: None,
            include_images: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchOptions {
    /// Create a new options builder
    pub fn builder() -> FetchOptionsBuilder {
        FetchOptionsBuilder::default()
    }

    /// Reject options no fetch could honour
    pub fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            return Err(Error::invalid_input("timeout must be a positive number of milliseconds"));
        }
        if let Some(selector) = &self.wait_for_selector {
            if selector.trim().is_empty() {
                return Err(Error::invalid_input("waitForSelector must not be empty"));
            }
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::invalid_input("userAgent must not be empty"));
        }
        Ok(())
    }
}

/// Builder for FetchOptions
#[derive(Default)]
pub struct FetchOptionsBuilder {
    options: FetchOptions,
}

impl FetchOptionsBuilder {
    /// Set the timeout in milliseconds
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.options.timeout = timeout_ms;
        self
    }

    /// Wait for a selector before extracting
    pub fn wait_for_selector<S: Into<String>>(mut self, selector: S) -> Self {
        self.options.wait_for_selector = Some(selector.into());
        self
    }

    /// Keep or drop images
    pub fn include_images(mut self, include: bool) -> Self {
        self.options.include_images = include;
        self
    }

    /// Override the user agent
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    /// Build the options
    pub fn build(self) -> FetchOptions {
        self.options
    }
}

/// The outcome of one successful fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// The requested URL, exactly as given
    pub url: String,
    /// Document title, possibly empty
    pub title: String,
    /// Main content as Markdown
    pub markdown: String,
    /// Allow-listed page metadata
    pub metadata: Metadata,
}

impl FetchResult {
    /// Title heading followed by the converted content
    pub fn to_markdown_document(&self) -> String {
        format!("# {}\n\n{}", self.title, self.markdown)
    }
}

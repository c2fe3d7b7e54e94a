//! Browser lifecycle management
//!
//! This module handles browser launch and shutdown. A [`BrowserSession`] owns
//! exactly one Chromium process and is scoped to a single fetch: it is never
//! pooled, reused, or shared between concurrent fetches.

use crate::error::{BrowserError, Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Viewport width applied to every page
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Viewport height applied to every page
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Viewport width (default: 1280)
    pub width: u32,
    /// Viewport height (default: 800)
    pub height: u32,
    /// Enable the Chromium sandbox (default: false).
    ///
    /// The sandbox is off by default so the browser starts inside containers
    /// that lack the namespaces it needs. This is an environment concession,
    /// not a security boundary: pages are rendered with full renderer
    /// privileges either way.
    pub sandbox: bool,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// How long to wait for the process to exit on close, in milliseconds
    pub close_timeout_ms: u64,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
            sandbox: false,
            chrome_path: None,
            close_timeout_ms: 5000,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Chrome arguments derived from this config
    pub(crate) fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.sandbox {
            args.push("--no-sandbox".to_string());
            args.push("--disable-setuid-sandbox".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set how long `close` waits for the process to exit
    pub fn close_timeout_ms(mut self, ms: u64) -> Self {
        self.config.close_timeout_ms = ms;
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// One isolated browser process plus its CDP event handler task.
///
/// Call [`BrowserSession::close`] on every exit path. If a session is dropped
/// without closing (for example when the owning future is cancelled),
/// chromiumoxide kills the child process on drop.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    pid: Option<u32>,
}

impl BrowserSession {
    /// Launch a fresh browser process
    #[instrument(skip(config))]
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser: headless={}, sandbox={}",
            config.headless, config.sandbox
        );

        let mut builder = CdpBrowserConfig::builder().viewport(
            chromiumoxide::handler::viewport::Viewport {
                width: config.width,
                height: config.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            },
        );

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(BrowserError::ConfigError)?;

        let (mut browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        let pid = browser
            .get_mut_child()
            .and_then(|child| child.as_mut_inner().id());
        debug!("Browser launched: pid={:?}", pid);

        Ok(Self {
            browser,
            handler: handler_task,
            pid,
        })
    }

    /// OS process id of the launched browser
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Open a blank page with the given user agent.
    ///
    /// The user agent is applied before the page navigates anywhere, so the
    /// very first document request already carries it.
    #[instrument(skip(self))]
    pub async fn new_page(&self, user_agent: &str) -> Result<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        page.execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        Ok(page)
    }

    /// Close the browser and reap its process
    #[instrument(skip(self))]
    pub async fn close(mut self, timeout_ms: u64) -> Result<()> {
        debug!("Closing browser");
        let timeout = Duration::from_millis(timeout_ms);

        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| Error::cdp(e.to_string()));

        match tokio::time::timeout(timeout, self.browser.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Failed to reap browser process: {}", e),
            Err(_) => {
                warn!("Browser did not exit within {}ms, killing it", timeout_ms);
                if let Some(Err(e)) = self.browser.kill().await {
                    warn!("Failed to kill browser process: {}", e);
                }
            }
        }

        if tokio::time::timeout(timeout, &mut self.handler).await.is_err() {
            self.handler.abort();
            closed?;
            return Err(BrowserError::Timeout(timeout_ms).into());
        }

        closed?;
        debug!("Browser closed");
        Ok(())
    }
}

//! Page navigation functionality
//!
//! This module handles URL validation, navigation bounded by a timeout, the
//! network-settled wait condition, and waiting for a selector to appear.

use crate::error::{Error, NavigationError, Result};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::Page;
use futures::{future, stream, Stream, StreamExt};
use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace};

/// Maximum accepted URL length
pub const MAX_URL_LENGTH: usize = 2048;

/// How long the network must stay quiet before it counts as settled
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 500;

/// Interval between `waitForSelector` probes
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for page navigation
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Wait until condition (default: networkidle2)
    pub wait_until: WaitUntil,
    /// Quiet period for the network idle conditions (default: 500)
    pub quiet_period_ms: u64,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            wait_until: WaitUntil::NetworkIdle2,
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
        }
    }
}

impl NavigationOptions {
    /// Options with the given timeout and the default wait condition
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            ..Self::default()
        }
    }
}

/// Condition to wait for after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait until load event fires
    Load,
    /// Wait until DOMContentLoaded event fires
    DomContentLoaded,
    /// Wait until network is idle (0 connections for 500ms)
    NetworkIdle0,
    /// Wait until network is idle (max 2 connections for 500ms)
    NetworkIdle2,
}

impl WaitUntil {
    /// Outstanding requests tolerated by the network idle conditions
    pub fn max_inflight(self) -> Option<usize> {
        match self {
            WaitUntil::NetworkIdle0 => Some(0),
            WaitUntil::NetworkIdle2 => Some(2),
            WaitUntil::Load | WaitUntil::DomContentLoaded => None,
        }
    }
}

/// Result of a navigation operation
#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// Final URL after any redirects
    pub final_url: String,
    /// Navigation duration in milliseconds
    pub duration_ms: u64,
}

/// URL validation utilities
pub struct UrlValidator;

impl UrlValidator {
    /// Validate a URL for navigation.
    ///
    /// Accepts absolute `http`, `https` and `file` URLs up to
    /// [`MAX_URL_LENGTH`] characters.
    pub fn validate(url: &str) -> std::result::Result<(), String> {
        if url.is_empty() {
            return Err("URL cannot be empty".to_string());
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            ));
        }

        let parsed = url::Url::parse(url).map_err(|e| format!("{}: {}", e, url))?;

        match parsed.scheme() {
            "http" | "https" | "file" => {}
            other => {
                return Err(format!(
                    "Unsupported URL scheme '{}', expected http, https or file: {}",
                    other, url
                ))
            }
        }

        if parsed.scheme() != "file" && parsed.host_str().map_or(true, str::is_empty) {
            return Err(format!("URL has no host: {}", url));
        }

        Ok(())
    }

    /// Validate, converting failures into a navigation error
    pub fn check(url: &str) -> Result<()> {
        Self::validate(url).map_err(|e| NavigationError::InvalidUrl(e).into())
    }
}

/// Tracks outstanding network requests and when the quiet period ends.
///
/// The deadline is armed whenever the in-flight count drops to the tolerated
/// maximum and disarmed whenever it rises above it. Start and finish events
/// may be observed in either order: a finish seen before its start is
/// remembered, and the late start is then discarded.
#[derive(Debug)]
pub(crate) struct IdleTracker<K> {
    inflight: HashSet<K>,
    finished_early: HashSet<K>,
    max_inflight: usize,
    quiet: Duration,
    deadline: Option<Instant>,
}

impl<K: Eq + Hash + Clone> IdleTracker<K> {
    pub(crate) fn new(max_inflight: usize, quiet: Duration, now: Instant) -> Self {
        Self {
            inflight: HashSet::new(),
            finished_early: HashSet::new(),
            max_inflight,
            quiet,
            deadline: Some(now + quiet),
        }
    }

    pub(crate) fn request_started(&mut self, id: K, now: Instant) {
        if self.finished_early.remove(&id) {
            return;
        }
        self.inflight.insert(id);
        self.refresh(now);
    }

    pub(crate) fn request_finished(&mut self, id: &K, now: Instant) {
        if self.inflight.remove(id) {
            self.refresh(now);
        } else {
            self.finished_early.insert(id.clone());
        }
    }

    pub(crate) fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn is_settled(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    fn refresh(&mut self, now: Instant) {
        if self.inflight.len() <= self.max_inflight {
            if self.deadline.is_none() {
                self.deadline = Some(now + self.quiet);
            }
        } else {
            self.deadline = None;
        }
    }
}

/// Consume request start/finish ids until at most `max_inflight` requests
/// have been outstanding for `quiet`.
///
/// Returns `false` if both streams end while the network is still busy.
pub(crate) async fn wait_for_network_settled<K, S, F>(
    started: S,
    finished: F,
    max_inflight: usize,
    quiet: Duration,
) -> bool
where
    K: Eq + Hash + Clone,
    S: Stream<Item = K>,
    F: Stream<Item = K>,
{
    tokio::pin!(started);
    tokio::pin!(finished);
    let mut tracker = IdleTracker::new(max_inflight, quiet, Instant::now());

    loop {
        let deadline = tracker.deadline();
        let wake = deadline.unwrap_or_else(|| Instant::now() + quiet);
        tokio::select! {
            Some(id) = started.next() => tracker.request_started(id, Instant::now()),
            Some(id) = finished.next() => tracker.request_finished(&id, Instant::now()),
            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {}
            else => return false,
        }
        trace!("In-flight requests: {}", tracker.inflight());
        if tracker.is_settled(Instant::now()) {
            return true;
        }
    }
}

/// Outcome of a single `querySelector` probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectorProbe {
    Found,
    Missing,
    Invalid,
}

impl SelectorProbe {
    fn from_code(code: i64) -> Self {
        match code {
            1 => SelectorProbe::Found,
            0 => SelectorProbe::Missing,
            _ => SelectorProbe::Invalid,
        }
    }
}

/// Build the in-page probe for a selector
fn selector_probe_script(selector: &str) -> Result<String> {
    let literal = serde_json::to_string(selector)?;
    Ok(format!(
        "(() => {{ try {{ return document.querySelector({}) !== null ? 1 : 0; }} catch (e) {{ return -1; }} }})()",
        literal
    ))
}

/// Page navigator
pub struct PageNavigator;

impl PageNavigator {
    /// Navigate to a URL and wait for the configured condition.
    ///
    /// Navigation and the settle wait share one timeout; exceeding it fails
    /// with [`NavigationError::Timeout`].
    #[instrument(skip(page, opts))]
    pub async fn goto(page: &Page, url: &str, opts: &NavigationOptions) -> Result<NavigationResult> {
        UrlValidator::check(url)?;
        let start = std::time::Instant::now();

        info!("Navigating to: {}", url);

        let timeout = Duration::from_millis(opts.timeout_ms);
        tokio::time::timeout(timeout, Self::navigate(page, url, opts))
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))??;

        let final_url = page
            .url()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .unwrap_or_else(|| url.to_string());

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!("Navigation complete: {} -> {} in {}ms", url, final_url, duration_ms);

        Ok(NavigationResult {
            final_url,
            duration_ms,
        })
    }

    async fn navigate(page: &Page, url: &str, opts: &NavigationOptions) -> Result<()> {
        match opts.wait_until.max_inflight() {
            Some(max_inflight) => {
                // Subscribe before navigating so the document request itself is seen.
                let started = page.event_listener::<EventRequestWillBeSent>().await?;
                let finished = page.event_listener::<EventLoadingFinished>().await?;
                let failed = page.event_listener::<EventLoadingFailed>().await?;

                page.goto(url)
                    .await
                    .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

                // A redirect re-announces an id that is already in flight.
                let started = started.filter_map(|event| {
                    future::ready(
                        event
                            .redirect_response
                            .is_none()
                            .then(|| event.request_id.clone()),
                    )
                });
                let done = stream::select(
                    finished.map(|event| event.request_id.clone()),
                    failed.map(|event| event.request_id.clone()),
                );

                let quiet = Duration::from_millis(opts.quiet_period_ms);
                if !wait_for_network_settled(started, done, max_inflight, quiet).await {
                    return Err(NavigationError::LoadFailed(
                        "page closed before the network settled".to_string(),
                    )
                    .into());
                }
            }
            None => {
                page.goto(url)
                    .await
                    .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

                let script = if opts.wait_until == WaitUntil::Load {
                    r#"
                        new Promise(resolve => {
                            if (document.readyState === 'complete') {
                                resolve(true);
                            } else {
                                window.addEventListener('load', () => resolve(true));
                            }
                        })
                    "#
                } else {
                    r#"
                        new Promise(resolve => {
                            if (document.readyState !== 'loading') {
                                resolve(true);
                            } else {
                                document.addEventListener('DOMContentLoaded', () => resolve(true));
                            }
                        })
                    "#
                };
                page.evaluate(script)
                    .await
                    .map_err(|e| Error::cdp(e.to_string()))?;
            }
        }

        Ok(())
    }

    /// Wait for a selector to match an element in the current document.
    ///
    /// Fails with [`NavigationError::SelectorTimeout`] when nothing matches
    /// within `timeout_ms`, and with [`NavigationError::InvalidSelector`] when
    /// the browser rejects the selector.
    #[instrument(skip(page))]
    pub async fn wait_for_selector(page: &Page, selector: &str, timeout_ms: u64) -> Result<()> {
        let script = selector_probe_script(selector)?;

        tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            Self::poll_selector(page, &script, selector),
        )
        .await
        .map_err(|_| NavigationError::SelectorTimeout {
            selector: selector.to_string(),
            timeout_ms,
        })?
    }

    async fn poll_selector(page: &Page, script: &str, selector: &str) -> Result<()> {
        loop {
            let code: i64 = page
                .evaluate(script)
                .await
                .map_err(|e| Error::cdp(e.to_string()))?
                .into_value()
                .map_err(|e| Error::cdp(e.to_string()))?;

            match SelectorProbe::from_code(code) {
                SelectorProbe::Found => return Ok(()),
                SelectorProbe::Invalid => {
                    return Err(NavigationError::InvalidSelector(selector.to_string()).into())
                }
                SelectorProbe::Missing => tokio::time::sleep(SELECTOR_POLL_INTERVAL).await,
            }
        }
    }
}

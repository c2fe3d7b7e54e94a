//! Browser automation module
//!
//! This module provides browser control through ChromiumOxide: lifecycle
//! management, navigation with wait conditions, and the [`PageRenderer`]
//! seam the fetch pipeline renders through.

pub mod controller;
pub mod navigation;
pub mod renderer;

pub use controller::{BrowserConfig, BrowserConfigBuilder, BrowserSession};
pub use navigation::{NavigationOptions, NavigationResult, PageNavigator, UrlValidator, WaitUntil};
pub use renderer::{ChromeRenderer, PageRenderer, RenderedPage};

//! Error types for mcp-fetch
//!
//! This module provides the error hierarchy for the fetch pipeline using
//! `thiserror`. Every error can be classified into an [`ErrorKind`], which is
//! what batch reports and protocol responses carry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for mcp-fetch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Content extraction and conversion errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// MCP protocol errors
    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    /// Rejected caller input (options, arguments)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Timeout waiting for browser
    #[error("Browser operation timed out after {0}ms")]
    Timeout(u64),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation did not settle in time
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),

    /// `waitForSelector` never matched
    #[error("Selector '{selector}' not found within {timeout_ms}ms")]
    SelectorTimeout {
        /// The selector that was awaited
        selector: String,
        /// The timeout that elapsed
        timeout_ms: u64,
    },

    /// `waitForSelector` is not a valid CSS selector
    #[error("Invalid wait selector '{0}'")]
    InvalidSelector(String),
}

/// Content extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Invalid selector
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Markdown conversion failed
    #[error("Markdown conversion failed: {0}")]
    ConversionFailed(String),
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    /// Invalid JSON-RPC request
    #[error("Invalid JSON-RPC request: {0}")]
    InvalidRequest(String),

    /// Unknown method
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Resource URI does not match any template
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}

/// Coarse failure classification used in batch reports and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed URL or options, rejected before any browser work
    InvalidInput,
    /// Target unreachable or navigation did not settle in time
    Navigation,
    /// `waitForSelector` never appeared
    SelectorWait,
    /// Browser could not be launched or driven
    Browser,
    /// Document query or in-page evaluation failed
    Extraction,
    /// HTML to Markdown conversion failed
    Conversion,
    /// Protocol-level error
    Protocol,
    /// Anything else
    Internal,
}

/// Result type alias for mcp-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create an invalid input error from a string
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Navigation(NavigationError::InvalidUrl(_)) => ErrorKind::InvalidInput,
            Error::Navigation(
                NavigationError::SelectorTimeout { .. } | NavigationError::InvalidSelector(_),
            ) => ErrorKind::SelectorWait,
            Error::Navigation(_) => ErrorKind::Navigation,
            Error::Browser(_) | Error::Cdp(_) => ErrorKind::Browser,
            Error::Extraction(ExtractionError::ConversionFailed(_)) => ErrorKind::Conversion,
            Error::Extraction(_) => ErrorKind::Extraction,
            Error::Mcp(_) | Error::Json(_) => ErrorKind::Protocol,
            Error::Io(_) | Error::Generic(_) => ErrorKind::Internal,
        }
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

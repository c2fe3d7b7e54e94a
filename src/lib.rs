//! mcp-fetch - Browser-Rendered Web Pages as Markdown over MCP
//!
//! This crate renders a web page in headless Chromium, picks out its main
//! content, harvests a small set of metadata fields and converts the
//! content to clean Markdown. The pipeline is exposed as MCP tools and a
//! resource template over stdio or an HTTP event stream.
//!
//! # Architecture
//!
//! ```text
//! AI Agent ──▶ MCP Server ──▶ Fetcher ──▶ PageRenderer (CDP)
//!                                │              │
//!                                │              ▼
//!                                │         rendered HTML
//!                                ▼              │
//!                         ┌──────────────┐      │
//!                         │ Extraction   │◀─────┘
//!                         └──────┬───────┘
//!                                ▼
//!                     Markdown + title + metadata
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mcp_fetch::fetch::{FetchOptions, Fetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Fetcher::default();
//!     let result = fetcher
//!         .fetch_url("https://example.com", &FetchOptions::default())
//!         .await?;
//!
//!     println!("{}", result.to_markdown_document());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod cors;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod mcp;

// Re-exports for convenience
pub use browser::{BrowserConfig, ChromeRenderer, PageRenderer};
pub use error::{Error, ErrorKind, Result};
pub use extraction::{ContentLocator, MarkdownConverter, MetadataExtractor};
pub use fetch::{BatchReport, FetchOptions, FetchResult, Fetcher};
pub use mcp::{McpServer, SseTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Content extraction module
//!
//! This module turns a rendered page into its parts: the main-content
//! subtree, an allow-listed metadata map, and the Markdown rendition of the
//! content. Everything here runs against a [`DocumentQuery`], never against
//! the browser.

pub mod content;
pub mod document;
pub mod markdown;
pub mod metadata;

pub use content::{ContentLocator, ContentSource, LocatedContent, DEFAULT_CONTENT_SELECTORS};
pub use document::{DocumentQuery, HtmlSnapshot, MetaDeclaration};
pub use markdown::MarkdownConverter;
pub use metadata::{Metadata, MetadataExtractor};

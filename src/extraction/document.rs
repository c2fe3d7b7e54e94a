//! Read-only document queries
//!
//! Extraction never talks to the browser directly. It runs against a
//! [`DocumentQuery`], so any rendering backend that can hand back a DOM
//! serialization can feed the Content Locator and Metadata Extractor.

use crate::error::{ExtractionError, Result};
use scraper::{ElementRef, Html, Selector};

/// One `<meta>` declaration as it appears in the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaDeclaration {
    /// `name` attribute
    pub name: Option<String>,
    /// `property` attribute
    pub property: Option<String>,
    /// `content` attribute
    pub content: Option<String>,
}

impl MetaDeclaration {
    /// Declaration with only a `name`
    pub fn named(name: &str, content: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            property: None,
            content: Some(content.to_string()),
        }
    }

    /// Declaration with only a `property`
    pub fn property(property: &str, content: &str) -> Self {
        Self {
            name: None,
            property: Some(property.to_string()),
            content: Some(content.to_string()),
        }
    }
}

/// Read-only queries against a rendered document
pub trait DocumentQuery {
    /// Inner HTML of the first element matching `selector`, in document order
    fn first_inner_html(&self, selector: &str) -> Result<Option<String>>;

    /// Inner HTML of the document body
    fn body_inner_html(&self) -> String;

    /// Every `<meta>` declaration, in document order
    fn meta_declarations(&self) -> Vec<MetaDeclaration>;
}

/// Parse a CSS selector, mapping failures to an extraction error
pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ExtractionError::InvalidSelector(format!("{}: {}", selector, e)).into())
}

/// A parsed snapshot of a rendered page
pub struct HtmlSnapshot {
    document: Html,
}

impl HtmlSnapshot {
    /// Parse a full HTML document
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
    }
}

impl std::fmt::Debug for HtmlSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlSnapshot").finish_non_exhaustive()
    }
}

impl DocumentQuery for HtmlSnapshot {
    fn first_inner_html(&self, selector: &str) -> Result<Option<String>> {
        let selector = parse_selector(selector)?;
        Ok(self.document.select(&selector).next().map(|el| el.inner_html()))
    }

    fn body_inner_html(&self) -> String {
        let root = self.document.root_element();
        root.children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
            .unwrap_or(root)
            .inner_html()
    }

    fn meta_declarations(&self) -> Vec<MetaDeclaration> {
        self.elements()
            .filter(|el| el.value().name() == "meta")
            .map(|el| {
                let attr = |name: &str| el.value().attr(name).map(str::to_string);
                MetaDeclaration {
                    name: attr("name"),
                    property: attr("property"),
                    content: attr("content"),
                }
            })
            .collect()
    }
}

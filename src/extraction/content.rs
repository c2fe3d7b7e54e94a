//! Main content location
//!
//! Picks the subtree of a rendered page that holds its primary content. The
//! rule is a fixed priority list of CSS selectors; the first selector that
//! matches wins, and the document body is the fallback when none do.

use crate::error::Result;
use crate::extraction::document::{parse_selector, DocumentQuery};
use tracing::debug;

/// Default selector priority: `<main>`, `<article>`, `#content`, `.content`
pub const DEFAULT_CONTENT_SELECTORS: [&str; 4] = ["main", "article", "#content", ".content"];

/// Where the located content came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Matched one of the configured selectors
    Selector(String),
    /// No selector matched; the whole body was used
    Body,
}

/// The HTML chosen as main content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedContent {
    /// Inner HTML of the chosen element
    pub html: String,
    /// Which rule produced it
    pub source: ContentSource,
}

/// Main-content heuristic
#[derive(Debug, Clone)]
pub struct ContentLocator {
    selectors: Vec<String>,
}

impl Default for ContentLocator {
    fn default() -> Self {
        Self {
            selectors: DEFAULT_CONTENT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ContentLocator {
    /// Locator with the default priority list
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator with a custom priority list.
    ///
    /// Every selector is parsed up front so a bad one fails here rather than
    /// on the first fetch. The body fallback always applies.
    pub fn with_selectors<I, S>(selectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selectors = selectors
            .into_iter()
            .map(Into::into)
            .collect::<Vec<String>>();
        for selector in &selectors {
            parse_selector(selector)?;
        }
        Ok(Self { selectors })
    }

    /// The selectors tried, in priority order
    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    /// Find the main content of `document`
    pub fn locate(&self, document: &dyn DocumentQuery) -> Result<LocatedContent> {
        for selector in &self.selectors {
            if let Some(html) = document.first_inner_html(selector)? {
                debug!("Main content matched '{}'", selector);
                return Ok(LocatedContent {
                    html,
                    source: ContentSource::Selector(selector.clone()),
                });
            }
        }

        debug!("No content selector matched, using body");
        Ok(LocatedContent {
            html: document.body_inner_html(),
            source: ContentSource::Body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::document::HtmlSnapshot;

    fn locate(html: &str) -> LocatedContent {
        ContentLocator::new()
            .locate(&HtmlSnapshot::parse(html))
            .unwrap()
    }

    #[test]
    fn test_main_beats_article() {
        let found = locate("<article><p>article</p></article><main><p>main</p></main>");
        assert_eq!(found.source, ContentSource::Selector("main".to_string()));
        assert_eq!(found.html, "<p>main</p>");
    }

    #[test]
    fn test_article_beats_content_id() {
        let found = locate(r#"<div id="content">id</div><article>article</article>"#);
        assert_eq!(found.html, "article");
    }

    #[test]
    fn test_content_id_beats_content_class() {
        let found = locate(r#"<div class="content">class</div><div id="content">id</div>"#);
        assert_eq!(found.html, "id");
    }

    #[test]
    fn test_content_class() {
        let found = locate(r#"<nav>menu</nav><div class="wide content">class</div>"#);
        assert_eq!(found.source, ContentSource::Selector(".content".to_string()));
        assert_eq!(found.html, "class");
    }

    #[test]
    fn test_falls_back_to_body() {
        let found = locate("<nav>menu</nav><p>text</p>");
        assert_eq!(found.source, ContentSource::Body);
        assert_eq!(found.html, "<nav>menu</nav><p>text</p>");
    }

    #[test]
    fn test_custom_selectors() {
        let locator = ContentLocator::with_selectors(["#post", "main"]).unwrap();
        let doc = HtmlSnapshot::parse(r#"<main>main</main><div id="post">post</div>"#);
        assert_eq!(locator.locate(&doc).unwrap().html, "post");
        assert_eq!(locator.selectors(), ["#post", "main"]);
    }

    #[test]
    fn test_custom_selectors_rejects_invalid() {
        assert!(ContentLocator::with_selectors(["main", "div[["]).is_err());
    }
}

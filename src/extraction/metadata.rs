//! Page metadata extraction
//!
//! Meta declarations are first folded into a raw map keyed by `name` (or
//! `property` when `name` is absent or empty); later declarations overwrite
//! earlier ones. A small allow-list is then projected out of that map.

use crate::extraction::document::{DocumentQuery, MetaDeclaration};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Canonical metadata, keyed by output field name
pub type Metadata = BTreeMap<String, String>;

/// Output field and the raw keys it is read from, highest precedence first
pub const DEFAULT_PROJECTION: &[(&str, &[&str])] = &[
    ("description", &["og:description", "description"]),
    ("author", &["author"]),
    ("ogTitle", &["og:title"]),
];

/// Allow-list projection of page metadata
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    projection: Vec<(String, Vec<String>)>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self {
            projection: DEFAULT_PROJECTION
                .iter()
                .map(|(field, keys)| {
                    (
                        field.to_string(),
                        keys.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl MetadataExtractor {
    /// Extractor with the default allow-list
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen the allow-list with another output field.
    ///
    /// `sources` are raw keys in precedence order. Replaces any existing
    /// entry for `field`.
    pub fn with_field<S: Into<String>>(mut self, field: S, sources: &[&str]) -> Self {
        let field = field.into();
        let sources = sources.iter().map(|s| s.to_string()).collect();
        match self.projection.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = sources,
            None => self.projection.push((field, sources)),
        }
        self
    }

    /// Fold meta declarations into the raw key/value map
    pub fn raw_map(declarations: &[MetaDeclaration]) -> BTreeMap<String, String> {
        let mut raw = BTreeMap::new();
        for decl in declarations {
            let key = decl
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .or(decl.property.as_deref());
            match (key, decl.content.as_deref()) {
                (Some(key), Some(content)) if !key.is_empty() && !content.is_empty() => {
                    raw.insert(key.to_string(), content.to_string());
                }
                _ => {}
            }
        }
        raw
    }

    /// Project the allow-listed fields out of a raw map
    pub fn project(&self, raw: &BTreeMap<String, String>) -> Metadata {
        self.projection
            .iter()
            .filter_map(|(field, sources)| {
                sources
                    .iter()
                    .find_map(|key| raw.get(key))
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect()
    }

    /// Extract canonical metadata from a document
    #[instrument(skip_all)]
    pub fn extract(&self, document: &dyn DocumentQuery) -> Metadata {
        let raw = Self::raw_map(&document.meta_declarations());
        let metadata = self.project(&raw);
        debug!("Kept {} of {} meta keys", metadata.len(), raw.len());
        metadata
    }
}

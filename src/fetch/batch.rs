//! Multi-URL fetching with bounded concurrency
//!
//! URLs are pulled lazily from a stream and at most `max_concurrency`
//! renders (and so browser processes) are alive at any moment. A failing URL
//! never affects its siblings.

use crate::error::{Error, ErrorKind};
use crate::fetch::options::{FetchOptions, FetchResult};
use crate::fetch::pipeline::Fetcher;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Why one URL of a batch failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Failure classification
    pub kind: ErrorKind,
    /// Human readable reason
    pub message: String,
}

impl From<&Error> for FetchFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of fetching one URL within a batch
pub type FetchOutcome = std::result::Result<FetchResult, FetchFailure>;

/// Per-URL outcomes of a batch, in first-seen input order.
///
/// A URL that was never part of the batch has no entry, so callers can tell
/// "not attempted" apart from "succeeded" and "failed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    entries: Vec<(String, FetchOutcome)>,
}

impl BatchReport {
    /// Outcome for `url`, if it was part of the batch
    pub fn get(&self, url: &str) -> Option<&FetchOutcome> {
        self.entries
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, outcome)| outcome)
    }

    /// All outcomes in input order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FetchOutcome)> {
        self.entries.iter().map(|(url, outcome)| (url.as_str(), outcome))
    }

    /// Number of distinct URLs attempted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch was empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful fetches
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_ok()).count()
    }

    /// Number of failed fetches
    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// True when at least one URL was attempted and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.is_empty() && self.success_count() == 0
    }

    /// Failed URLs with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FetchFailure)> {
        self.entries.iter().filter_map(|(url, outcome)| match outcome {
            Err(failure) => Some((url.as_str(), failure)),
            Ok(_) => None,
        })
    }

    /// Keep only the successes, keyed by URL
    pub fn into_successes(self) -> BTreeMap<String, FetchResult> {
        self.entries
            .into_iter()
            .filter_map(|(url, outcome)| outcome.ok().map(|result| (url, result)))
            .collect()
    }
}

impl IntoIterator for BatchReport {
    type Item = (String, FetchOutcome);
    type IntoIter = std::vec::IntoIter<(String, FetchOutcome)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Fetcher {
    /// Fetch many URLs, reporting every outcome.
    ///
    /// Duplicate URLs are fetched once.
    #[instrument(skip(self, urls, options), fields(count = urls.len()))]
    pub async fn fetch_many<S: AsRef<str>>(&self, urls: &[S], options: &FetchOptions) -> BatchReport {
        let mut seen = HashSet::new();
        let unique: Vec<String> = urls
            .iter()
            .map(|u| u.as_ref().to_string())
            .filter(|u| seen.insert(u.clone()))
            .collect();

        info!(
            "Fetching {} URLs with at most {} in flight",
            unique.len(),
            self.max_concurrency
        );

        let mut outcomes: HashMap<String, FetchOutcome> = stream::iter(unique.iter().cloned())
            .map(|url| async move {
                let outcome = self.fetch_url(&url, options).await;
                (url, outcome)
            })
            .buffer_unordered(self.max_concurrency)
            .map(|(url, outcome)| {
                let outcome = outcome.map_err(|e| {
                    warn!(url = %url, kind = ?e.kind(), "Fetch failed: {}", e);
                    FetchFailure::from(&e)
                });
                (url, outcome)
            })
            .collect()
            .await;

        let entries = unique
            .into_iter()
            .filter_map(|url| outcomes.remove(&url).map(|outcome| (url, outcome)))
            .collect();

        BatchReport { entries }
    }

    /// Fetch many URLs, keeping only the successes.
    ///
    /// Failures are logged and left out of the map.
    pub async fn fetch_multiple_urls<S: AsRef<str>>(
        &self,
        urls: &[S],
        options: &FetchOptions,
    ) -> BTreeMap<String, FetchResult> {
        self.fetch_many(urls, options).await.into_successes()
    }
}

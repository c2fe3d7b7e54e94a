//! Fetch orchestration
//!
//! Composes rendering, content location, metadata extraction and Markdown
//! conversion into a single fetch, plus a bounded multi-URL variant.

pub mod batch;
pub mod options;
pub mod pipeline;

pub use batch::{BatchReport, FetchFailure, FetchOutcome};
pub use options::{
    FetchOptions, FetchOptionsBuilder, FetchResult, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
};
pub use pipeline::{Fetcher, FetcherBuilder, DEFAULT_MAX_CONCURRENCY};

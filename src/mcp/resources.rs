//! The `fetch://{url}` resource template
//!
//! Unlike the tools, resource reads surface failures as protocol errors.

use crate::error::{Error, McpError, Result};
use crate::fetch::{FetchOptions, Fetcher};
use crate::mcp::types::{ResourceContents, ResourceReadResult, ResourceTemplate};
use tracing::{info, instrument};

/// URI scheme prefix the template matches
pub const FETCH_SCHEME: &str = "fetch://";

/// Template URI
pub const FETCH_TEMPLATE_URI: &str = "fetch://{url}";

/// Template name
pub const FETCH_TEMPLATE_NAME: &str = "fetch-template";

/// MIME type of resolved resources
pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";

/// The template advertised by `resources/templates/list`
pub fn fetch_template() -> ResourceTemplate {
    ResourceTemplate {
        uri_template: FETCH_TEMPLATE_URI.to_string(),
        name: FETCH_TEMPLATE_NAME.to_string(),
        description: Some("Fetch a percent-encoded URL and return it as markdown".to_string()),
        mime_type: Some(MARKDOWN_MIME_TYPE.to_string()),
    }
}

/// Extract and percent-decode the `{url}` variable of a `fetch://` URI
pub fn decode_fetch_uri(uri: &str) -> Result<String> {
    let encoded = uri
        .strip_prefix(FETCH_SCHEME)
        .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))?;
    let url = urlencoding::decode(encoded)
        .map_err(|e| Error::invalid_input(format!("Invalid URL encoding: {}", e)))?;
    if url.is_empty() {
        return Err(Error::invalid_input("Invalid URL"));
    }
    Ok(url.into_owned())
}

/// Resolve a `fetch://` URI with default options
#[instrument(skip(fetcher))]
pub async fn read_fetch_resource(fetcher: &Fetcher, uri: &str) -> Result<ResourceReadResult> {
    let url = decode_fetch_uri(uri)?;
    info!("Reading resource for {}", url);

    let result = fetcher.fetch_url(&url, &FetchOptions::default()).await?;
    let decoded_uri = urlencoding::decode(uri)
        .map(|u| u.into_owned())
        .unwrap_or_else(|_| uri.to_string());

    Ok(ResourceReadResult {
        contents: vec![ResourceContents {
            uri: decoded_uri,
            mime_type: MARKDOWN_MIME_TYPE.to_string(),
            text: result.to_markdown_document(),
        }],
    })
}

//! MCP tool definitions and registry
//!
//! Tools never fail at the protocol level: a fetch error becomes a text
//! block flagged with `isError`.

use crate::fetch::{FetchOptions, Fetcher, DEFAULT_TIMEOUT_MS};
use crate::mcp::types::{McpToolDefinition, ToolCallResult, ToolContent};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// A registered MCP tool
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;
    /// Tool description
    fn description(&self) -> &str;
    /// Input schema as JSON
    fn input_schema(&self) -> Value;
    /// Get tool definition
    fn definition(&self) -> McpToolDefinition {
        McpToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
    /// Run the tool
    async fn call(&self, fetcher: &Fetcher, args: Value) -> ToolCallResult;
}

/// Tool registry holding all available tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn McpTool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new tool registry with all built-in tools
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Box::new(FetchUrlTool));
        registry.register(Box::new(FetchUrlsTool));

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Box<dyn McpTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Whether a tool with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions, sorted by name
    pub fn definitions(&self) -> Vec<McpToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name
    #[instrument(skip(self, fetcher, args))]
    pub async fn execute(&self, fetcher: &Fetcher, name: &str, args: Value) -> ToolCallResult {
        info!("Executing tool: {}", name);

        match self.tools.get(name) {
            Some(tool) => tool.call(fetcher, args).await,
            None => ToolCallResult::error(format!("Tool not found: {}", name)),
        }
    }
}

/// Options shared by both fetch tools
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommonArgs {
    timeout: Option<u64>,
    wait_for_selector: Option<String>,
    include_images: Option<bool>,
}

impl CommonArgs {
    fn to_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS),
            wait_for_selector: self.wait_for_selector.clone(),
            include_images: self.include_images.unwrap_or(false),
            ..FetchOptions::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct FetchUrlArgs {
    url: String,
    #[serde(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Deserialize)]
struct FetchUrlsArgs {
    urls: Vec<String>,
    #[serde(flatten)]
    common: CommonArgs,
}

fn option_properties() -> serde_json::Map<String, Value> {
    let props = json!({
        "timeout": {
            "type": "integer",
            "exclusiveMinimum": 0,
            "description": "Timeout in milliseconds (default: 30000)"
        },
        "waitForSelector": {
            "type": "string",
            "description": "CSS selector to wait for"
        },
        "includeImages": {
            "type": "boolean",
            "description": "Whether to include image references in markdown (default: false)"
        }
    });
    match props {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn error_text(url: &str, message: impl std::fmt::Display) -> String {
    format!("Error fetching {}: {}", url, message)
}

/// Fetch one page as Markdown
pub struct FetchUrlTool;

#[async_trait]
impl McpTool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch-url"
    }

    fn description(&self) -> &str {
        "Fetch a URL using a headless browser and return the content as markdown"
    }

    fn input_schema(&self) -> Value {
        let mut properties = option_properties();
        properties.insert(
            "url".to_string(),
            json!({
                "type": "string",
                "format": "uri",
                "description": "The URL to fetch"
            }),
        );
        json!({
            "type": "object",
            "properties": properties,
            "required": ["url"]
        })
    }

    async fn call(&self, fetcher: &Fetcher, args: Value) -> ToolCallResult {
        let args: FetchUrlArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return ToolCallResult::error(format!("Invalid arguments: {}", e)),
        };

        match fetcher.fetch_url(&args.url, &args.common.to_options()).await {
            Ok(result) => ToolCallResult::text(result.to_markdown_document()),
            Err(e) => {
                warn!("fetch-url failed for {}: {}", args.url, e);
                ToolCallResult::error(error_text(&args.url, e))
            }
        }
    }
}

/// Fetch several pages as Markdown, one text block per URL
pub struct FetchUrlsTool;

#[async_trait]
impl McpTool for FetchUrlsTool {
    fn name(&self) -> &str {
        "fetch-urls"
    }

    fn description(&self) -> &str {
        "Fetch several URLs in parallel and return each page's content as markdown"
    }

    fn input_schema(&self) -> Value {
        let mut properties = option_properties();
        properties.insert(
            "urls".to_string(),
            json!({
                "type": "array",
                "items": { "type": "string", "format": "uri" },
                "minItems": 1,
                "description": "The URLs to fetch"
            }),
        );
        json!({
            "type": "object",
            "properties": properties,
            "required": ["urls"]
        })
    }

    async fn call(&self, fetcher: &Fetcher, args: Value) -> ToolCallResult {
        let args: FetchUrlsArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return ToolCallResult::error(format!("Invalid arguments: {}", e)),
        };
        if args.urls.is_empty() {
            return ToolCallResult::error("Invalid arguments: urls must not be empty");
        }

        let report = fetcher
            .fetch_many(&args.urls, &args.common.to_options())
            .await;
        let all_failed = report.all_failed();

        let content = report
            .iter()
            .map(|(url, outcome)| match outcome {
                Ok(result) => ToolContent::text(result.to_markdown_document()),
                Err(failure) => ToolContent::text(error_text(url, &failure.message)),
            })
            .collect();

        ToolCallResult::multi(content, all_failed)
    }
}

//! Model Context Protocol (MCP) server module
//!
//! Exposes the fetch pipeline as the `fetch-url` and `fetch-urls` tools and
//! the `fetch://{url}` resource template, over stdio or an HTTP event
//! stream.

/// `fetch://` resource template
pub mod resources;
mod server;
/// HTTP event-stream transport
pub mod sse;
mod tools;
/// MCP protocol types
pub mod types;

pub use server::{McpServer, PROTOCOL_VERSION, RESOURCE_NOT_FOUND_CODE};
pub use sse::{normalize_prefix, shutdown_signal, Endpoints, SseTransport};
pub use tools::{FetchUrlTool, FetchUrlsTool, McpTool, ToolRegistry};
pub use types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpCapabilities, McpServerInfo,
    McpToolDefinition, ResourceContents, ResourceReadResult, ResourceTemplate, ToolCallParams,
    ToolCallResult, ToolContent,
};

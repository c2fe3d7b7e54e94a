//! MCP server implementation
//!
//! [`McpServer`] owns the tool registry and a shared [`Fetcher`]. It is
//! built once in `main` and handed to a transport: [`McpServer::run_stdio`]
//! for newline-delimited JSON-RPC over stdin/stdout, or the event-stream
//! transport in [`crate::mcp::sse`]. Both go through
//! [`McpServer::handle_line`].

use crate::error::{Error, McpError, Result};
use crate::fetch::Fetcher;
use crate::mcp::resources::{fetch_template, read_fetch_resource};
use crate::mcp::tools::ToolRegistry;
use crate::mcp::types::{
    JsonRpcRequest, JsonRpcResponse, McpCapabilities, McpServerInfo, ResourceReadParams,
    ToolCallParams,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Protocol revision this server speaks
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error code for an unknown resource
pub const RESOURCE_NOT_FOUND_CODE: i32 = -32002;

/// JSON-RPC internal error code
const INTERNAL_ERROR_CODE: i32 = -32603;

/// MCP server state
pub struct McpServer {
    /// Shared fetch pipeline
    fetcher: Arc<Fetcher>,
    /// Tool registry
    tools: ToolRegistry,
    /// Server info
    info: McpServerInfo,
    /// Whether the server has been initialized
    initialized: RwLock<bool>,
}

impl McpServer {
    /// Create a server around a fetcher
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            tools: ToolRegistry::new(),
            info: McpServerInfo::default(),
            initialized: RwLock::new(false),
        }
    }

    /// Server name and version
    pub fn info(&self) -> &McpServerInfo {
        &self.info
    }

    /// The fetch pipeline behind the tools and resources
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Whether `initialize` has been received (and no `shutdown` since)
    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Serve newline-delimited JSON-RPC over stdin/stdout until stdin closes.
    ///
    /// Requests are handled concurrently; responses are written as they
    /// complete.
    #[instrument(skip(self))]
    pub async fn run_stdio(self: Arc<Self>) -> Result<()> {
        info!(
            "Starting MCP server: {} v{} on stdio",
            self.info.name, self.info.version
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(json) = rx.recv().await {
                debug!("Sending: {}", json);
                let mut line = json.into_bytes();
                line.push(b'\n');
                if let Err(e) = stdout.write_all(&line).await {
                    error!("Failed to write response: {}", e);
                    break;
                }
                if let Err(e) = stdout.flush().await {
                    error!("Failed to flush stdout: {}", e);
                    break;
                }
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!("Received: {}", line);

            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(resp) = server.handle_line(&line).await {
                    let _ = tx.send(encode_response(&resp));
                }
            });
        }

        // The writer drains once every in-flight request drops its sender.
        drop(tx);
        if let Err(e) = writer.await {
            error!("Writer task failed: {}", e);
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle a single line of input
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                return Some(JsonRpcResponse::parse_error());
            }
        };

        self.handle_request(request).await
    }

    /// Handle a JSON-RPC request.
    ///
    /// Returns `None` for notifications (requests without an id).
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        let method = request.method.as_str();

        if request.jsonrpc != "2.0" {
            return id.map(|id| JsonRpcResponse::invalid_request(Some(id)));
        }

        info!("Handling method: {}", method);

        let result = match method {
            "initialize" => self.handle_initialize(request.params).await,
            "notifications/initialized" | "initialized" => {
                debug!("Client finished initialization");
                return None;
            }
            "shutdown" => self.handle_shutdown().await,
            "ping" => Ok(json!({})),

            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.handle_tools_call(request.params).await,

            "resources/list" => Ok(json!({ "resources": [] })),
            "resources/templates/list" => Ok(json!({ "resourceTemplates": [fetch_template()] })),
            "resources/read" => self.handle_resources_read(request.params).await,

            _ => Err(McpError::UnknownMethod(method.to_string()).into()),
        };

        let id = match id {
            Some(id) => Some(id),
            None => {
                if let Err(e) = result {
                    warn!("Notification {} failed: {}", method, e);
                }
                return None;
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => error_response(id, &e),
        })
    }

    /// Handle initialize request
    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        if let Some(version) = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(|v| v.as_str())
        {
            debug!("Client protocol version: {}", version);
        }

        *self.initialized.write().await = true;

        Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": McpCapabilities::server(),
            "serverInfo": self.info
        }))
    }

    /// Handle shutdown request
    async fn handle_shutdown(&self) -> Result<Value> {
        info!("Handling shutdown");
        *self.initialized.write().await = false;
        Ok(Value::Null)
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value> {
        let params = params.ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        if !self.tools.contains(&call.name) {
            return Err(McpError::ToolNotFound(call.name).into());
        }

        let result = self
            .tools
            .execute(&self.fetcher, &call.name, call.arguments)
            .await;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle resources/read request
    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value> {
        let params = params.ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let read: ResourceReadParams = serde_json::from_value(params)
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        let result = read_fetch_resource(&self.fetcher, &read.uri)
            .await
            .map_err(|e| match e {
                Error::Mcp(McpError::ResourceNotFound(_)) => e,
                other => Error::generic(format!("Error fetching URL: {}", other)),
            })?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Map an error to its JSON-RPC response
fn error_response(id: Option<Value>, err: &Error) -> JsonRpcResponse {
    match err {
        Error::Mcp(McpError::InvalidParams(msg)) => JsonRpcResponse::invalid_params(id, msg),
        Error::Mcp(McpError::InvalidRequest(_)) => JsonRpcResponse::invalid_request(id),
        Error::Mcp(McpError::UnknownMethod(method)) => {
            warn!("Unknown method: {}", method);
            JsonRpcResponse::method_not_found(id, method)
        }
        Error::Mcp(McpError::ToolNotFound(name)) => {
            JsonRpcResponse::invalid_params(id, &format!("Tool not found: {}", name))
        }
        Error::Mcp(McpError::ResourceNotFound(uri)) => JsonRpcResponse::error(
            id,
            RESOURCE_NOT_FOUND_CODE,
            format!("Resource not found: {}", uri),
        ),
        other => JsonRpcResponse::error(id, INTERNAL_ERROR_CODE, other.to_string()),
    }
}

/// Serialize a response, falling back to a bare internal error
pub(crate) fn encode_response(resp: &JsonRpcResponse) -> String {
    serde_json::to_string(resp).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"}}"#.to_string()
    })
}

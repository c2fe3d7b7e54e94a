//! HTTP event-stream transport
//!
//! A client opens `GET {prefix}/sse` and receives an `endpoint` event naming
//! the URL to post JSON-RPC messages to. Every response to a posted message
//! is pushed back on the same stream as a `message` event.

use crate::cors::cors_layer;
use crate::error::Result;
use crate::mcp::server::{encode_response, McpServer};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Name reported by the info endpoint
pub const INFO_SERVER_NAME: &str = "MCP Fetch Server";

/// Transport label reported by the info endpoint
pub const TRANSPORT_NAME: &str = "SSE";

/// Ensure a leading `/` and no trailing `/`; empty (or `/`) stays empty
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Route paths under a prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Event stream
    pub sse: String,
    /// Message intake
    pub message: String,
    /// Server description
    pub info: String,
}

impl Endpoints {
    /// Paths for a raw (not yet normalized) prefix
    pub fn new(prefix: &str) -> Self {
        let prefix = normalize_prefix(prefix);
        Self {
            sse: format!("{}/sse", prefix),
            message: format!("{}/message", prefix),
            info: format!("{}/info", prefix),
        }
    }
}

/// Body of `GET {prefix}/info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Human readable server name
    pub name: String,
    /// Server version
    pub version: String,
    /// Transport label
    pub transport: String,
    /// Route paths
    pub endpoints: Endpoints,
}

type SessionMap = Arc<Mutex<HashMap<Uuid, mpsc::UnboundedSender<Event>>>>;

#[derive(Clone)]
struct SseState {
    server: Arc<McpServer>,
    endpoints: Arc<Endpoints>,
    sessions: SessionMap,
}

/// Removes a session once its event stream is dropped
struct SessionGuard {
    id: Uuid,
    sessions: SessionMap,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.lock().remove(&self.id);
        info!(session = %self.id, "SSE session closed");
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageQuery {
    session_id: Uuid,
}

/// Event-stream transport around a shared [`McpServer`]
pub struct SseTransport {
    state: SseState,
}

impl SseTransport {
    /// Transport serving `server` under `prefix`
    pub fn new(server: Arc<McpServer>, prefix: &str) -> Self {
        Self {
            state: SseState {
                server,
                endpoints: Arc::new(Endpoints::new(prefix)),
                sessions: Arc::new(Mutex::new(HashMap::new())),
            },
        }
    }

    /// Route paths in use
    pub fn endpoints(&self) -> &Endpoints {
        &self.state.endpoints
    }

    /// Number of open event streams
    pub fn session_count(&self) -> usize {
        self.state.sessions.lock().len()
    }

    /// The axum router for this transport
    pub fn router(&self) -> Router {
        let endpoints = &self.state.endpoints;
        Router::new()
            .route(&endpoints.sse, get(open_session))
            .route(&endpoints.message, post(post_message))
            .route(&endpoints.info, get(server_info))
            .layer(cors_layer())
            .with_state(self.state.clone())
    }

    /// Serve until SIGINT or SIGTERM
    #[instrument(skip(self))]
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        let endpoints = &self.state.endpoints;
        info!("MCP Fetch server listening on {}", addr);
        info!("SSE endpoint: http://{}{}", addr, endpoints.sse);
        info!("Message endpoint: http://{}{}", addr, endpoints.message);
        info!("Info endpoint: http://{}{}", addr, endpoints.info);

        let sessions = Arc::clone(&self.state.sessions);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                // Open streams only end once their senders are gone.
                sessions.lock().clear();
            })
            .await?;

        info!("SSE server stopped");
        Ok(())
    }
}

async fn open_session(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    state.sessions.lock().insert(id, tx);
    info!(session = %id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?sessionId={}", state.endpoints.message, id));
    let guard = SessionGuard {
        id,
        sessions: Arc::clone(&state.sessions),
    };

    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|event| (event, (rx, guard)))
    });
    let events = stream::once(async move { endpoint })
        .chain(messages)
        .map(Ok::<Event, Infallible>);

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> impl IntoResponse {
    let sender = state.sessions.lock().get(&query.session_id).cloned();
    let Some(tx) = sender else {
        warn!(session = %query.session_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "Unknown session");
    };

    debug!(session = %query.session_id, "Received: {}", body);
    let server = Arc::clone(&state.server);
    tokio::spawn(async move {
        if let Some(resp) = server.handle_line(&body).await {
            let event = Event::default().event("message").data(encode_response(&resp));
            if tx.send(event).is_err() {
                debug!("Session closed before the response was ready");
            }
        }
    });

    (StatusCode::ACCEPTED, "Accepted")
}

async fn server_info(State(state): State<SseState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: INFO_SERVER_NAME.to_string(),
        version: state.server.info().version.clone(),
        transport: TRANSPORT_NAME.to_string(),
        endpoints: (*state.endpoints).clone(),
    })
}

/// Resolves on SIGINT, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetcher;

    fn transport(prefix: &str) -> SseTransport {
        let server = Arc::new(McpServer::new(Arc::new(Fetcher::default())));
        SseTransport::new(server, prefix)
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("mcp"), "/mcp");
        assert_eq!(normalize_prefix("/mcp/"), "/mcp");
        assert_eq!(normalize_prefix("/a/b//"), "/a/b");
    }

    #[test]
    fn test_endpoints() {
        let endpoints = Endpoints::new("api/");
        assert_eq!(endpoints.sse, "/api/sse");
        assert_eq!(endpoints.message, "/api/message");
        assert_eq!(endpoints.info, "/api/info");

        assert_eq!(Endpoints::new("").sse, "/sse");
    }

    #[tokio::test]
    async fn test_info_body() {
        let transport = transport("/x");
        let Json(info) = server_info(State(transport.state.clone())).await;
        assert_eq!(info.name, "MCP Fetch Server");
        assert_eq!(info.transport, "SSE");
        assert_eq!(info.version, crate::VERSION);
        assert_eq!(info.endpoints.message, "/x/message");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let transport = transport("");
        let resp = post_message(
            State(transport.state.clone()),
            Query(MessageQuery {
                session_id: Uuid::new_v4(),
            }),
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_string(),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_is_accepted_and_answered() {
        let transport = transport("");
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.state.sessions.lock().insert(id, tx);

        let resp = post_message(
            State(transport.state.clone()),
            Query(MessageQuery { session_id: id }),
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_string(),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_session_removed_when_stream_dropped() {
        let transport = transport("");
        let sse = open_session(State(transport.state.clone())).await;
        assert_eq!(transport.session_count(), 1);
        drop(sse);
        assert_eq!(transport.session_count(), 0);
    }
}

//! mcp-fetch MCP Server
//!
//! Serves the fetch tools over stdio, or over an HTTP event stream with
//! `--sse`.

use anyhow::Context;
use clap::Parser;
use mcp_fetch::browser::BrowserConfig;
use mcp_fetch::fetch::{Fetcher, DEFAULT_MAX_CONCURRENCY};
use mcp_fetch::mcp::{shutdown_signal, McpServer, SseTransport};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// mcp-fetch MCP Server
#[derive(Parser, Debug)]
#[command(name = "mcp-fetch")]
#[command(version)]
#[command(about = "MCP server that fetches web pages with headless Chromium and returns Markdown")]
struct Args {
    /// Use the HTTP event-stream transport instead of stdio
    #[arg(long)]
    sse: bool,

    /// Port to listen on (event-stream transport)
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Path prefix for the event-stream routes
    #[arg(long, env = "URI_PREFIX", default_value = "")]
    prefix: String,

    /// Host to bind to (event-stream transport)
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to Chrome/Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Keep Chromium's sandbox enabled
    #[arg(long)]
    sandbox: bool,

    /// Browser instances a batch fetch may run at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,
}

impl Args {
    fn browser_config(&self) -> BrowserConfig {
        let mut builder = BrowserConfig::builder()
            .headless(!self.headed)
            .sandbox(self.sandbox);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_path(path);
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries the protocol stream, so logs go to stderr
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let fetcher = Fetcher::builder()
        .browser_config(args.browser_config())
        .max_concurrency(args.max_concurrency)
        .build();
    let server = Arc::new(McpServer::new(Arc::new(fetcher)));

    if args.sse {
        let addr = SocketAddr::new(args.host, args.port);
        SseTransport::new(server, &args.prefix)
            .serve(addr)
            .await
            .with_context(|| format!("event-stream transport on {} failed", addr))?;
    } else {
        tokio::select! {
            result = server.run_stdio() => result.context("stdio transport failed")?,
            _ = shutdown_signal() => {}
        }
    }

    Ok(())
}

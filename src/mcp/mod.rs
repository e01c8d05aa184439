//! Model Context Protocol (MCP) tool server.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on stdin/stdout and serves the
//! built-in lab tools to MCP clients such as desktop assistants or the
//! [`ToolRegistry`](crate::tools::ToolRegistry) of another agent:
//!
//! ```json
//! { "mcpServers": { "lab": { "command": "lab-tools-mcp" } } }
//! ```
//!
//! Stdout carries protocol frames only, so logging must go to stderr.

mod server;

pub use server::{DEFAULT_PROTOCOL_VERSION, McpToolServer};

/// Serve on the process's stdin and stdout.
pub async fn serve_stdio(server: &McpToolServer) -> std::io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    server.serve(stdin, tokio::io::stdout()).await
}

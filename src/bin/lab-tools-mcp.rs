//! Stdio MCP server exposing the lab tools: `get_time`,
//! `get_system_info` and `calculate`.

use agent_lab::mcp::{McpToolServer, serve_stdio};
use agent_lab::telemetry;
use agent_lab::tools::builtin;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_stderr();

    let server = McpToolServer::new("lab-tools", builtin::mcp_tools());
    serve_stdio(&server).await?;
    Ok(())
}

//! Tools the agents can call.
//!
//! Native tools run in-process. [`ToolRegistry`] combines them with tools
//! offered by MCP servers listed in `mcp.json`.

pub mod builtin;
pub mod config;
pub mod expr;
mod registry;

use async_trait::async_trait;

pub use registry::{ToolRegistry, describe_native, sanitize_tool_name};

/// A tool implemented in Rust.
#[async_trait]
pub trait NativeTool: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the arguments object.
    fn schema(&self) -> serde_json::Value;
    async fn call(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

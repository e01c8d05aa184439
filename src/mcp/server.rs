use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::tools::NativeTool;

/// Protocol revision answered when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP server exposing a fixed set of native tools over line-delimited
/// JSON-RPC.
#[derive(Debug, Clone)]
pub struct McpToolServer {
    name: String,
    version: String,
    tools: Vec<Arc<dyn NativeTool>>,
}

impl McpToolServer {
    pub fn new(name: impl Into<String>, tools: Vec<Arc<dyn NativeTool>>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tools,
        }
    }

    /// Dispatch one request. Notifications yield no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(name: "mcp.notification", method = %request.method, "Notification received");
            return None;
        }

        let id = request.response_id();
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize(request.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    /// Handle one raw line, returning the serialized response if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await?,
            Err(e) => {
                warn!(name: "mcp.parse_error", error = %e, "Unparseable request");
                JsonRpcResponse::failure(Value::Null, JsonRpcError::parse_error())
            }
        };
        serde_json::to_string(&response).ok()
    }

    /// Serve until `reader` reaches end of input.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            name: "mcp.server.started",
            server = %self.name,
            tools = self.tools.len(),
            "MCP server ready"
        );

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(out) = self.handle_line(trimmed).await {
                writer.write_all(out.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        info!(name: "mcp.server.stopped", "Input closed, MCP server stopping");
        Ok(())
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": self.name, "version": self.version }
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.schema()
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tools/call params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {e}")))
            })?;

        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let arguments = if params.arguments.is_null() {
            json!({})
        } else {
            params.arguments
        };

        Ok(match tool.call(arguments).await {
            Ok(value) => {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                json!({ "content": [{ "type": "text", "text": text }], "isError": false })
            }
            Err(e) => {
                warn!(name: "mcp.tool.failed", tool = %params.name, error = %e, "Tool call failed");
                json!({ "content": [{ "type": "text", "text": format!("Error: {e}") }], "isError": true })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin;

    fn server() -> McpToolServer {
        McpToolServer::new("lab-tools", builtin::mcp_tools())
    }

    async fn roundtrip(line: &str) -> Value {
        let out = server().handle_line(line).await.unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let resp = roundtrip(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{}}}"#,
        )
        .await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], "lab-tools");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_list_and_call() {
        let list = roundtrip(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let names: Vec<_> = list["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["get_time", "get_system_info", "calculate"]);

        let call = roundtrip(
            r#"{"jsonrpc":"2.0","id":"c","method":"tools/call","params":{"name":"calculate","arguments":{"expression":"sqrt(16)"}}}"#,
        )
        .await;
        assert_eq!(call["result"]["content"][0]["text"], "sqrt(16) = 4");
        assert_eq!(call["result"]["isError"], false);
    }

    #[tokio::test]
    async fn test_tool_failure_sets_is_error() {
        let call = roundtrip(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"calculate","arguments":{}}}"#,
        )
        .await;
        assert_eq!(call["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let unknown = roundtrip(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#).await;
        assert_eq!(unknown["error"]["code"], -32601);

        let bad_tool = roundtrip(
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"rm_rf"}}"#,
        )
        .await;
        assert_eq!(bad_tool["error"]["code"], -32602);

        let parse = roundtrip("{not json").await;
        assert_eq!(parse["error"]["code"], -32700);
        assert_eq!(parse["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_notifications_are_silent() {
        let out = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[0]["result"], json!({}));
        assert_eq!(lines[1]["id"], 2);
    }
}

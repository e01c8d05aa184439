use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, anyhow};
use rmcp::{
    model::{CallToolRequestParam, Tool},
    service::ServiceExt,
    transport::{StreamableHttpClientTransport, TokioChildProcess},
};
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::info;

use super::NativeTool;
use super::config::{McpConfig, McpServerEntry, expand_env_map, expand_env_placeholders, load_mcp_config};

type DynClientService = rmcp::service::RunningService<
    rmcp::service::RoleClient,
    Box<dyn rmcp::service::DynService<rmcp::service::RoleClient>>,
>;

/// Catalogue of callable tools: in-process [`NativeTool`]s plus tools
/// discovered on connected MCP servers.
///
/// Every tool is exposed under a namespaced name, `server__tool` for MCP
/// tools and `native__tool` for native ones, restricted to `[A-Za-z0-9_-]`
/// so it is accepted as an OpenAI function name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    services: Arc<HashMap<String, Arc<DynClientService>>>,
    // namespaced name -> (server, raw tool name)
    tool_index: Arc<HashMap<String, (String, String)>>,
    tools: Arc<Vec<(String, Tool)>>,
    native_tools: Arc<HashMap<String, Arc<dyn NativeTool>>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tool_count", &self.tools.len())
            .field("service_count", &self.services.len())
            .field("native_tool_count", &self.native_tools.len())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the given native tools.
    pub fn with_native_tools(tools: impl IntoIterator<Item = Arc<dyn NativeTool>>) -> Self {
        tools
            .into_iter()
            .fold(Self::new(), ToolRegistry::with_native_tool)
    }

    pub async fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let cfg = load_mcp_config(path)?;
        Self::connect(&cfg).await
    }

    /// Connect to every configured MCP server and index its tools.
    pub async fn connect(cfg: &McpConfig) -> anyhow::Result<Self> {
        let mut services: HashMap<String, Arc<DynClientService>> = HashMap::new();

        for (name, entry) in &cfg.mcp_servers {
            let svc = match entry {
                McpServerEntry::Stdio { command, args, env } => {
                    let mut cmd = Command::new(command);
                    cmd.args(args.iter().map(|a| expand_env_placeholders(a)));
                    cmd.envs(expand_env_map(env));

                    let transport = TokioChildProcess::new(cmd)
                        .with_context(|| format!("failed to spawn MCP server '{name}'"))?;
                    ().into_dyn()
                        .serve(transport)
                        .await
                        .with_context(|| format!("failed to connect stdio MCP server '{name}'"))?
                }
                McpServerEntry::RemoteHttp { url } => {
                    // Expanded URLs may carry credentials; only the name is logged.
                    let url = expand_env_placeholders(url);
                    url::Url::parse(&url)
                        .with_context(|| format!("invalid url for remote MCP server '{name}'"))?;

                    let transport = StreamableHttpClientTransport::from_uri(url);
                    ().into_dyn()
                        .serve(transport)
                        .await
                        .with_context(|| format!("failed to connect remote MCP server '{name}'"))?
                }
            };

            info!(name: "tools.mcp.connected", server = %name, "MCP server connected");
            services.insert(name.clone(), Arc::new(svc));
        }

        let mut all_tools: Vec<(String, Tool)> = Vec::new();
        let mut tool_index: HashMap<String, (String, String)> = HashMap::new();

        for (server_name, svc) in &services {
            let result = svc
                .list_tools(Default::default())
                .await
                .with_context(|| format!("tools/list failed for MCP server '{server_name}'"))?;

            for t in result.tools {
                let tool_name = t.name.to_string();
                let ns_name = sanitize_tool_name(&format!("{server_name}__{tool_name}"));
                tool_index.insert(ns_name.clone(), (server_name.clone(), tool_name));
                all_tools.push((ns_name, t));
            }
        }

        Ok(Self {
            services: Arc::new(services),
            tool_index: Arc::new(tool_index),
            tools: Arc::new(all_tools),
            native_tools: Arc::new(HashMap::new()),
        })
    }

    /// Add a native tool under `native__{name}`.
    pub fn with_native_tool(self, tool: Arc<dyn NativeTool>) -> Self {
        let ns_name = sanitize_tool_name(&format!("native__{}", tool.name()));

        let mut tools = (*self.tools).clone();
        tools.retain(|(n, _)| n != &ns_name);
        tools.push((ns_name.clone(), describe_native(tool.as_ref())));

        let mut native_tools = (*self.native_tools).clone();
        native_tools.insert(ns_name, tool);

        Self {
            services: self.services,
            tool_index: self.tool_index,
            tools: Arc::new(tools),
            native_tools: Arc::new(native_tools),
        }
    }

    /// Namespaced tools as `(namespaced_name, Tool)`.
    pub fn tools(&self) -> &[(String, Tool)] {
        &self.tools
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool list in the OpenAI `tools` request format.
    pub fn openai_tools_json(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|(ns_name, t)| {
                let params = serde_json::to_value(&*t.input_schema)
                    .unwrap_or_else(|_| json!({ "type": "object", "properties": {} }));

                json!({
                    "type": "function",
                    "function": {
                        "name": ns_name,
                        "description": t.description.as_deref().unwrap_or(""),
                        "parameters": params
                    }
                })
            })
            .collect()
    }

    /// Execute a namespaced tool, e.g. `native__calculate` or `lab__get_time`.
    ///
    /// MCP results are reduced to their text content when they have any.
    pub async fn call_namespaced_tool(&self, namespaced_tool: &str, arguments: Value) -> anyhow::Result<Value> {
        if let Some(tool) = self.native_tools.get(namespaced_tool) {
            return tool.call(arguments).await;
        }

        let (server_name, raw_tool_name) = self
            .tool_index
            .get(namespaced_tool)
            .ok_or_else(|| anyhow!("unknown tool: {namespaced_tool}"))?
            .clone();

        let service = self
            .services
            .get(&server_name)
            .ok_or_else(|| anyhow!("missing server handle: {server_name}"))?;

        let res = service
            .call_tool(CallToolRequestParam {
                name: raw_tool_name.clone().into(),
                arguments: arguments.as_object().cloned(),
            })
            .await
            .with_context(|| format!("tools/call failed for {server_name}::{raw_tool_name}"))?;

        Ok(text_content(serde_json::to_value(res)?))
    }
}

/// Restrict a tool name to `[A-Za-z0-9_-]`.
pub fn sanitize_tool_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// MCP `Tool` description of a native tool.
pub fn describe_native(tool: &dyn NativeTool) -> Tool {
    Tool {
        name: tool.name().to_string().into(),
        description: Some(tool.description().to_string().into()),
        input_schema: Arc::new(tool.schema().as_object().cloned().unwrap_or_default()),
        title: None,
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

/// Join the text items of a `CallToolResult`, or return it unchanged.
fn text_content(result: Value) -> Value {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|c| c.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|c| c.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        result
    } else {
        Value::String(texts.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin;

    #[test]
    fn test_sanitize_tool_name() {
        assert_eq!(sanitize_tool_name("lab.tools__get:time"), "lab_tools__get_time");
        assert_eq!(sanitize_tool_name("ok-name_1"), "ok-name_1");
    }

    #[test]
    fn test_native_tools_are_namespaced() {
        let registry = ToolRegistry::with_native_tools(builtin::mcp_tools());
        let names: Vec<_> = registry.tools().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["native__get_time", "native__get_system_info", "native__calculate"]
        );

        let schema = registry.openai_tools_json();
        assert_eq!(schema[2]["function"]["name"], "native__calculate");
        assert_eq!(
            schema[2]["function"]["parameters"]["required"][0],
            "expression"
        );
    }

    #[test]
    fn test_re_adding_a_native_tool_replaces_it() {
        let registry = ToolRegistry::new()
            .with_native_tool(Arc::new(builtin::Calculator))
            .with_native_tool(Arc::new(builtin::Calculator));
        assert_eq!(registry.tools().len(), 1);
    }

    #[tokio::test]
    async fn test_call_native_and_unknown() {
        let registry = ToolRegistry::with_native_tools(builtin::agent_tools());
        let out = registry
            .call_namespaced_tool("native__calculate", json!({ "expression": "2 + 2" }))
            .await
            .unwrap();
        assert_eq!(out, json!("2 + 2 = 4"));

        let err = registry
            .call_namespaced_tool("nope__tool", json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn test_text_content_extraction() {
        let result = json!({
            "content": [
                { "type": "text", "text": "line one" },
                { "type": "image", "data": "..." },
                { "type": "text", "text": "line two" }
            ],
            "isError": false
        });
        assert_eq!(text_content(result), json!("line one\nline two"));

        let structured = json!({ "content": [], "structuredContent": { "x": 1 } });
        assert_eq!(text_content(structured.clone()), structured);
    }
}

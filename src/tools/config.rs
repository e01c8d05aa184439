//! `mcp.json` loading.
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "lab": { "command": "lab-tools-mcp" },
//!     "remote": { "url": "https://tools.example.com/mcp?key=${TOOLS_KEY}" }
//!   }
//! }
//! ```

use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: HashMap<String, McpServerEntry>,
}

/// How to reach one MCP server.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum McpServerEntry {
    /// Child process speaking MCP over stdio.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Streamable HTTP endpoint.
    RemoteHttp { url: String },
}

pub fn load_mcp_config(path: impl AsRef<Path>) -> anyhow::Result<McpConfig> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read MCP config {}", path.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("invalid MCP config {}", path.display()))
}

/// Replace `${NAME}` with the value of environment variable `NAME`.
/// Unknown variables are left as written.
pub fn expand_env_placeholders(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn expand_env_map(map: &HashMap<String, String>) -> HashMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.clone(), expand_env_placeholders(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "KEY" => Some("s3cret".into()),
            "HOST" => Some("tools.local".into()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_placeholders() {
        assert_eq!(
            expand_with("https://${HOST}/mcp?key=${KEY}", lookup),
            "https://tools.local/mcp?key=s3cret"
        );
        assert_eq!(expand_with("${MISSING}-x", lookup), "${MISSING}-x");
        assert_eq!(expand_with("dangling ${KEY", lookup), "dangling ${KEY");
        assert_eq!(expand_with("plain", lookup), "plain");
    }

    #[test]
    fn test_parse_entries() {
        let cfg: McpConfig = serde_json::from_str(
            r#"{
                "mcpServers": {
                    "lab": { "command": "lab-tools-mcp", "args": ["--quiet"] },
                    "remote": { "url": "http://localhost:8931/mcp" }
                }
            }"#,
        )
        .unwrap();

        assert!(matches!(
            cfg.mcp_servers["lab"],
            McpServerEntry::Stdio { ref command, .. } if command == "lab-tools-mcp"
        ));
        assert!(matches!(cfg.mcp_servers["remote"], McpServerEntry::RemoteHttp { .. }));
    }
}

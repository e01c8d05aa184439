//! `get_system_info` tool

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::NativeTool;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInfo;

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

impl SystemInfo {
    pub fn report() -> String {
        [
            ("os", std::env::consts::OS.to_string()),
            ("machine", std::env::consts::ARCH.to_string()),
            ("agent_lab", env!("CARGO_PKG_VERSION").to_string()),
            ("hostname", hostname()),
        ]
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[async_trait]
impl NativeTool for SystemInfo {
    fn name(&self) -> &str {
        "get_system_info"
    }

    fn description(&self) -> &str {
        "Get system information (OS, machine, version, hostname)"
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        Ok(Value::String(Self::report()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines() {
        let report = SystemInfo::report();
        let keys: Vec<_> = report
            .lines()
            .map(|l| l.split(':').next().unwrap())
            .collect();
        assert_eq!(keys, vec!["os", "machine", "agent_lab", "hostname"]);
        assert!(report.contains(std::env::consts::OS));
    }
}

use crate::a2a::types::{AgentCapabilities, AgentCard, AgentProvider, AgentSkill, PROTOCOL_VERSION};
use crate::tools::ToolRegistry;

pub const AGENT_DESCRIPTION: &str = "An agent with calculator and time tools";
pub const PROVIDER_ORGANIZATION: &str = "Jfokus Lab";
pub const PROVIDER_URL: &str = "https://jfokus.se";

/// Card advertising one skill per tool in `tools`.
pub fn build_card(name: &str, public_url: &str, tools: &ToolRegistry) -> AgentCard {
    let skills = tools
        .tools()
        .iter()
        .map(|(ns_name, tool)| AgentSkill {
            id: ns_name.clone(),
            name: tool.name.to_string(),
            description: tool
                .description
                .as_deref()
                .unwrap_or_default()
                .to_string(),
            tags: vec!["tool".to_string()],
        })
        .collect();

    AgentCard {
        name: name.to_string(),
        description: AGENT_DESCRIPTION.to_string(),
        url: public_url.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: Some(PROTOCOL_VERSION.to_string()),
        provider: Some(AgentProvider {
            organization: PROVIDER_ORGANIZATION.to_string(),
            url: PROVIDER_URL.to_string(),
        }),
        capabilities: AgentCapabilities {
            streaming: false,
            push_notifications: false,
        },
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        skills,
        extra: serde_json::Map::new(),
    }
}

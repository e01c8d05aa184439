//! Tools shipped with the lab agents.

mod calculator;
mod clock;
mod system;

use std::sync::Arc;

pub use calculator::Calculator;
pub use clock::Clock;
pub use system::SystemInfo;

use super::NativeTool;

/// Tools of the A2A tool agent: `calculate` and `get_time`.
pub fn agent_tools() -> Vec<Arc<dyn NativeTool>> {
    vec![Arc::new(Calculator), Arc::new(Clock::default())]
}

/// Tools served by the MCP server. Its `get_time` includes the weekday.
pub fn mcp_tools() -> Vec<Arc<dyn NativeTool>> {
    vec![
        Arc::new(Clock::with_weekday()),
        Arc::new(SystemInfo),
        Arc::new(Calculator),
    ]
}

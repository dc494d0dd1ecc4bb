//! Output parsers for different agent tools

use serde_json::Value;

use harbor_core::AgentEvent;

use crate::agent::AgentType;

pub mod amp;
pub mod claude;

/// Trait for normalizing agent output
///
/// Input is one decoded line of the tool's native streaming protocol; line
/// decoding is the runner's job. Lines with no unified representation yield
/// `None` and are dropped by the caller. Parsing is pure: the same input
/// always yields the same event.
pub trait OutputParser: Send + Sync {
    fn parse(&self, raw: &Value) -> Option<AgentEvent>;
}

/// Create a parser for the given agent type
pub fn create_parser(agent_type: AgentType) -> Box<dyn OutputParser> {
    match agent_type {
        AgentType::ClaudeCode => Box::new(claude::ClaudeParser::new()),
        AgentType::Amp => Box::new(amp::AmpParser::new()),
    }
}

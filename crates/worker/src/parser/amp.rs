//! Parser for Amp output
//!
//! Amp is a recognized tool but its streaming format is not mapped yet;
//! every line is dropped.

use serde_json::Value;

use harbor_core::AgentEvent;

use super::OutputParser;

pub struct AmpParser;

impl AmpParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser for AmpParser {
    // TODO: map amp's stream output once its format stabilizes.
    fn parse(&self, _raw: &Value) -> Option<AgentEvent> {
        None
    }
}

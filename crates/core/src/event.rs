//! Unified agent event schema
//!
//! Every tool's streaming output is normalized into this variant set before
//! it is published. Events are transient: they are relayed on the project
//! channel but never stored as their own entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token accounting reported by the agent.
///
/// Stays at zero when the tool does not report usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Events emitted while a task executes.
///
/// `text` content is accumulated into the persisted assistant message.
/// `task_complete` and `task_error` mark end-of-stream for consumers; partial
/// output published before a failure is never retracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Execution is about to start streaming.
    TaskStart { tool: String },

    /// A fragment of assistant text.
    Text { content: String },

    /// A text content block opened.
    TextStart,

    /// The agent started a tool call.
    ToolUseStart {
        tool: Option<String>,
        id: Option<String>,
    },

    /// Partial JSON input for an in-flight tool call.
    ToolUseInput { partial_json: String },

    /// Result of a completed tool call.
    ToolResult {
        id: Option<String>,
        content: String,
    },

    /// A content block closed.
    ContentBlockStop { index: Option<u64> },

    /// A new assistant message opened.
    MessageStart,

    /// Message metadata update.
    MessageDelta {
        stop_reason: Option<String>,
        usage: Usage,
    },

    /// The assistant message closed.
    MessageStop,

    /// Final result line with session info.
    Result {
        session_id: Option<String>,
        cost_usd: Option<f64>,
        duration_ms: Option<u64>,
        num_turns: Option<u64>,
    },

    /// The subprocess exited cleanly; `return_code` may still be non-zero.
    TaskComplete {
        return_code: i32,
        session_id: Option<String>,
    },

    /// Execution aborted (spawn failure, timeout, cancellation, storage error).
    TaskError { error: String },
}

impl AgentEvent {
    /// End-of-stream markers for channel consumers.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TaskComplete { .. } | Self::TaskError { .. })
    }
}

/// Wire envelope published on a project channel.
///
/// Consumers demultiplex interleaved tasks by `task_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub task_id: Uuid,
    pub event: AgentEvent,
}

impl EventEnvelope {
    pub fn new(task_id: Uuid, event: AgentEvent) -> Self {
        Self { task_id, event }
    }
}

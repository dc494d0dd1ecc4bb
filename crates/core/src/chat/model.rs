//! Chat model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message role in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Tool call information attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInfo {
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// Execution metadata attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
}

/// One turn of a conversation, append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub project_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallInfo>,
    #[serde(default)]
    pub metadata: MessageMetadata,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new user message
    pub fn user(session_id: Uuid, project_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            project_id,
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            metadata: MessageMetadata::default(),
            created_at: Utc::now(),
        }
    }

    /// Create a new assistant message carrying exit metadata
    pub fn assistant(
        session_id: Uuid,
        project_id: Uuid,
        content: impl Into<String>,
        return_code: Option<i32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            project_id,
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            metadata: MessageMetadata { return_code },
            created_at: Utc::now(),
        }
    }
}

/// A conversation thread.
///
/// Created by the submitting service; the worker only updates the resume
/// token after a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Tool-reported token for resuming this conversation context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create a new session
    pub fn new(id: Uuid, project_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            project_id,
            agent_session_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

//! Core library for CodeHarbor
//!
//! Shared between the agent worker and the API server:
//! - Task payloads and durable status records
//! - Chat session and message documents
//! - The unified agent event schema published to clients
//! - Queue and pub/sub abstractions

pub mod bus;
pub mod chat;
pub mod error;
pub mod event;
pub mod queue;
pub mod task;

pub use bus::{project_channel, EventBus, ProjectBus};
pub use chat::{ChatMessage, ChatSession, ChatStore, MessageRole, ToolCallInfo};
pub use error::Error;
pub use event::{AgentEvent, EventEnvelope, Usage};
pub use queue::{ChannelQueue, TaskQueue};
pub use task::{Task, TaskRecord, TaskResult, TaskStatus, TaskStore};

pub type Result<T> = std::result::Result<T, Error>;

//! Chat sessions and messages

pub mod model;
pub mod store;

pub use model::{ChatMessage, ChatSession, MessageMetadata, MessageRole, ToolCallInfo};
pub use store::ChatStore;

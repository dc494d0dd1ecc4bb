//! Agent worker - executes queued coding-agent tasks
//!
//! The worker pops tasks from the work queue, spawns the selected agent tool
//! as a subprocess, normalizes its streamed output into the unified event
//! schema, relays the events on the project channel, and persists the
//! resulting chat message, resume token, and task status.

mod agent;
mod error;
mod parser;
mod runner;
mod worker;

pub use agent::AgentType;
pub use error::{Result, WorkerError};
pub use parser::{create_parser, OutputParser};
pub use runner::{RunnerConfig, TaskRunner};
pub use worker::Worker;

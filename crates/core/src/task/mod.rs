//! Task payloads and durable status records

pub mod model;
pub mod store;

pub use model::{Task, TaskRecord, TaskResult, TaskStatus};
pub use store::TaskStore;

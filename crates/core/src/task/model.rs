//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Usage;

/// Lifecycle of a queued task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Check if the status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Queued
    }
}

fn default_tool() -> String {
    "claude".to_string()
}

/// A unit of work submitted to the agent queue.
///
/// Immutable once enqueued. Delivery is at-least-once, so everything the
/// worker does with a task must tolerate seeing the same id twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub session_id: Uuid,
    pub prompt: String,
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Decrypted credential staged for the agent. Never logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_system_prompt: Option<String>,
    /// Resume token from a previous run of the same chat session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<String>,
}

impl Task {
    /// Create a new task with the default tool
    pub fn new(project_id: Uuid, session_id: Uuid, prompt: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            project_id,
            session_id,
            prompt: prompt.into(),
            tool: default_tool(),
            model: None,
            api_key: None,
            allowed_tools: Vec::new(),
            append_system_prompt: None,
            agent_session_id: None,
        }
    }

    /// Set the tool name
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the capability allow-list
    pub fn with_allowed_tools(mut self, allowed_tools: Vec<String>) -> Self {
        self.allowed_tools = allowed_tools;
        self
    }

    /// Set the system-prompt append
    pub fn with_append_system_prompt(mut self, append: impl Into<String>) -> Self {
        self.append_system_prompt = Some(append.into());
        self
    }

    /// Set the resume token
    pub fn with_agent_session(mut self, agent_session_id: impl Into<String>) -> Self {
        self.agent_session_id = Some(agent_session_id.into());
        self
    }
}

/// Structured outcome of a finished task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub return_code: i32,
}

/// Durable status record for one task, keyed by task id.
///
/// Created by the submitting service at enqueue time; mutated exclusively by
/// the worker afterwards. The worker never deletes records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub session_id: Uuid,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

impl TaskRecord {
    /// Create a queued record for a task
    pub fn queued(task: &Task) -> Self {
        Self {
            task_id: task.task_id,
            project_id: task.project_id,
            session_id: task.session_id,
            status: TaskStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            usage: Usage::default(),
        }
    }

    /// Mark the task as running
    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the task as finished with an exit code
    pub fn mark_completed(&mut self, return_code: i32) {
        self.completed_at = Some(Utc::now());
        self.result = Some(TaskResult { return_code });
        self.status = if return_code == 0 {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
    }

    /// Mark the task as failed with an error message
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        self.status = TaskStatus::Failed;
    }

    /// Check if the record is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_task() {
        let project_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let task = Task::new(project_id, session_id, "list files");

        assert!(!task.task_id.is_nil());
        assert_eq!(task.project_id, project_id);
        assert_eq!(task.tool, "claude");
        assert!(task.api_key.is_none());
        assert!(task.allowed_tools.is_empty());
    }

    #[test]
    fn test_task_payload_defaults() {
        // A minimal payload from the submitting service decodes with defaults.
        let payload = format!(
            r#"{{"task_id":"{}","project_id":"{}","session_id":"{}","prompt":"hi"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let task: Task = serde_json::from_str(&payload).unwrap();
        assert_eq!(task.tool, "claude");
        assert!(task.model.is_none());
        assert!(task.agent_session_id.is_none());
    }

    #[test]
    fn test_record_lifecycle() {
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");
        let mut record = TaskRecord::queued(&task);
        assert_eq!(record.status, TaskStatus::Queued);
        assert!(record.started_at.is_none());

        record.mark_running();
        assert_eq!(record.status, TaskStatus::Running);
        assert!(record.started_at.is_some());

        record.mark_completed(0);
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result, Some(TaskResult { return_code: 0 }));
        assert!(record.completed_at.is_some());
        assert!(record.is_terminal());
    }

    #[test]
    fn test_record_nonzero_exit_is_failed() {
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");
        let mut record = TaskRecord::queued(&task);
        record.mark_running();
        record.mark_completed(1);
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.result, Some(TaskResult { return_code: 1 }));
    }

    #[test]
    fn test_record_failure() {
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");
        let mut record = TaskRecord::queued(&task);
        record.mark_running();
        record.mark_failed("something went wrong");
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error, Some("something went wrong".to_string()));
    }
}

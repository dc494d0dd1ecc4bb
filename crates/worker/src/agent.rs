//! Agent tool definitions
//!
//! Each supported tool is a closed variant carrying its own invocation and
//! credential-staging behavior, so a typo in a task payload fails loudly at
//! dispatch instead of routing to a no-op.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use harbor_core::Task;

use crate::error::{Result, WorkerError};

/// Supported agent tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    ClaudeCode,
    Amp,
}

impl AgentType {
    /// Parse agent type from a task's tool name
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "claude" | "claude-code" | "claudecode" => Ok(Self::ClaudeCode),
            "amp" => Ok(Self::Amp),
            _ => Err(WorkerError::InvalidAgentType {
                agent_type: s.to_string(),
            }),
        }
    }

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude",
            Self::Amp => "amp",
        }
    }

    /// Get the command to run this agent
    pub fn command(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude",
            Self::Amp => "amp",
        }
    }

    /// Environment variable the credential is exported through
    pub fn credential_env(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "ANTHROPIC_API_KEY",
            Self::Amp => "AMP_API_KEY",
        }
    }

    /// Build the argument list for one task invocation.
    ///
    /// Optional flags are omitted when the task does not carry the value.
    pub fn build_args(&self, task: &Task) -> Vec<String> {
        match self {
            Self::ClaudeCode => {
                let mut args = vec![
                    "-p".to_string(),
                    task.prompt.clone(),
                    "--output-format".to_string(),
                    "stream-json".to_string(),
                    "--verbose".to_string(),
                    "--dangerously-skip-permissions".to_string(),
                ];

                if !task.allowed_tools.is_empty() {
                    args.push("--allowedTools".to_string());
                    args.push(task.allowed_tools.join(","));
                }
                if let Some(model) = &task.model {
                    args.push("--model".to_string());
                    args.push(model.clone());
                }
                if let Some(append) = &task.append_system_prompt {
                    args.push("--append-system-prompt".to_string());
                    args.push(append.clone());
                }
                if let Some(resume) = &task.agent_session_id {
                    args.push("--resume".to_string());
                    args.push(resume.clone());
                }

                args
            }
            Self::Amp => {
                // Amp output is not parsed yet; keep the invocation minimal.
                vec![
                    "--execute".to_string(),
                    task.prompt.clone(),
                    "--stream-json".to_string(),
                ]
            }
        }
    }

    /// Stage credential helper files inside the isolated home directory.
    ///
    /// The helper script keeps the secret off the command line, where it
    /// would leak via process listings; the tool config file points at it.
    /// Writes fully rewrite each file, so concurrent workers staging the
    /// same project do not corrupt one another.
    pub async fn stage_credentials(&self, home_dir: &Path, api_key: &str) -> Result<()> {
        match self {
            Self::ClaudeCode => {
                let claude_dir = home_dir.join(".claude");
                fs::create_dir_all(&claude_dir).await?;

                let key_script = claude_dir.join("anthropic_key.sh");
                fs::write(&key_script, format!("#!/bin/sh\necho '{}'\n", api_key)).await?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(&key_script, std::fs::Permissions::from_mode(0o700))
                        .await?;
                }

                let settings = serde_json::json!({
                    "apiKeyHelper": key_script.to_string_lossy(),
                });
                fs::write(claude_dir.join("settings.json"), settings.to_string()).await?;
            }
            // Amp reads its credential from the environment only.
            Self::Amp => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_agent_type_from_str() {
        assert_eq!(AgentType::from_str("claude").unwrap(), AgentType::ClaudeCode);
        assert_eq!(
            AgentType::from_str("claude-code").unwrap(),
            AgentType::ClaudeCode
        );
        assert_eq!(AgentType::from_str("amp").unwrap(), AgentType::Amp);
        assert!(AgentType::from_str("cursor").is_err());
    }

    #[test]
    fn test_build_args_minimal() {
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "list files");
        let args = AgentType::ClaudeCode.build_args(&task);

        assert_eq!(args[0], "-p");
        assert_eq!(args[1], "list files");
        assert!(args.contains(&"--output-format".to_string()));
        assert!(args.contains(&"stream-json".to_string()));
        assert!(args.contains(&"--dangerously-skip-permissions".to_string()));
        assert!(!args.contains(&"--model".to_string()));
        assert!(!args.contains(&"--allowedTools".to_string()));
        assert!(!args.contains(&"--resume".to_string()));
    }

    #[test]
    fn test_build_args_full() {
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "fix the bug")
            .with_model("sonnet")
            .with_allowed_tools(vec!["Bash".to_string(), "Edit".to_string()])
            .with_append_system_prompt("be terse")
            .with_agent_session("abc123");
        let args = AgentType::ClaudeCode.build_args(&task);

        let tools_at = args.iter().position(|a| a == "--allowedTools").unwrap();
        assert_eq!(args[tools_at + 1], "Bash,Edit");
        let model_at = args.iter().position(|a| a == "--model").unwrap();
        assert_eq!(args[model_at + 1], "sonnet");
        let resume_at = args.iter().position(|a| a == "--resume").unwrap();
        assert_eq!(args[resume_at + 1], "abc123");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stage_credentials_writes_helper() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        AgentType::ClaudeCode
            .stage_credentials(temp.path(), "sk-test")
            .await
            .unwrap();

        let key_script = temp.path().join(".claude").join("anthropic_key.sh");
        let body = std::fs::read_to_string(&key_script).unwrap();
        assert!(body.contains("echo 'sk-test'"));

        let mode = std::fs::metadata(&key_script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);

        let settings: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join(".claude").join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            settings["apiKeyHelper"],
            key_script.to_string_lossy().as_ref()
        );
    }

    #[tokio::test]
    async fn test_stage_credentials_amp_is_env_only() {
        let temp = tempfile::TempDir::new().unwrap();
        AgentType::Amp
            .stage_credentials(temp.path(), "sk-test")
            .await
            .unwrap();
        assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
    }
}

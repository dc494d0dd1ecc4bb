//! Task runner: executes exactly one task end-to-end
//!
//! Stages directories and credentials, spawns the agent subprocess, relays
//! its normalized output on the project channel, and persists the final chat
//! message, resume token, and task status. Every per-task failure is
//! converted into a `failed` status plus a `task_error` event; nothing here
//! may crash the worker loop.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use harbor_core::{
    AgentEvent, ChatMessage, ChatStore, EventBus, EventEnvelope, Task, TaskStore, Usage,
};

use crate::agent::AgentType;
use crate::error::{Result, WorkerError};
use crate::parser::create_parser;

/// Upper bound on captured stderr, used only for diagnostics.
const STDERR_CAPTURE_BYTES: u64 = 8 * 1024;

/// Configuration for the task runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Root directory holding per-project working and home directories
    pub projects_dir: PathBuf,
    /// Maximum execution time in seconds (0 = no timeout)
    pub timeout_seconds: u64,
    /// Override the agent binary (tests and dev setups)
    pub command_override: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from("/data/projects"),
            timeout_seconds: 0,
            command_override: None,
        }
    }
}

/// Executes queued tasks, one at a time
pub struct TaskRunner {
    config: RunnerConfig,
    tasks: TaskStore,
    chats: ChatStore,
    bus: Arc<dyn EventBus>,
    shutdown: CancellationToken,
}

/// Accumulated state from one subprocess stream
struct StreamState {
    transcript: String,
    resume_session_id: Option<String>,
    usage: Usage,
}

impl StreamState {
    fn new() -> Self {
        Self {
            transcript: String::new(),
            resume_session_id: None,
            usage: Usage::default(),
        }
    }
}

impl TaskRunner {
    /// Create a new task runner
    pub fn new(
        config: RunnerConfig,
        tasks: TaskStore,
        chats: ChatStore,
        bus: Arc<dyn EventBus>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            tasks,
            chats,
            bus,
            shutdown,
        }
    }

    /// Execute one task end-to-end.
    ///
    /// Returns `Err` only when the initial status transition cannot be read
    /// or written at all; every later failure lands in the task's own
    /// `failed` status and `task_error` event.
    pub async fn execute(&self, task: &Task, agent_type: AgentType) -> Result<()> {
        // At-least-once delivery: a task that already reached a terminal
        // state must not re-spawn the subprocess or write a second message.
        if self.tasks.try_mark_running(task)?.is_none() {
            info!(
                "Task {} already in a terminal state, skipping duplicate delivery",
                task.task_id
            );
            return Ok(());
        }

        self.publish(
            task,
            AgentEvent::TaskStart {
                tool: agent_type.as_str().to_string(),
            },
        )
        .await;

        let mut state = StreamState::new();
        let outcome = self.run_task(task, agent_type, &mut state).await;

        match outcome {
            Ok(return_code) => match self.persist_completion(task, return_code, &state) {
                Ok(()) => {
                    self.publish(
                        task,
                        AgentEvent::TaskComplete {
                            return_code,
                            session_id: state.resume_session_id.clone(),
                        },
                    )
                    .await;
                    info!("Task {} finished with exit code {}", task.task_id, return_code);
                }
                Err(e) => {
                    warn!(
                        "Failed to persist completion for task {}: {}",
                        task.task_id, e
                    );
                    if let Err(store_err) = self.tasks.finish_failed(task.task_id, e.to_string()) {
                        warn!("Failed to mark task {} failed: {}", task.task_id, store_err);
                    }
                    self.publish(task, AgentEvent::TaskError { error: e.to_string() })
                        .await;
                }
            },
            Err(e) => {
                warn!("Error running task {}: {}", task.task_id, e);

                // Best-effort message so a partial transcript survives.
                let message = ChatMessage::assistant(
                    task.session_id,
                    task.project_id,
                    state.transcript.clone(),
                    None,
                );
                if let Err(store_err) = self.chats.append_message(&message) {
                    warn!(
                        "Failed to store message for task {}: {}",
                        task.task_id, store_err
                    );
                }
                if let Err(store_err) = self.tasks.finish_failed(task.task_id, e.to_string()) {
                    warn!("Failed to mark task {} failed: {}", task.task_id, store_err);
                }
                self.publish(task, AgentEvent::TaskError { error: e.to_string() })
                    .await;
            }
        }

        Ok(())
    }

    /// Stage, spawn, and stream the subprocess, racing shutdown and the
    /// configured deadline.
    async fn run_task(
        &self,
        task: &Task,
        agent_type: AgentType,
        state: &mut StreamState,
    ) -> Result<i32> {
        let project_root = self.config.projects_dir.join(task.project_id.to_string());
        let project_dir = project_root.join("staging");
        let home_dir = project_root.join(".home");

        tokio::fs::create_dir_all(&project_dir).await?;
        tokio::fs::create_dir_all(&home_dir).await?;

        if let Some(api_key) = &task.api_key {
            agent_type.stage_credentials(&home_dir, api_key).await?;
        }

        let program = self
            .config
            .command_override
            .clone()
            .unwrap_or_else(|| PathBuf::from(agent_type.command()));

        let mut cmd = Command::new(&program);
        cmd.args(agent_type.build_args(task))
            .current_dir(&project_dir)
            .env("HOME", &home_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(api_key) = &task.api_key {
            cmd.env(agent_type.credential_env(), api_key);
        }

        info!(
            "Starting {} for task {} in {:?}",
            agent_type.as_str(),
            task.task_id,
            project_dir
        );

        let mut child = cmd.spawn().map_err(|e| {
            WorkerError::spawn_failed_with_source(
                format!("Failed to spawn {}: {}", program.display(), e),
                e,
            )
        })?;

        let timeout_seconds = self.config.timeout_seconds;
        let outcome = {
            let drive = self.drive(&mut child, task, agent_type, state);
            tokio::pin!(drive);
            tokio::select! {
                result = &mut drive => result,
                _ = self.shutdown.cancelled() => Err(WorkerError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(timeout_seconds)),
                        if timeout_seconds > 0 => {
                    Err(WorkerError::Timeout {
                        seconds: timeout_seconds,
                    })
                }
            }
        };

        if outcome.is_err() {
            // Timeout/cancellation leaves the subprocess running; stop it.
            if let Err(kill_err) = child.kill().await {
                warn!("Failed to kill agent process: {}", kill_err);
            }
        }

        outcome
    }

    /// Consume the line stream, publish normalized events, then drain stderr
    /// and wait for exit.
    async fn drive(
        &self,
        child: &mut Child,
        task: &Task,
        agent_type: AgentType,
        state: &mut StreamState,
    ) -> Result<i32> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::spawn_failed("Failed to capture stdout"))?;

        let parser = create_parser(agent_type);
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let raw: serde_json::Value = match serde_json::from_str(line) {
                Ok(raw) => raw,
                Err(_) => {
                    debug!(
                        "Non-JSON line: {}",
                        line.chars().take(100).collect::<String>()
                    );
                    continue;
                }
            };

            let Some(event) = parser.parse(&raw) else {
                continue;
            };

            match &event {
                AgentEvent::Text { content } => state.transcript.push_str(content),
                AgentEvent::Result { session_id, .. } => {
                    if let Some(session_id) = session_id {
                        state.resume_session_id = Some(session_id.clone());
                    }
                }
                AgentEvent::MessageDelta { usage, .. } => state.usage = usage.clone(),
                _ => {}
            }

            self.publish(task, event).await;
        }

        // Bounded stderr capture, diagnostics only.
        if let Some(stderr) = child.stderr.take() {
            let mut captured = Vec::new();
            if let Err(e) = stderr
                .take(STDERR_CAPTURE_BYTES)
                .read_to_end(&mut captured)
                .await
            {
                debug!("Failed to read agent stderr: {}", e);
            }
            if !captured.is_empty() {
                debug!("Agent stderr: {}", String::from_utf8_lossy(&captured));
            }
        }

        let status = child.wait().await?;
        let return_code = status.code().unwrap_or(-1);
        info!(
            "Agent process for task {} exited with code {}",
            task.task_id, return_code
        );
        Ok(return_code)
    }

    /// Steps that follow a clean subprocess exit: the assistant message, the
    /// session resume token, and the terminal status.
    fn persist_completion(&self, task: &Task, return_code: i32, state: &StreamState) -> Result<()> {
        let message = ChatMessage::assistant(
            task.session_id,
            task.project_id,
            state.transcript.clone(),
            Some(return_code),
        );
        self.chats.append_message(&message)?;

        if let Some(token) = &state.resume_session_id {
            self.chats
                .set_agent_session(task.session_id, task.project_id, token.clone())?;
        }

        self.tasks
            .finish_completed(task.task_id, return_code, state.usage.clone())?;
        Ok(())
    }

    /// Publish an event on the task's project channel, tagged with the task
    /// id. Publish failures are logged; they never fail the task.
    async fn publish(&self, task: &Task, event: AgentEvent) {
        let envelope = EventEnvelope::new(task.task_id, event);
        if let Err(e) = self.bus.publish(task.project_id, &envelope).await {
            warn!("Failed to publish event for task {}: {}", task.task_id, e);
        }
    }
}

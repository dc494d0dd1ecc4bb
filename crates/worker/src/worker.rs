//! Worker main loop: consumes agent tasks from the work queue

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use harbor_core::{Task, TaskQueue};

use crate::agent::AgentType;
use crate::runner::TaskRunner;

/// Bounded dequeue wait, also how often an idle worker observes shutdown.
const POP_TIMEOUT: Duration = Duration::from_secs(5);
/// Backoff after a queue transport failure.
const RETRY_DELAY: Duration = Duration::from_secs(5);
/// Pause after an unexpected per-task error.
const ERROR_DELAY: Duration = Duration::from_secs(1);

/// Pulls tasks from the queue and hands each to the runner.
///
/// One task at a time; horizontal scale comes from running more worker
/// instances against the same queue. The loop holds no per-task state, all
/// durability lives in the task status records.
pub struct Worker {
    queue: Arc<dyn TaskQueue>,
    runner: TaskRunner,
    shutdown: CancellationToken,
}

impl Worker {
    /// Create a new worker
    pub fn new(queue: Arc<dyn TaskQueue>, runner: TaskRunner, shutdown: CancellationToken) -> Self {
        Self {
            queue,
            runner,
            shutdown,
        }
    }

    /// Run until the shutdown token fires.
    ///
    /// The loop never exits on its own: transport failures back off and
    /// retry, per-task errors are logged and skipped. The task in flight
    /// when shutdown arrives is interrupted by the runner's own race on the
    /// same token.
    pub async fn run(&self) {
        info!("Worker starting");

        loop {
            let popped = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                popped = self.queue.pop(POP_TIMEOUT) => popped,
            };

            match popped {
                Ok(Some(payload)) => self.process(payload).await,
                Ok(None) => continue,
                Err(e) => {
                    error!(
                        "Lost queue connection, retrying in {}s: {}",
                        RETRY_DELAY.as_secs(),
                        e
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }

        info!("Worker shut down cleanly");
    }

    async fn process(&self, payload: String) {
        let task: Task = match serde_json::from_str(&payload) {
            Ok(task) => task,
            Err(e) => {
                warn!("Dropping malformed task payload: {}", e);
                return;
            }
        };

        info!(
            "Received task {} for project {}",
            task.task_id, task.project_id
        );

        let agent_type = match AgentType::from_str(&task.tool) {
            Ok(agent_type) => agent_type,
            Err(_) => {
                warn!("Unknown tool: {}, skipping task", task.tool);
                return;
            }
        };

        if let Err(e) = self.runner.execute(&task, agent_type).await {
            error!("Error processing task {}: {}", task.task_id, e);
            tokio::time::sleep(ERROR_DELAY).await;
        }
    }
}

//! Worker entry point
//!
//! Consumes agent tasks from the work queue and executes them one at a
//! time. The API server (a separate service) enqueues task payloads and
//! subscribes to the event bus; this binary owns the worker side of that
//! contract.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_worker::{RunnerConfig, TaskRunner, Worker};
use harbor_core::{ChannelQueue, ChatStore, EventBus, ProjectBus, TaskQueue, TaskStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_worker=info,harbor_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = std::env::var("HARBOR_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".harbor-data"));
    let projects_dir = std::env::var("HARBOR_PROJECTS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/data/projects"));
    let timeout_seconds = std::env::var("HARBOR_TASK_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);

    tracing::info!("CodeHarbor worker starting");
    tracing::info!("Using data directory: {:?}", data_dir);
    tracing::info!("Using projects directory: {:?}", projects_dir);

    let queue: Arc<dyn TaskQueue> = Arc::new(ChannelQueue::new());
    let bus: Arc<dyn EventBus> = Arc::new(ProjectBus::new());
    let shutdown = CancellationToken::new();

    spawn_signal_handler(shutdown.clone());

    let runner = TaskRunner::new(
        RunnerConfig {
            projects_dir,
            timeout_seconds,
            command_override: None,
        },
        TaskStore::new(&data_dir),
        ChatStore::new(&data_dir),
        bus,
        shutdown.clone(),
    );

    let worker = Worker::new(queue, runner, shutdown);
    worker.run().await;

    Ok(())
}

/// Cancel the token on SIGINT or SIGTERM; the task in flight finishes or is
/// interrupted by the runner, then the loop exits.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::info!("Shutdown signal received, finishing current task...");
        shutdown.cancel();
    });
}

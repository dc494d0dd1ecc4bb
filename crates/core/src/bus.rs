//! Per-project event fan-out
//!
//! Every event published during task execution lands on its project's
//! channel as a JSON envelope. The realtime relay subscribes per project and
//! forwards the raw payloads to connected clients without interpretation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::event::EventEnvelope;
use crate::Result;

/// Deterministic channel name for a project's live event stream
pub fn project_channel(project_id: Uuid) -> String {
    format!("project:{}:chat", project_id)
}

/// Publisher side of the realtime relay.
///
/// Publishing with no subscribers must succeed; events are fire-and-forget.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, project_id: Uuid, envelope: &EventEnvelope) -> Result<()>;
}

const CHANNEL_CAPACITY: usize = 256;

/// In-process bus with one broadcast channel per project.
///
/// Subscribers receive the serialized envelope; slow subscribers lag and drop
/// rather than block the publisher.
pub struct ProjectBus {
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
}

impl ProjectBus {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a project's channel
    pub async fn subscribe(&self, project_id: Uuid) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write().await;
        channels
            .entry(project_channel(project_id))
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

impl Default for ProjectBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for ProjectBus {
    async fn publish(&self, project_id: Uuid, envelope: &EventEnvelope) -> Result<()> {
        let payload = serde_json::to_string(envelope)?;
        let name = project_channel(project_id);

        let sender = {
            let channels = self.channels.read().await;
            channels.get(&name).cloned()
        };
        let sender = match sender {
            Some(sender) => sender,
            None => {
                let mut channels = self.channels.write().await;
                channels
                    .entry(name)
                    .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                    .clone()
            }
        };

        // No live receivers is not an error.
        let _ = sender.send(payload);
        Ok(())
    }
}

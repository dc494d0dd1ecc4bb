//! Work queue abstraction
//!
//! Payloads travel as raw JSON strings; decoding happens at the worker
//! boundary so malformed submissions are rejected before dispatch, not at
//! point of use.

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// At-least-once work queue with a bounded blocking pop.
///
/// The pop is the sole coordination primitive between competing worker
/// instances; implementations must hand each payload to exactly one popper
/// per delivery.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a payload
    async fn push(&self, payload: String) -> Result<()>;

    /// Wait up to `timeout` for a payload; `None` on an idle timeout
    async fn pop(&self, timeout: Duration) -> Result<Option<String>>;
}

/// In-process MPMC queue.
///
/// The receive side is atomic across clones, so multiple workers can compete
/// on one queue the same way they would on an external broker.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    tx: async_channel::Sender<String>,
    rx: async_channel::Receiver<String>,
}

impl ChannelQueue {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }

    /// Number of payloads waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for ChannelQueue {
    async fn push(&self, payload: String) -> Result<()> {
        self.tx
            .send(payload)
            .await
            .map_err(|e| Error::Queue(e.to_string()))
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<String>> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Ok(payload)) => Ok(Some(payload)),
            Ok(Err(_)) => Err(Error::Queue("queue closed".to_string())),
            Err(_) => Ok(None),
        }
    }
}

//! Event Publisher Implementation
//!
//! 同步进度事件的广播实现

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{ProgressPort, SyncEvent};

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<SyncEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.channel.subscribe()
    }
}

impl ProgressPort for EventPublisher {
    fn publish(&self, event: SyncEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish progress event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

//! Dead-letter diversion for targets configured with the dead-letter
//! error strategy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::TargetExecutionError;
use crate::models::FlowMessage;

/// One diverted message
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub flow_id: Uuid,
    pub target: String,
    pub message: FlowMessage,
    pub error: TargetExecutionError,
    pub diverted_at: DateTime<Utc>,
}

/// Destination for messages whose target failed terminally under the
/// dead-letter strategy.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn divert(
        &self,
        flow_id: Uuid,
        target: &str,
        message: &FlowMessage,
        error: &TargetExecutionError,
    );
}

/// In-memory sink; the default, and what tests inspect.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeadLetterSink {
    entries: Arc<Mutex<Vec<DeadLetterEntry>>>,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all diverted entries
    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn divert(
        &self,
        flow_id: Uuid,
        target: &str,
        message: &FlowMessage,
        error: &TargetExecutionError,
    ) {
        self.entries.lock().push(DeadLetterEntry {
            flow_id,
            target: target.to_string(),
            message: message.clone(),
            error: error.clone(),
            diverted_at: Utc::now(),
        });
    }
}

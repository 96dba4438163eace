//! Trace lifecycle management and event fan-out.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::TraceError;

use super::events::{ExecutionTrace, TraceEvent, TraceEventType, TraceStatus};

/// Shared handle to one execution trace.
///
/// The trace is owned by the dispatch invocation that created it; the
/// handle exists so parallel targets within that dispatch can append
/// progress without interleaved corruption. Appends go through the internal
/// lock, reads take a snapshot.
#[derive(Debug, Clone)]
pub struct TraceHandle {
    inner: Arc<Mutex<ExecutionTrace>>,
}

impl TraceHandle {
    fn new(trace: ExecutionTrace) -> Self {
        Self {
            inner: Arc::new(Mutex::new(trace)),
        }
    }

    /// Stable identifier of the underlying trace
    pub fn execution_id(&self) -> Uuid {
        self.inner.lock().execution_id
    }

    /// Current status
    pub fn status(&self) -> TraceStatus {
        self.inner.lock().status
    }

    /// Clone the full trace record
    pub fn snapshot(&self) -> ExecutionTrace {
        self.inner.lock().clone()
    }
}

/// A trace lifecycle event pushed to subscribers
#[derive(Debug, Clone)]
pub struct TraceLifecycleEvent {
    pub execution_id: Uuid,
    pub status: TraceStatus,
    pub event: TraceEvent,
}

/// Creates traces and drives their lifecycle.
///
/// State machine: `Started → Running → {Completed | Failed | Error |
/// Cancelled}`. Terminal states have no outgoing transitions; a second
/// terminal-producing call is rejected with [`TraceError::AlreadyTerminal`].
#[derive(Debug, Clone)]
pub struct ExecutionTraceManager {
    sender: broadcast::Sender<TraceLifecycleEvent>,
}

impl ExecutionTraceManager {
    /// Create a manager with the given broadcast channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to trace lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<TraceLifecycleEvent> {
        self.sender.subscribe()
    }

    /// Start a new trace for one dispatch invocation
    pub fn create(&self, flow_id: Uuid, flow_type: impl Into<String>) -> TraceHandle {
        let mut trace = ExecutionTrace::new(flow_id, flow_type);
        let event = TraceEvent::new(TraceEventType::ExecutionStarted, "Execution started");
        trace.events.push(event.clone());

        debug!(
            execution_id = %trace.execution_id,
            flow_id = %flow_id,
            "Execution trace created"
        );

        let handle = TraceHandle::new(trace);
        self.publish(&handle, event);
        handle
    }

    /// Record step progress. Legal only while the trace is not terminal.
    pub fn update_progress(
        &self,
        handle: &TraceHandle,
        step: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), TraceError> {
        let event = {
            let mut trace = handle.inner.lock();
            if trace.is_terminal() {
                return Err(already_terminal(&trace));
            }
            trace.status = TraceStatus::Running;
            trace.current_step = Some(step.into());
            trace.last_update = chrono::Utc::now();
            let event = TraceEvent::new(TraceEventType::StepProgress, message);
            trace.events.push(event.clone());
            event
        };
        self.publish(handle, event);
        Ok(())
    }

    /// Terminate the trace as completed or failed
    pub fn complete(
        &self,
        handle: &TraceHandle,
        success: bool,
        message: impl Into<String>,
    ) -> Result<(), TraceError> {
        let status = if success {
            TraceStatus::Completed
        } else {
            TraceStatus::Failed
        };
        self.terminate(handle, status, TraceEventType::ExecutionCompleted, message, None)
    }

    /// Terminate the trace in the error state, capturing the cause chain
    pub fn record_error(
        &self,
        handle: &TraceHandle,
        message: impl Into<String>,
        cause: &dyn std::error::Error,
    ) -> Result<(), TraceError> {
        let detail = format_cause_chain(cause);
        self.terminate(
            handle,
            TraceStatus::Error,
            TraceEventType::ExecutionError,
            message,
            Some(detail),
        )
    }

    /// Terminate the trace as cancelled
    pub fn cancel(&self, handle: &TraceHandle) -> Result<(), TraceError> {
        self.terminate(
            handle,
            TraceStatus::Cancelled,
            TraceEventType::ExecutionCancelled,
            "Execution cancelled",
            None,
        )
    }

    fn terminate(
        &self,
        handle: &TraceHandle,
        status: TraceStatus,
        event_type: TraceEventType,
        message: impl Into<String>,
        error_detail: Option<String>,
    ) -> Result<(), TraceError> {
        let event = {
            let mut trace = handle.inner.lock();
            if trace.is_terminal() {
                return Err(already_terminal(&trace));
            }
            let now = chrono::Utc::now();
            trace.status = status;
            trace.end_time = Some(now);
            trace.last_update = now;
            trace.execution_duration_ms =
                Some((now - trace.start_time).num_milliseconds());
            if error_detail.is_some() {
                trace.error_detail = error_detail;
            }
            let event = TraceEvent::new(event_type, message);
            trace.events.push(event.clone());
            event
        };

        debug!(
            execution_id = %handle.execution_id(),
            status = %status,
            "Execution trace terminated"
        );
        self.publish(handle, event);
        Ok(())
    }

    fn publish(&self, handle: &TraceHandle, event: TraceEvent) {
        let lifecycle = TraceLifecycleEvent {
            execution_id: handle.execution_id(),
            status: handle.status(),
            event,
        };
        // No subscribers is acceptable; trace bookkeeping must never abort
        // the underlying dispatch.
        if let Err(broadcast::error::SendError(dropped)) = self.sender.send(lifecycle) {
            warn!(
                execution_id = %dropped.execution_id,
                "Trace event dropped: no active subscribers"
            );
        }
    }
}

impl Default for ExecutionTraceManager {
    fn default() -> Self {
        Self::new(1000)
    }
}

fn already_terminal(trace: &ExecutionTrace) -> TraceError {
    TraceError::AlreadyTerminal {
        execution_id: trace.execution_id.to_string(),
        status: trace.status.to_string(),
    }
}

/// Render an error and its source chain as one line per cause
fn format_cause_chain(error: &dyn std::error::Error) -> String {
    let mut lines = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines.join("\n")
}

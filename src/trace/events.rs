//! Trace state, events and the trace record itself.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of one execution trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    /// Created, no progress recorded yet
    Started,
    /// At least one progress update recorded
    Running,
    /// Dispatch finished successfully
    Completed,
    /// Dispatch finished with target failures
    Failed,
    /// Dispatch aborted on an unexpected error
    Error,
    /// Dispatch cancelled cooperatively
    Cancelled,
}

impl TraceStatus {
    /// Terminal states have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Error | Self::Cancelled
        )
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Error => write!(f, "error"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TraceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "error" => Ok(Self::Error),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid trace status: {s}")),
        }
    }
}

/// Kind of one appended trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceEventType {
    ExecutionStarted,
    StepProgress,
    ExecutionCompleted,
    ExecutionError,
    ExecutionCancelled,
}

impl fmt::Display for TraceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionStarted => write!(f, "EXECUTION_STARTED"),
            Self::StepProgress => write!(f, "STEP_PROGRESS"),
            Self::ExecutionCompleted => write!(f, "EXECUTION_COMPLETED"),
            Self::ExecutionError => write!(f, "EXECUTION_ERROR"),
            Self::ExecutionCancelled => write!(f, "EXECUTION_CANCELLED"),
        }
    }
}

/// One immutable, timestamped trace event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    pub event_type: TraceEventType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    pub fn new(event_type: TraceEventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The recorded lifecycle of one dispatch invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionTrace {
    pub execution_id: Uuid,
    pub flow_id: Uuid,
    pub flow_type: String,
    pub status: TraceStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
    pub current_step: Option<String>,
    /// Computed at the terminal transition
    pub execution_duration_ms: Option<i64>,
    /// Formatted cause chain captured by `record_error`
    pub error_detail: Option<String>,
    /// Append-only; never mutated after a terminal transition
    pub events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    pub(crate) fn new(flow_id: Uuid, flow_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            execution_id: Uuid::new_v4(),
            flow_id,
            flow_type: flow_type.into(),
            status: TraceStatus::Started,
            start_time: now,
            end_time: None,
            last_update: now,
            current_step: None,
            execution_duration_ms: None,
            error_detail: None,
            events: Vec::new(),
        }
    }

    /// Whether the trace has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

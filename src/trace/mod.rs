//! # Execution Tracing
//!
//! Records the lifecycle of one dispatch invocation: start, progress
//! events, completion, failure or cancellation. A trace is owned by exactly
//! one dispatch; event appends are synchronized so concurrently-running
//! parallel targets can report progress without interleaved corruption.
//!
//! Trace bookkeeping failures are recorded and never abort the underlying
//! dispatch.

pub mod events;
pub mod manager;

pub use events::{ExecutionTrace, TraceEvent, TraceEventType, TraceStatus};
pub use manager::{ExecutionTraceManager, TraceHandle, TraceLifecycleEvent};

//! # Orchestration Dispatcher
//!
//! Fans a transformed message out to one or more configured targets
//! according to execution order, parallelism, per-target routing
//! conditions, retry policy and error strategy, reporting progress and
//! outcome into the execution trace.

pub mod dead_letter;
pub mod dispatcher;
pub mod retry;

pub use dead_letter::{DeadLetterEntry, DeadLetterSink, InMemoryDeadLetterSink};
pub use dispatcher::{
    DispatchStatus, DispatchSummary, OrchestrationDispatcher, TargetOutcome, TargetStatus,
};

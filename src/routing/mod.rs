//! # Routing Engine
//!
//! Condition evaluation and target selection. Evaluation failures are data
//! ([`RoutingDecision::Error`]), never panics, so the dispatcher can apply
//! the flow's error strategy instead of crashing.

pub mod decision;
pub mod engine;

pub use decision::RoutingDecision;
pub use engine::RoutingEngine;

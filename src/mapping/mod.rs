//! # Mapping Engine
//!
//! Field-level transformation of messages: validates and orders mapping
//! definitions and applies them to turn a source-shaped message into a
//! target-shaped message. Pure and synchronous; safe to call from any
//! number of concurrent dispatches as long as mapping inputs are treated as
//! immutable snapshots for the duration of one dispatch.

pub mod engine;
pub mod path;

pub use engine::MappingEngine;

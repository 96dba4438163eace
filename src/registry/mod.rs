//! # Adapter Registry
//!
//! Thread-safe resolution of adapter references held by orchestration
//! targets and integration flows.

pub mod adapter_registry;

pub use adapter_registry::AdapterRegistry;

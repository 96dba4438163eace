#![allow(clippy::doc_markdown)] // Allow technical terms like WSDL, SFTP in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # FlowBridge Core
//!
//! Core flow orchestration engine for integration middleware: moves messages
//! between heterogeneous systems through configured integration flows.
//!
//! ## Overview
//!
//! A flow receives a message through an inbound adapter, transforms it
//! through field mappings, routes it by content, and delivers it to one or
//! more outbound targets with retries and error handling, tracing every
//! step. The adapter implementations themselves live outside this crate;
//! the engine holds them behind the [`adapter::OutboundAdapter`] contract.
//!
//! ## Subsystems
//!
//! - [`mapping`] - Field mapping validation, ordering and application
//! - [`routing`] - Condition evaluation and router strategies
//! - [`orchestration`] - Multi-target dispatch with tiers, retries and
//!   error strategies
//! - [`deployment`] - Flow deployment lifecycle and endpoint derivation
//! - [`trace`] - Execution trace lifecycle and event fan-out
//! - [`models`] - Shared configuration and runtime value types
//! - [`registry`] - Thread-safe adapter resolution
//! - [`adapter`] - Contracts for the out-of-scope adapter layer
//! - [`config`] - Engine configuration
//! - [`error`] - Structured error handling
//!
//! ## Example
//!
//! ```no_run
//! use flowbridge_core::models::{FlowMessage, IntegrationFlow, OrchestrationTarget};
//! use flowbridge_core::orchestration::OrchestrationDispatcher;
//! use flowbridge_core::registry::AdapterRegistry;
//! use flowbridge_core::trace::ExecutionTraceManager;
//! use serde_json::json;
//!
//! # async fn example() {
//! let registry = AdapterRegistry::new();
//! let dispatcher = OrchestrationDispatcher::new(registry, ExecutionTraceManager::default());
//!
//! let flow = IntegrationFlow::new("Order Sync");
//! let targets = vec![OrchestrationTarget::new(flow.id, "crm-out", "crm", 1)];
//! let message = FlowMessage::new(json!({"order_id": "42"}));
//!
//! let summary = dispatcher.dispatch(&flow, &targets, None, message, None).await;
//! println!("dispatch {} finished: {:?}", summary.execution_id, summary.status);
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod deployment;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod routing;
pub mod trace;

pub use config::FlowBridgeConfig;
pub use error::{FlowBridgeError, Result};

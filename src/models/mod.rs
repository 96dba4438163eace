//! # Data Model
//!
//! Core configuration and runtime value types shared across the engine:
//! messages, field mappings, routes, router configurations, orchestration
//! targets and integration flows.
//!
//! Configuration entities are read by many concurrent dispatches and written
//! rarely. Dispatches always work from cloned snapshots; administrative
//! updates never mutate an entity a running dispatch holds.

pub mod field_mapping;
pub mod integration_flow;
pub mod message;
pub mod orchestration_target;
pub mod route;
pub mod router_config;

pub use field_mapping::{FieldMapping, FlowTransformation, MappingType, SplitConfig};
pub use integration_flow::{FlowStatus, IntegrationFlow};
pub use message::FlowMessage;
pub use orchestration_target::{
    ConditionType, ErrorStrategy, OrchestrationTarget, RetryPolicy,
};
pub use route::{ConditionOperator, FlowRoute, RouteCondition};
pub use router_config::RouterConfig;

//! # Deployment State Machine
//!
//! Validates and transitions flows between `developed_inactive` and
//! `deployed_active`, generating the external endpoint and deployment
//! metadata the adapter layer consumes.

pub mod endpoint;
pub mod state_machine;

pub use state_machine::{DeploymentSnapshot, DeploymentStateMachine};

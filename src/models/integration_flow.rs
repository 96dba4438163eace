//! Integration flow records and their deployment status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Deployment status of an integration flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    /// Configured but not live
    #[default]
    DevelopedInactive,
    /// Live; its endpoint is served and dispatches may run
    DeployedActive,
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DevelopedInactive => write!(f, "developed_inactive"),
            Self::DeployedActive => write!(f, "deployed_active"),
        }
    }
}

impl std::str::FromStr for FlowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "developed_inactive" => Ok(Self::DevelopedInactive),
            "deployed_active" => Ok(Self::DeployedActive),
            _ => Err(format!("Invalid flow status: {s}")),
        }
    }
}

/// A configured path from one inbound adapter to one or more outbound
/// targets, with optional transformation and routing.
///
/// Invariant: a flow cannot be `DeployedActive` without both adapter
/// references set and both adapters active; the deployment state machine
/// enforces this.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationFlow {
    pub id: Uuid,
    pub name: String,
    pub status: FlowStatus,
    pub inbound_adapter_id: Option<String>,
    pub outbound_adapter_id: Option<String>,
    /// Explicit endpoint configured by the user; normalized at deploy time
    pub configured_endpoint: Option<String>,
    pub deployment_endpoint: Option<String>,
    pub deployment_metadata: Option<Value>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub deployed_by: Option<String>,
    pub active: bool,
}

impl IntegrationFlow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: FlowStatus::DevelopedInactive,
            inbound_adapter_id: None,
            outbound_adapter_id: None,
            configured_endpoint: None,
            deployment_endpoint: None,
            deployment_metadata: None,
            deployed_at: None,
            deployed_by: None,
            active: false,
        }
    }

    /// Set the inbound adapter reference
    pub fn with_inbound_adapter(mut self, adapter_id: impl Into<String>) -> Self {
        self.inbound_adapter_id = Some(adapter_id.into());
        self
    }

    /// Set the outbound adapter reference
    pub fn with_outbound_adapter(mut self, adapter_id: impl Into<String>) -> Self {
        self.outbound_adapter_id = Some(adapter_id.into());
        self
    }

    /// Set an explicit deployment endpoint
    pub fn with_configured_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.configured_endpoint = Some(endpoint.into());
        self
    }

    /// Whether the flow is currently deployed
    pub fn is_deployed(&self) -> bool {
        self.status == FlowStatus::DeployedActive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_status_string_conversion() {
        assert_eq!(FlowStatus::DeployedActive.to_string(), "deployed_active");
        assert_eq!(
            "developed_inactive".parse::<FlowStatus>().unwrap(),
            FlowStatus::DevelopedInactive
        );
        assert!("retired".parse::<FlowStatus>().is_err());
    }

    #[test]
    fn test_new_flow_is_inactive() {
        let flow = IntegrationFlow::new("order-sync");
        assert_eq!(flow.status, FlowStatus::DevelopedInactive);
        assert!(!flow.is_deployed());
        assert!(!flow.active);
        assert!(flow.deployment_endpoint.is_none());
    }
}

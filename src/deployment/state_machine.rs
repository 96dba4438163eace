//! Flow deployment transitions with precondition guards.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::adapter::AdapterDescriptor;
use crate::config::FlowBridgeConfig;
use crate::error::DeploymentError;
use crate::logging::log_deployment_operation;
use crate::models::{FlowStatus, IntegrationFlow};

use super::endpoint;

/// Captured pre-deploy state, used to restore a flow deterministically
/// after a failed deploy.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSnapshot {
    status: FlowStatus,
    deployment_endpoint: Option<String>,
    deployment_metadata: Option<Value>,
    deployed_at: Option<DateTime<Utc>>,
    deployed_by: Option<String>,
    active: bool,
}

/// Drives flows between `developed_inactive` and `deployed_active`.
///
/// All precondition failures surface synchronously as [`DeploymentError`];
/// nothing here is retried automatically.
#[derive(Debug, Clone)]
pub struct DeploymentStateMachine {
    config: FlowBridgeConfig,
}

impl DeploymentStateMachine {
    pub fn new(config: FlowBridgeConfig) -> Self {
        Self { config }
    }

    /// Capture the fields `revert` restores
    pub fn snapshot(&self, flow: &IntegrationFlow) -> DeploymentSnapshot {
        DeploymentSnapshot {
            status: flow.status,
            deployment_endpoint: flow.deployment_endpoint.clone(),
            deployment_metadata: flow.deployment_metadata.clone(),
            deployed_at: flow.deployed_at,
            deployed_by: flow.deployed_by.clone(),
            active: flow.active,
        }
    }

    /// Deploy a flow.
    ///
    /// Fails when the flow is already deployed, either adapter reference is
    /// missing, or either adapter is inactive. On success the flow becomes
    /// `deployed_active` with its endpoint and metadata populated.
    pub fn deploy(
        &self,
        flow: &mut IntegrationFlow,
        inbound: &AdapterDescriptor,
        outbound: &AdapterDescriptor,
        deployed_by: &str,
    ) -> Result<(), DeploymentError> {
        if flow.status == FlowStatus::DeployedActive {
            return Err(DeploymentError::AlreadyDeployed {
                flow: flow.name.clone(),
            });
        }
        if flow.inbound_adapter_id.is_none() {
            return Err(DeploymentError::MissingAdapter {
                flow: flow.name.clone(),
                side: "inbound".to_string(),
            });
        }
        if flow.outbound_adapter_id.is_none() {
            return Err(DeploymentError::MissingAdapter {
                flow: flow.name.clone(),
                side: "outbound".to_string(),
            });
        }
        for adapter in [inbound, outbound] {
            if !adapter.active {
                return Err(DeploymentError::AdapterInactive {
                    flow: flow.name.clone(),
                    adapter_id: adapter.id.clone(),
                });
            }
        }

        let endpoint = endpoint::generate_endpoint(flow, inbound, &self.config);
        let metadata = endpoint::build_metadata(flow, inbound, &endpoint, &self.config);

        flow.status = FlowStatus::DeployedActive;
        flow.deployed_at = Some(Utc::now());
        flow.deployed_by = Some(deployed_by.to_string());
        flow.deployment_endpoint = Some(endpoint.clone());
        flow.deployment_metadata = Some(metadata);
        flow.active = true;

        log_deployment_operation(
            "deploy",
            &flow.name,
            Some(endpoint.as_str()),
            "deployed_active",
            Some(deployed_by),
        );
        Ok(())
    }

    /// Undeploy a flow.
    ///
    /// A no-op success when the flow is already inactive; otherwise clears
    /// the endpoint and metadata and marks the flow inactive.
    pub fn undeploy(&self, flow: &mut IntegrationFlow) -> Result<(), DeploymentError> {
        match flow.status {
            FlowStatus::DevelopedInactive => Ok(()),
            FlowStatus::DeployedActive => {
                flow.status = FlowStatus::DevelopedInactive;
                flow.deployment_endpoint = None;
                flow.deployment_metadata = None;
                flow.deployed_at = None;
                flow.deployed_by = None;
                flow.active = false;

                log_deployment_operation(
                    "undeploy",
                    &flow.name,
                    None,
                    "developed_inactive",
                    None,
                );
                Ok(())
            }
        }
    }

    /// Restore the pre-deploy state after a failed deploy.
    pub fn revert(&self, flow: &mut IntegrationFlow, snapshot: DeploymentSnapshot) {
        warn!(flow = %flow.name, "Reverting flow to pre-deploy state");
        flow.status = snapshot.status;
        flow.deployment_endpoint = snapshot.deployment_endpoint;
        flow.deployment_metadata = snapshot.deployment_metadata;
        flow.deployed_at = snapshot.deployed_at;
        flow.deployed_by = snapshot.deployed_by;
        flow.active = snapshot.active;
    }
}

impl Default for DeploymentStateMachine {
    fn default() -> Self {
        Self::new(FlowBridgeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterMode, AdapterType};

    fn adapters() -> (AdapterDescriptor, AdapterDescriptor) {
        (
            AdapterDescriptor::new("in-1", "http-in", AdapterType::Rest, AdapterMode::Inbound),
            AdapterDescriptor::new("out-1", "crm-out", AdapterType::Rest, AdapterMode::Outbound),
        )
    }

    fn wired_flow() -> IntegrationFlow {
        IntegrationFlow::new("Order Sync")
            .with_inbound_adapter("in-1")
            .with_outbound_adapter("out-1")
    }

    #[test]
    fn test_deploy_success_populates_flow() {
        let sm = DeploymentStateMachine::default();
        let (inbound, outbound) = adapters();
        let mut flow = wired_flow();

        sm.deploy(&mut flow, &inbound, &outbound, "ops@example.com")
            .unwrap();

        assert_eq!(flow.status, FlowStatus::DeployedActive);
        assert!(flow.active);
        assert_eq!(
            flow.deployment_endpoint.as_deref(),
            Some("/api/integration/order-sync")
        );
        assert!(flow.deployment_metadata.is_some());
        assert_eq!(flow.deployed_by.as_deref(), Some("ops@example.com"));
        assert!(flow.deployed_at.is_some());
    }

    #[test]
    fn test_double_deploy_fails() {
        let sm = DeploymentStateMachine::default();
        let (inbound, outbound) = adapters();
        let mut flow = wired_flow();

        sm.deploy(&mut flow, &inbound, &outbound, "ops").unwrap();
        assert!(matches!(
            sm.deploy(&mut flow, &inbound, &outbound, "ops"),
            Err(DeploymentError::AlreadyDeployed { .. })
        ));
    }

    #[test]
    fn test_deploy_requires_adapter_references() {
        let sm = DeploymentStateMachine::default();
        let (inbound, outbound) = adapters();

        let mut no_inbound = IntegrationFlow::new("x").with_outbound_adapter("out-1");
        let err = sm
            .deploy(&mut no_inbound, &inbound, &outbound, "ops")
            .unwrap_err();
        assert!(matches!(err, DeploymentError::MissingAdapter { ref side, .. } if side == "inbound"));

        let mut no_outbound = IntegrationFlow::new("x").with_inbound_adapter("in-1");
        let err = sm
            .deploy(&mut no_outbound, &inbound, &outbound, "ops")
            .unwrap_err();
        assert!(matches!(err, DeploymentError::MissingAdapter { ref side, .. } if side == "outbound"));
    }

    #[test]
    fn test_deploy_requires_active_adapters() {
        let sm = DeploymentStateMachine::default();
        let (inbound, outbound) = adapters();
        let mut flow = wired_flow();

        let err = sm
            .deploy(&mut flow, &inbound.clone().inactive(), &outbound, "ops")
            .unwrap_err();
        assert!(matches!(err, DeploymentError::AdapterInactive { .. }));
        // Failed deploy leaves the flow untouched
        assert_eq!(flow.status, FlowStatus::DevelopedInactive);
    }

    #[test]
    fn test_undeploy_is_idempotent_noop_when_inactive() {
        let sm = DeploymentStateMachine::default();
        let (inbound, outbound) = adapters();
        let mut flow = wired_flow();

        // Already inactive: no-op success
        assert!(sm.undeploy(&mut flow).is_ok());

        sm.deploy(&mut flow, &inbound, &outbound, "ops").unwrap();
        sm.undeploy(&mut flow).unwrap();
        assert_eq!(flow.status, FlowStatus::DevelopedInactive);
        assert!(flow.deployment_endpoint.is_none());
        assert!(flow.deployment_metadata.is_none());
        assert!(!flow.active);

        // And again: still a no-op success
        assert!(sm.undeploy(&mut flow).is_ok());
    }

    #[test]
    fn test_revert_restores_snapshot() {
        let sm = DeploymentStateMachine::default();
        let (inbound, outbound) = adapters();
        let mut flow = wired_flow();

        let snapshot = sm.snapshot(&flow);
        sm.deploy(&mut flow, &inbound, &outbound, "ops").unwrap();
        assert!(flow.is_deployed());

        sm.revert(&mut flow, snapshot);
        assert_eq!(flow.status, FlowStatus::DevelopedInactive);
        assert!(flow.deployment_endpoint.is_none());
        assert!(!flow.active);
    }
}

//! # Error Types
//!
//! Structured error handling for the flow orchestration core using thiserror
//! for typed errors instead of `Box<dyn Error>` patterns.
//!
//! The taxonomy mirrors the failure surfaces of the engine: configuration
//! validation, route evaluation, per-target execution, deployment
//! preconditions and trace bookkeeping. Configuration and deployment errors
//! are fail-fast and synchronous; routing and target-execution failures are
//! handled at the dispatcher boundary instead of unwinding the call stack.

use thiserror::Error;

/// Invalid mapping, route, router or target definitions.
///
/// Raised at validate-time, never during dispatch. Always recoverable by
/// correcting configuration before re-saving or redeploying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid field mapping {mapping_id}: {reason}")]
    InvalidMapping { mapping_id: String, reason: String },

    #[error("Invalid router configuration ({router_type}): {reason}")]
    InvalidRouterConfig { router_type: String, reason: String },

    #[error("Invalid route condition on '{source_path}': {reason}")]
    InvalidCondition { source_path: String, reason: String },

    #[error("Invalid orchestration target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Invalid engine configuration: {reason}")]
    InvalidEngineConfig { reason: String },
}

impl ConfigurationError {
    /// Create an invalid mapping error
    pub fn invalid_mapping(mapping_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMapping {
            mapping_id: mapping_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid router configuration error
    pub fn invalid_router_config(
        router_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRouterConfig {
            router_type: router_type.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid condition error
    pub fn invalid_condition(source_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCondition {
            source_path: source_path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Condition or router evaluation failure.
///
/// Carried inside a `RoutingDecision::Error` rather than thrown, so the
/// dispatcher can apply the flow's error strategy instead of crashing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Malformed regex '{pattern}': {reason}")]
    MalformedRegex { pattern: String, reason: String },

    #[error("Missing expected value for operator {operator}")]
    MissingExpectedValue { operator: String },

    #[error("Recipient list variable '{variable}' not present in message headers")]
    UnresolvedRecipientVariable { variable: String },

    #[error("Router has no targets configured")]
    NoTargets,

    #[error("Route evaluation failed: {reason}")]
    Evaluation { reason: String },
}

/// A single orchestration target's adapter call failed.
///
/// Subject to the target's retry policy; once retries exhaust the failure is
/// escalated per the target's error strategy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetExecutionError {
    #[error("Adapter '{adapter_id}' not registered")]
    AdapterNotFound { adapter_id: String },

    #[error("Adapter '{adapter_id}' is inactive")]
    AdapterInactive { adapter_id: String },

    #[error("Target '{target}' failed: {kind}: {reason}")]
    CallFailed {
        target: String,
        kind: String,
        reason: String,
    },

    #[error("Target '{target}' timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("Rate limit exhausted for '{key}': {reason}")]
    RateLimited { key: String, reason: String },

    #[error("Dispatch cancelled before target '{target}' started")]
    Cancelled { target: String },
}

impl TargetExecutionError {
    /// Classification label used when matching against a retry policy's
    /// `retry_on_errors` list.
    pub fn kind(&self) -> &str {
        match self {
            Self::AdapterNotFound { .. } => "adapter_not_found",
            Self::AdapterInactive { .. } => "adapter_inactive",
            Self::CallFailed { kind, .. } => kind,
            Self::Timeout { .. } => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Whether this error class is retryable at all. Configuration-shaped
    /// failures and cancellation never are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CallFailed { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

/// A deploy or undeploy precondition failed.
///
/// Always surfaced to the caller, never retried automatically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeploymentError {
    #[error("Flow '{flow}' is already deployed")]
    AlreadyDeployed { flow: String },

    #[error("Flow '{flow}' is missing its {side} adapter reference")]
    MissingAdapter { flow: String, side: String },

    #[error("Adapter '{adapter_id}' for flow '{flow}' is not active")]
    AdapterInactive { flow: String, adapter_id: String },

    #[error("Flow '{flow}' is in unrecognized deployment state '{state}'")]
    UnrecognizedState { flow: String, state: String },
}

/// Trace bookkeeping failure. Recorded, never allowed to abort a dispatch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraceError {
    #[error("Trace {execution_id} is already in terminal state {status}")]
    AlreadyTerminal {
        execution_id: String,
        status: String,
    },
}

/// Umbrella error for callers that cross component boundaries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowBridgeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    TargetExecution(#[from] TargetExecutionError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Result type alias for flow orchestration operations
pub type Result<T> = std::result::Result<T, FlowBridgeError>;

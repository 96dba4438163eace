//! Orchestration targets: one configured outbound destination within a flow.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::route::RouteCondition;

/// When a target's routing condition applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Execute unconditionally
    #[default]
    Always,
    /// Execute only if every prior target in the dispatch succeeded
    OnSuccess,
    /// Execute only if a prior target in the dispatch failed
    OnFailure,
    /// Execute only if the routing condition expression matches the message
    Expression,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::OnSuccess => write!(f, "on_success"),
            Self::OnFailure => write!(f, "on_failure"),
            Self::Expression => write!(f, "expression"),
        }
    }
}

/// Effect of a terminal per-target failure on the overall dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    /// Abort the whole flow; remaining targets do not execute
    #[default]
    FailFlow,
    /// Record the failure and continue with remaining targets
    Continue,
    /// Divert the message to the dead-letter sink and continue
    DeadLetter,
}

impl fmt::Display for ErrorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFlow => write!(f, "fail_flow"),
            Self::Continue => write!(f, "continue"),
            Self::DeadLetter => write!(f, "dead_letter"),
        }
    }
}

impl std::str::FromStr for ErrorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_flow" => Ok(Self::FailFlow),
            "continue" => Ok(Self::Continue),
            "dead_letter" => Ok(Self::DeadLetter),
            _ => Err(format!("Invalid error strategy: {s}")),
        }
    }
}

/// Retry behavior for one orchestration target.
///
/// The delay before attempt *n* (n ≥ 2) is
/// `min(retry_delay_ms × backoff_multiplier^(n-2), max_retry_delay_ms)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_retry_delay_ms: u64,
    /// Error kinds eligible for retry; empty retries every retryable kind
    #[serde(default)]
    pub retry_on_errors: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_retry_delay_ms: 30_000,
            retry_on_errors: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// One configured outbound destination within a flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestrationTarget {
    pub id: Uuid,
    pub flow_id: Uuid,
    /// Reference into the adapter registry; the core holds the reference
    /// opaque and never caches adapter state across invocations
    pub adapter_id: String,
    pub name: String,
    /// Targets execute in ascending order; equal orders form one tier
    pub execution_order: i32,
    /// Parallel targets in the same tier run concurrently
    pub parallel: bool,
    pub routing_condition: Option<RouteCondition>,
    #[serde(default)]
    pub condition_type: ConditionType,
    /// Block for the adapter response up to `timeout_ms`
    pub await_response: bool,
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub error_strategy: ErrorStrategy,
    pub active: bool,
}

impl OrchestrationTarget {
    pub fn new(
        flow_id: Uuid,
        adapter_id: impl Into<String>,
        name: impl Into<String>,
        execution_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow_id,
            adapter_id: adapter_id.into(),
            name: name.into(),
            execution_order,
            parallel: false,
            routing_condition: None,
            condition_type: ConditionType::Always,
            await_response: true,
            timeout_ms: 30_000,
            retry_policy: RetryPolicy::default(),
            error_strategy: ErrorStrategy::FailFlow,
            active: true,
        }
    }

    /// Mark the target as parallel within its tier
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Gate execution on a routing condition
    pub fn with_routing_condition(mut self, condition: RouteCondition) -> Self {
        self.routing_condition = Some(condition);
        self.condition_type = ConditionType::Expression;
        self
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the error strategy
    pub fn with_error_strategy(mut self, strategy: ErrorStrategy) -> Self {
        self.error_strategy = strategy;
        self
    }

    /// Set the per-target timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

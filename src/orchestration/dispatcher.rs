//! The dispatcher: drives one message through transformation, ordered
//! target tiers, per-target gating, retries and error-strategy handling.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapter::{NoopRateLimiter, RateLimiter};
use crate::config::FlowBridgeConfig;
use crate::error::TargetExecutionError;
use crate::logging::{log_dispatch_operation, log_error};
use crate::mapping::engine::MappingEngine;
use crate::models::{
    ConditionType, ErrorStrategy, FlowMessage, FlowTransformation, IntegrationFlow,
    OrchestrationTarget,
};
use crate::registry::AdapterRegistry;
use crate::routing::engine::evaluate_condition;
use crate::trace::{ExecutionTraceManager, TraceHandle};

use super::dead_letter::{DeadLetterSink, InMemoryDeadLetterSink};
use super::retry;

/// Overall outcome of one dispatch invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Completed,
    Failed,
    Cancelled,
}

impl DispatchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Per-target outcome within one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Completed,
    /// Gating condition not met; not an error
    Skipped,
    Failed,
    /// Failed terminally and diverted to the dead-letter sink
    DeadLettered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target_name: String,
    pub adapter_id: String,
    pub status: TargetStatus,
    /// Adapter invocations made, including retries; 0 when skipped
    pub attempts: u32,
    pub error: Option<String>,
}

impl TargetOutcome {
    fn completed(target: &OrchestrationTarget, attempts: u32) -> Self {
        Self {
            target_name: target.name.clone(),
            adapter_id: target.adapter_id.clone(),
            status: TargetStatus::Completed,
            attempts,
            error: None,
        }
    }

    fn skipped(target: &OrchestrationTarget) -> Self {
        Self {
            target_name: target.name.clone(),
            adapter_id: target.adapter_id.clone(),
            status: TargetStatus::Skipped,
            attempts: 0,
            error: None,
        }
    }

    fn failed(target: &OrchestrationTarget, status: TargetStatus, attempts: u32, error: &TargetExecutionError) -> Self {
        Self {
            target_name: target.name.clone(),
            adapter_id: target.adapter_id.clone(),
            status,
            attempts,
            error: Some(error.to_string()),
        }
    }
}

/// Result of one dispatch invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub execution_id: Uuid,
    pub status: DispatchStatus,
    pub outcomes: Vec<TargetOutcome>,
}

impl DispatchSummary {
    /// Outcome for a named target, if it was reached
    pub fn outcome(&self, target_name: &str) -> Option<&TargetOutcome> {
        self.outcomes.iter().find(|o| o.target_name == target_name)
    }
}

/// Fans a message out to a flow's configured targets.
///
/// Targets execute in ascending `execution_order`; equal orders form one
/// tier. Parallel tier members run as spawned tasks joined at the tier
/// boundary, sequential members run inline; a terminal fail-flow failure
/// of a sequential member stops later tier-mates from starting.
/// Success/failure gating
/// (`on_success` / `on_failure`) sees the outcomes of prior tiers; members
/// of one tier are gated uniformly against the state at tier start.
///
/// Cloneable so parallel targets can carry their own handle into spawned
/// tasks; all shared state lives behind `Arc`s.
#[derive(Clone)]
pub struct OrchestrationDispatcher {
    registry: AdapterRegistry,
    trace_manager: ExecutionTraceManager,
    rate_limiter: Arc<dyn RateLimiter>,
    dead_letter: Arc<dyn DeadLetterSink>,
    mapping_engine: MappingEngine,
    config: FlowBridgeConfig,
}

impl OrchestrationDispatcher {
    pub fn new(registry: AdapterRegistry, trace_manager: ExecutionTraceManager) -> Self {
        Self {
            registry,
            trace_manager,
            rate_limiter: Arc::new(NoopRateLimiter),
            dead_letter: Arc::new(InMemoryDeadLetterSink::new()),
            mapping_engine: MappingEngine::new(),
            config: FlowBridgeConfig::default(),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_dead_letter(mut self, dead_letter: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letter = dead_letter;
        self
    }

    pub fn with_config(mut self, config: FlowBridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Dispatch one message through the flow's targets.
    ///
    /// The message is transformed first when a transformation is supplied;
    /// a transformation configuration error terminates the dispatch before
    /// any target runs. Cancellation is observed at tier boundaries and
    /// before each sequential target; in-flight parallel targets are joined
    /// before the dispatch reports `Cancelled`.
    pub async fn dispatch(
        &self,
        flow: &IntegrationFlow,
        targets: &[OrchestrationTarget],
        transformation: Option<&FlowTransformation>,
        message: FlowMessage,
        cancel: Option<watch::Receiver<bool>>,
    ) -> DispatchSummary {
        let handle = self.trace_manager.create(flow.id, flow.name.clone());
        let execution_id = handle.execution_id();

        let message = match transformation {
            Some(transformation) => match self.mapping_engine.apply_all(transformation, &message) {
                Ok(transformed) => transformed,
                Err(error) => {
                    log_error(
                        "dispatcher",
                        "transform",
                        &error.to_string(),
                        Some(flow.name.as_str()),
                    );
                    if let Err(trace_error) =
                        self.trace_manager
                            .record_error(&handle, "Transformation failed", &error)
                    {
                        warn!(execution_id = %execution_id, error = %trace_error, "Trace update rejected");
                    }
                    return DispatchSummary {
                        execution_id,
                        status: DispatchStatus::Failed,
                        outcomes: Vec::new(),
                    };
                }
            },
            None => message,
        };

        let mut active: Vec<OrchestrationTarget> =
            targets.iter().filter(|t| t.active).cloned().collect();
        active.sort_by_key(|t| t.execution_order);

        let mut outcomes: Vec<TargetOutcome> = Vec::with_capacity(active.len());
        let mut any_failure = false;
        let mut aborted = false;
        let mut cancelled = false;

        let mut index = 0;
        while index < active.len() {
            let order = active[index].execution_order;
            let mut tier_end = index;
            while tier_end < active.len() && active[tier_end].execution_order == order {
                tier_end += 1;
            }
            let tier = &active[index..tier_end];
            index = tier_end;

            if is_cancelled(&cancel) {
                cancelled = true;
                break;
            }

            let failure_before_tier = any_failure;
            let mut tier_outcomes: Vec<Option<TargetOutcome>> = vec![None; tier.len()];
            let mut spawned: Vec<(usize, JoinHandle<TargetOutcome>)> = Vec::new();

            for (slot, target) in tier.iter().enumerate() {
                if target.parallel {
                    let dispatcher = self.clone();
                    let task_handle = handle.clone();
                    let target = target.clone();
                    let message = message.clone();
                    let flow_id = flow.id;
                    spawned.push((
                        slot,
                        tokio::spawn(async move {
                            dispatcher
                                .run_target(flow_id, &task_handle, &target, &message, failure_before_tier)
                                .await
                        }),
                    ));
                } else {
                    if is_cancelled(&cancel) {
                        cancelled = true;
                        break;
                    }
                    let outcome = self
                        .run_target(flow.id, &handle, target, &message, failure_before_tier)
                        .await;
                    let terminal_failure = outcome.status == TargetStatus::Failed
                        && target.error_strategy == ErrorStrategy::FailFlow;
                    tier_outcomes[slot] = Some(outcome);
                    // A terminal fail-flow failure is known before later
                    // sequential tier-mates start; stop them here instead of
                    // at the tier boundary. Already-spawned parallel members
                    // still run to completion below.
                    if terminal_failure {
                        break;
                    }
                }
            }

            // Parallel members already in flight run to completion even
            // when the tier was cancelled or will abort.
            let slots: Vec<usize> = spawned.iter().map(|(slot, _)| *slot).collect();
            let joined =
                join_all(spawned.into_iter().map(|(_, join_handle)| join_handle)).await;
            for (slot, join_result) in slots.into_iter().zip(joined) {
                match join_result {
                    Ok(outcome) => tier_outcomes[slot] = Some(outcome),
                    Err(join_error) => {
                        let target = &tier[slot];
                        warn!(target = %target.name, error = %join_error, "Target task panicked");
                        tier_outcomes[slot] = Some(TargetOutcome {
                            target_name: target.name.clone(),
                            adapter_id: target.adapter_id.clone(),
                            status: TargetStatus::Failed,
                            attempts: 0,
                            error: Some(join_error.to_string()),
                        });
                    }
                }
            }

            for (slot, outcome) in tier_outcomes.into_iter().enumerate() {
                let Some(outcome) = outcome else { continue };
                match outcome.status {
                    TargetStatus::Failed => {
                        any_failure = true;
                        if tier[slot].error_strategy == ErrorStrategy::FailFlow {
                            aborted = true;
                        }
                    }
                    TargetStatus::DeadLettered => any_failure = true,
                    TargetStatus::Completed | TargetStatus::Skipped => {}
                }
                outcomes.push(outcome);
            }

            if cancelled || aborted {
                break;
            }
        }

        let status = if cancelled {
            if let Err(error) = self.trace_manager.cancel(&handle) {
                warn!(execution_id = %execution_id, error = %error, "Trace update rejected");
            }
            DispatchStatus::Cancelled
        } else if aborted {
            if let Err(error) = self.trace_manager.complete(
                &handle,
                false,
                "Dispatch aborted: fail-flow target failed terminally",
            ) {
                warn!(execution_id = %execution_id, error = %error, "Trace update rejected");
            }
            DispatchStatus::Failed
        } else {
            let executed = outcomes
                .iter()
                .filter(|o| o.status != TargetStatus::Skipped)
                .count();
            let skipped = outcomes.len() - executed;
            if let Err(error) = self.trace_manager.complete(
                &handle,
                true,
                format!("Dispatch completed: {executed} executed, {skipped} skipped"),
            ) {
                warn!(execution_id = %execution_id, error = %error, "Trace update rejected");
            }
            DispatchStatus::Completed
        };

        let details = format!("{} target outcomes", outcomes.len());
        log_dispatch_operation(
            "dispatch",
            Some(flow.id.to_string().as_str()),
            Some(execution_id.to_string().as_str()),
            status.label(),
            Some(details.as_str()),
        );
        DispatchSummary {
            execution_id,
            status,
            outcomes,
        }
    }

    /// Run one target end to end: gating, progress event, retried
    /// execution, error-strategy handling.
    async fn run_target(
        &self,
        flow_id: Uuid,
        handle: &TraceHandle,
        target: &OrchestrationTarget,
        message: &FlowMessage,
        prior_failure: bool,
    ) -> TargetOutcome {
        let eligible = match eligibility(target, message, prior_failure) {
            Ok(eligible) => eligible,
            Err(routing_error) => {
                // A broken gating condition fails the target without retry
                let error = TargetExecutionError::CallFailed {
                    target: target.name.clone(),
                    kind: "condition_evaluation".to_string(),
                    reason: routing_error.to_string(),
                };
                return self.handle_failure(flow_id, target, message, error, 0).await;
            }
        };
        if !eligible {
            debug!(target = %target.name, "Target skipped: gating condition not met");
            return TargetOutcome::skipped(target);
        }

        if let Err(error) = self.trace_manager.update_progress(
            handle,
            format!("target:{}", target.name),
            format!("Executing target '{}'", target.name),
        ) {
            warn!(target = %target.name, error = %error, "Trace update rejected");
        }

        let (attempts, result) = self.execute_with_retry(target, message).await;
        match result {
            Ok(()) => TargetOutcome::completed(target, attempts),
            Err(error) => self.handle_failure(flow_id, target, message, error, attempts).await,
        }
    }

    async fn execute_with_retry(
        &self,
        target: &OrchestrationTarget,
        message: &FlowMessage,
    ) -> (u32, Result<(), TargetExecutionError>) {
        let mut attempt = 1u32;
        loop {
            match self.execute_once(target, message).await {
                Ok(()) => return (attempt, Ok(())),
                Err(error) => {
                    if !retry::should_retry(&target.retry_policy, &error, attempt) {
                        return (attempt, Err(error));
                    }
                    let delay = retry::backoff_delay(&target.retry_policy, attempt + 1);
                    debug!(
                        target = %target.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying target after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One adapter invocation: rate limit, resolve, send with timeout.
    async fn execute_once(
        &self,
        target: &OrchestrationTarget,
        message: &FlowMessage,
    ) -> Result<(), TargetExecutionError> {
        self.rate_limiter
            .acquire(&target.adapter_id, 1)
            .await
            .map_err(|error| TargetExecutionError::RateLimited {
                key: target.adapter_id.clone(),
                reason: error.to_string(),
            })?;

        let adapter = self.registry.resolve_active(&target.adapter_id)?;

        if !target.await_response {
            // Fire and forget: the send runs detached and its outcome is
            // only logged.
            let payload = message.payload.clone();
            let headers = message.headers.clone();
            let name = target.name.clone();
            tokio::spawn(async move {
                let result = adapter.send(&payload, &headers).await;
                if !result.success {
                    warn!(
                        target = %name,
                        error = ?result.error_message,
                        "Fire-and-forget delivery failed"
                    );
                }
            });
            return Ok(());
        }

        let timeout_ms = if target.timeout_ms == 0 {
            self.config.default_timeout_ms
        } else {
            target.timeout_ms
        };
        match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            adapter.send(&message.payload, &message.headers),
        )
        .await
        {
            Ok(result) => match result.into_execution_error(&target.name) {
                None => Ok(()),
                Some(error) => Err(error),
            },
            Err(_) => Err(TargetExecutionError::Timeout {
                target: target.name.clone(),
                timeout_ms,
            }),
        }
    }

    async fn handle_failure(
        &self,
        flow_id: Uuid,
        target: &OrchestrationTarget,
        message: &FlowMessage,
        error: TargetExecutionError,
        attempts: u32,
    ) -> TargetOutcome {
        warn!(
            target = %target.name,
            strategy = %target.error_strategy,
            attempts,
            error = %error,
            "Target failed terminally"
        );
        match target.error_strategy {
            ErrorStrategy::DeadLetter => {
                self.dead_letter
                    .divert(flow_id, &target.name, message, &error)
                    .await;
                TargetOutcome::failed(target, TargetStatus::DeadLettered, attempts, &error)
            }
            ErrorStrategy::FailFlow | ErrorStrategy::Continue => {
                TargetOutcome::failed(target, TargetStatus::Failed, attempts, &error)
            }
        }
    }
}

/// Whether a target should execute, per its condition type and routing
/// condition. `Ok(false)` is a skip, not an error.
fn eligibility(
    target: &OrchestrationTarget,
    message: &FlowMessage,
    prior_failure: bool,
) -> Result<bool, crate::error::RoutingError> {
    let gate_open = match target.condition_type {
        ConditionType::Always | ConditionType::Expression => true,
        ConditionType::OnSuccess => !prior_failure,
        ConditionType::OnFailure => prior_failure,
    };
    if !gate_open {
        return Ok(false);
    }
    match &target.routing_condition {
        Some(condition) => evaluate_condition(condition, message),
        None => Ok(true),
    }
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().is_some_and(|rx| *rx.borrow())
}

//! # External Collaborator Contracts
//!
//! Narrow interfaces to the out-of-scope adapter layer. Expected failure
//! modes are reported as values, not `Err`s: an adapter that cannot reach
//! its remote system returns a failed [`AdapterResult`], while `Err` is
//! reserved for contract violations. The core holds adapter references
//! opaque and never caches adapter state across invocations.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TargetExecutionError};

/// Protocol family of an adapter, used for deployment endpoint derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    Http,
    Rest,
    Soap,
    File,
    Sftp,
    Jdbc,
    Jms,
    Kafka,
    OData,
}

impl AdapterType {
    /// HTTP-style adapters serve an API path
    pub fn is_http_family(&self) -> bool {
        matches!(self, Self::Http | Self::Rest)
    }

    /// File-based adapters poll a filesystem location
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::File | Self::Sftp)
    }

    /// Label used in deployment metadata
    pub fn label(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Rest => "rest",
            Self::Soap => "soap",
            Self::File => "file",
            Self::Sftp => "sftp",
            Self::Jdbc => "jdbc",
            Self::Jms => "jms",
            Self::Kafka => "kafka",
            Self::OData => "odata",
        }
    }
}

/// Direction an adapter operates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterMode {
    Inbound,
    Outbound,
}

impl AdapterMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Administrative view of one adapter registration, consumed by the
/// deployment state machine for precondition checks and endpoint
/// derivation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterDescriptor {
    pub id: String,
    pub name: String,
    pub adapter_type: AdapterType,
    pub mode: AdapterMode,
    pub active: bool,
}

impl AdapterDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        adapter_type: AdapterType,
        mode: AdapterMode,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            adapter_type,
            mode,
            active: true,
        }
    }

    /// Mark the descriptor inactive, returning self for chained construction
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Outcome of a connection probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionProbe {
    pub ok: bool,
    pub message: String,
}

/// Outcome of one send/receive adapter call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterResult {
    pub success: bool,
    pub payload: Option<Value>,
    /// Error classification when `success` is false, matched against a
    /// target's `retry_on_errors` list
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl AdapterResult {
    /// A successful call with an optional response payload
    pub fn ok(payload: Option<Value>) -> Self {
        Self {
            success: true,
            payload,
            error_kind: None,
            error_message: None,
        }
    }

    /// An expected failure with classification
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error_kind: Some(kind.into()),
            error_message: Some(message.into()),
        }
    }

    /// Convert a failed result into the dispatcher's error type
    pub fn into_execution_error(self, target: &str) -> Option<TargetExecutionError> {
        if self.success {
            return None;
        }
        Some(TargetExecutionError::CallFailed {
            target: target.to_string(),
            kind: self.error_kind.unwrap_or_else(|| "unknown".to_string()),
            reason: self
                .error_message
                .unwrap_or_else(|| "adapter reported failure".to_string()),
        })
    }
}

/// Contract implemented by every outbound adapter.
///
/// Each platform is one implementation of this trait; the core never sees
/// protocol-specific detail.
#[async_trait]
pub trait OutboundAdapter: Send + Sync {
    /// Probe connectivity without sending a message
    async fn test_connection(&self) -> ConnectionProbe;

    /// Deliver a payload with headers
    async fn send(&self, payload: &Value, headers: &HashMap<String, String>) -> AdapterResult;

    /// Poll for data matching the given criteria
    async fn receive(&self, criteria: &Value) -> AdapterResult;

    /// Whether the adapter is administratively active
    fn is_active(&self) -> bool;

    fn adapter_type(&self) -> AdapterType;

    fn adapter_mode(&self) -> AdapterMode {
        AdapterMode::Outbound
    }
}

/// Rate limiting contract; orchestration acquires before every outbound
/// adapter invocation. May block or fail when exhausted.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self, key: &str, permits: u32) -> Result<()>;
}

/// Rate limiter that always grants
#[derive(Debug, Clone, Default)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn acquire(&self, _key: &str, _permits: u32) -> Result<()> {
        Ok(())
    }
}

/// Credential decryption contract, consumed by the adapter layer. The core
/// passes credential references through unmodified.
pub trait CredentialStore: Send + Sync {
    fn decrypt(&self, value: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_type_families() {
        assert!(AdapterType::Http.is_http_family());
        assert!(AdapterType::Rest.is_http_family());
        assert!(!AdapterType::Soap.is_http_family());
        assert!(AdapterType::File.is_file_based());
        assert!(AdapterType::Sftp.is_file_based());
        assert!(!AdapterType::Kafka.is_file_based());
    }

    #[test]
    fn test_adapter_result_conversion() {
        assert!(AdapterResult::ok(None).into_execution_error("t").is_none());

        let error = AdapterResult::failed("connection_refused", "ECONNREFUSED")
            .into_execution_error("crm")
            .unwrap();
        assert_eq!(error.kind(), "connection_refused");
    }

    #[tokio::test]
    async fn test_noop_rate_limiter_always_grants() {
        let limiter = NoopRateLimiter;
        assert!(limiter.acquire("any", 1).await.is_ok());
    }
}

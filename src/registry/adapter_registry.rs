//! Concurrent adapter registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::adapter::OutboundAdapter;
use crate::error::TargetExecutionError;

/// Maps adapter ids to adapter instances.
///
/// Read by many concurrent dispatches; registration is an administrative
/// operation. The registry hands out shared references and never clones
/// adapter state.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Arc<DashMap<String, Arc<dyn OutboundAdapter>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Arc::new(DashMap::new()),
        }
    }

    /// Register an adapter under an id, replacing any previous registration
    pub fn register(&self, adapter_id: impl Into<String>, adapter: Arc<dyn OutboundAdapter>) {
        let adapter_id = adapter_id.into();
        debug!(adapter_id = %adapter_id, "Registering adapter");
        self.adapters.insert(adapter_id, adapter);
    }

    /// Resolve an adapter reference
    pub fn resolve(&self, adapter_id: &str) -> Result<Arc<dyn OutboundAdapter>, TargetExecutionError> {
        self.adapters
            .get(adapter_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TargetExecutionError::AdapterNotFound {
                adapter_id: adapter_id.to_string(),
            })
    }

    /// Resolve an adapter and require that it is active
    pub fn resolve_active(
        &self,
        adapter_id: &str,
    ) -> Result<Arc<dyn OutboundAdapter>, TargetExecutionError> {
        let adapter = self.resolve(adapter_id)?;
        if !adapter.is_active() {
            return Err(TargetExecutionError::AdapterInactive {
                adapter_id: adapter_id.to_string(),
            });
        }
        Ok(adapter)
    }

    /// Remove a registration
    pub fn deregister(&self, adapter_id: &str) -> bool {
        self.adapters.remove(adapter_id).is_some()
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.adapters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{
        AdapterMode, AdapterResult, AdapterType, ConnectionProbe, OutboundAdapter,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;

    struct StubAdapter {
        active: bool,
    }

    #[async_trait]
    impl OutboundAdapter for StubAdapter {
        async fn test_connection(&self) -> ConnectionProbe {
            ConnectionProbe {
                ok: true,
                message: "ok".to_string(),
            }
        }

        async fn send(&self, _payload: &Value, _headers: &HashMap<String, String>) -> AdapterResult {
            AdapterResult::ok(None)
        }

        async fn receive(&self, _criteria: &Value) -> AdapterResult {
            AdapterResult::ok(None)
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Rest
        }

        fn adapter_mode(&self) -> AdapterMode {
            AdapterMode::Outbound
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = AdapterRegistry::new();
        assert!(registry.is_empty());

        registry.register("crm", Arc::new(StubAdapter { active: true }));
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("crm").is_ok());
        assert!(matches!(
            registry.resolve("erp"),
            Err(TargetExecutionError::AdapterNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_active_rejects_inactive() {
        let registry = AdapterRegistry::new();
        registry.register("crm", Arc::new(StubAdapter { active: false }));
        assert!(matches!(
            registry.resolve_active("crm"),
            Err(TargetExecutionError::AdapterInactive { .. })
        ));
    }

    #[test]
    fn test_deregister() {
        let registry = AdapterRegistry::new();
        registry.register("crm", Arc::new(StubAdapter { active: true }));
        assert!(registry.deregister("crm"));
        assert!(!registry.deregister("crm"));
    }
}

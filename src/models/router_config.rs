//! Router configuration as a tagged union.
//!
//! One variant per router strategy, so type-specific required fields exist
//! by construction and illegal configurations are unrepresentable once a
//! value passes [`crate::routing::RoutingEngine::validate_router_config`].

use serde::{Deserialize, Serialize};

use super::route::FlowRoute;

/// Type-specific router configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "router_type", rename_all = "snake_case")]
pub enum RouterConfig {
    /// First fully-matching route wins, evaluated by priority descending
    Choice { routes: Vec<FlowRoute> },

    /// Like `Choice`, but route conditions compare against a value
    /// extracted from a single configured payload path
    ContentBased {
        extraction_path: String,
        routes: Vec<FlowRoute>,
    },

    /// Fan-out to all recipients, static or resolved from a runtime
    /// variable carried in the message headers
    RecipientList {
        #[serde(default)]
        recipients: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient_list_variable: Option<String>,
    },

    /// Atomically rotating selection across the configured targets
    RoundRobin { targets: Vec<String> },

    /// Random selection proportional to per-target weights, in
    /// declaration order
    Weighted { targets: Vec<(String, u32)> },
}

impl RouterConfig {
    /// Router type label used in logs and error messages
    pub fn router_type(&self) -> &'static str {
        match self {
            Self::Choice { .. } => "choice",
            Self::ContentBased { .. } => "content_based",
            Self::RecipientList { .. } => "recipient_list",
            Self::RoundRobin { .. } => "round_robin",
            Self::Weighted { .. } => "weighted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::{FlowRoute, RouteCondition};

    #[test]
    fn test_router_type_labels() {
        let config = RouterConfig::RoundRobin {
            targets: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(config.router_type(), "round_robin");
    }

    #[test]
    fn test_tagged_serde() {
        let config = RouterConfig::ContentBased {
            extraction_path: "order.amount".to_string(),
            routes: vec![FlowRoute::new("big", "target-a", 10)
                .with_condition(RouteCondition::greater_than("order.amount", "100"))],
        };

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["router_type"], "content_based");
        assert_eq!(json["extraction_path"], "order.amount");

        let parsed: RouterConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_recipient_list_defaults() {
        let parsed: RouterConfig = serde_json::from_str(
            r#"{"router_type": "recipient_list", "recipient_list_variable": "downstreams"}"#,
        )
        .unwrap();
        match parsed {
            RouterConfig::RecipientList {
                recipients,
                recipient_list_variable,
            } => {
                assert!(recipients.is_empty());
                assert_eq!(recipient_list_variable.as_deref(), Some("downstreams"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}

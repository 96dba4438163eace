//! Condition evaluation and the five router strategies.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{ConfigurationError, RoutingError};
use crate::models::{ConditionOperator, FlowMessage, FlowRoute, RouteCondition, RouterConfig};

use super::decision::RoutingDecision;

/// Evaluate one condition against a message.
///
/// String operators compare the stringified field value. Numeric operators
/// parse both operands as f64 and fall back to lexicographic string
/// comparison when either parse fails. List operators parse the expected
/// value as a comma-separated list, trimming whitespace and dropping empty
/// entries. `is_null`/`is_not_null` ignore the expected value; an absent
/// field and an explicit null are both "null".
pub fn evaluate_condition(
    condition: &RouteCondition,
    message: &FlowMessage,
) -> Result<bool, RoutingError> {
    evaluate_against_path(condition, &condition.source_path, message)
}

fn evaluate_against_path(
    condition: &RouteCondition,
    source_path: &str,
    message: &FlowMessage,
) -> Result<bool, RoutingError> {
    let actual = message.field_as_string(source_path);

    match condition.operator {
        ConditionOperator::IsNull => return Ok(actual.is_none()),
        ConditionOperator::IsNotNull => return Ok(actual.is_some()),
        _ => {}
    }

    let expected = condition
        .expected_value
        .as_deref()
        .ok_or_else(|| RoutingError::MissingExpectedValue {
            operator: condition.operator.to_string(),
        })?;

    let result = match condition.operator {
        ConditionOperator::Equals => actual.as_deref() == Some(expected),
        ConditionOperator::NotEquals => actual.as_deref() != Some(expected),
        ConditionOperator::Contains => actual.is_some_and(|a| a.contains(expected)),
        ConditionOperator::NotContains => !actual.is_some_and(|a| a.contains(expected)),
        ConditionOperator::MatchesRegex => {
            let pattern = Regex::new(expected).map_err(|e| RoutingError::MalformedRegex {
                pattern: expected.to_string(),
                reason: e.to_string(),
            })?;
            actual.is_some_and(|a| pattern.is_match(&a))
        }
        ConditionOperator::GreaterThan => compare(actual.as_deref(), expected, |ord| ord.is_gt()),
        ConditionOperator::LessThan => compare(actual.as_deref(), expected, |ord| ord.is_lt()),
        ConditionOperator::InList => {
            actual.is_some_and(|a| parse_list(expected).iter().any(|item| item == &a))
        }
        ConditionOperator::NotInList => {
            !actual.is_some_and(|a| parse_list(expected).iter().any(|item| item == &a))
        }
        ConditionOperator::IsNull | ConditionOperator::IsNotNull => unreachable!(),
    };

    Ok(result)
}

/// Numeric comparison with lexicographic fallback; absent fields never match.
fn compare(actual: Option<&str>, expected: &str, check: fn(std::cmp::Ordering) -> bool) -> bool {
    let actual = match actual {
        Some(actual) => actual,
        None => return false,
    };
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(e)) => a.partial_cmp(&e).is_some_and(check),
        _ => check(actual.cmp(expected)),
    }
}

/// Parse a comma-separated list, trimming whitespace and dropping empties
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Evaluates router configurations against messages.
///
/// One engine instance per router configuration: the round-robin cursor is
/// owned, injected state rather than a process-wide static, and is the only
/// mutable state the engine carries.
#[derive(Debug, Default)]
pub struct RoutingEngine {
    round_robin_counter: AtomicU64,
}

impl RoutingEngine {
    pub fn new() -> Self {
        Self {
            round_robin_counter: AtomicU64::new(0),
        }
    }

    /// Validate router-type-specific required fields.
    ///
    /// Like mapping validation this is pure and raised at configuration
    /// time, never during dispatch.
    pub fn validate_router_config(&self, config: &RouterConfig) -> Result<(), ConfigurationError> {
        let router_type = config.router_type();
        match config {
            RouterConfig::Choice { routes } => {
                if routes.is_empty() {
                    return Err(ConfigurationError::invalid_router_config(
                        router_type,
                        "at least one choice route is required",
                    ));
                }
            }
            RouterConfig::ContentBased {
                extraction_path,
                routes,
            } => {
                if extraction_path.is_empty() {
                    return Err(ConfigurationError::invalid_router_config(
                        router_type,
                        "extraction path is required",
                    ));
                }
                if routes.is_empty() {
                    return Err(ConfigurationError::invalid_router_config(
                        router_type,
                        "at least one content route is required",
                    ));
                }
            }
            RouterConfig::RecipientList {
                recipients,
                recipient_list_variable,
            } => {
                if recipients.is_empty() && recipient_list_variable.is_none() {
                    return Err(ConfigurationError::invalid_router_config(
                        router_type,
                        "either static recipients or a recipient list variable is required",
                    ));
                }
            }
            RouterConfig::RoundRobin { targets } => {
                if targets.is_empty() {
                    return Err(ConfigurationError::invalid_router_config(
                        router_type,
                        "at least one round-robin target is required",
                    ));
                }
            }
            RouterConfig::Weighted { targets } => {
                if targets.is_empty() {
                    return Err(ConfigurationError::invalid_router_config(
                        router_type,
                        "at least one weighted target is required",
                    ));
                }
            }
        }

        // Conditions missing a required expected value are configuration
        // defects, caught here rather than at dispatch.
        for route in config_routes(config) {
            for condition in &route.conditions {
                if condition.operator.requires_expected_value()
                    && condition.expected_value.is_none()
                {
                    return Err(ConfigurationError::invalid_condition(
                        &condition.source_path,
                        format!("operator {} requires an expected value", condition.operator),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Route a message, producing a decision.
    pub fn route(&self, config: &RouterConfig, message: &FlowMessage) -> RoutingDecision {
        let decision = match config {
            RouterConfig::Choice { routes } => self.route_by_priority(routes, None, message),
            RouterConfig::ContentBased {
                extraction_path,
                routes,
            } => self.route_by_priority(routes, Some(extraction_path), message),
            RouterConfig::RecipientList {
                recipients,
                recipient_list_variable,
            } => self.route_recipient_list(recipients, recipient_list_variable.as_deref(), message),
            RouterConfig::RoundRobin { targets } => self.route_round_robin(targets),
            RouterConfig::Weighted { targets } => {
                let total: u64 = targets.iter().map(|(_, weight)| u64::from(*weight)).sum();
                let draw = if total == 0 {
                    0
                } else {
                    rand::rng().random_range(0..total)
                };
                self.route_weighted_with_draw(targets, draw)
            }
        };

        debug!(
            router_type = config.router_type(),
            decision = ?decision,
            "Routing decision"
        );
        decision
    }

    /// CHOICE/CONTENT_BASED: evaluate routes by priority descending, default
    /// route (priority 0) always last; first full match wins.
    fn route_by_priority(
        &self,
        routes: &[FlowRoute],
        extraction_path: Option<&str>,
        message: &FlowMessage,
    ) -> RoutingDecision {
        let mut ordered: Vec<&FlowRoute> = routes.iter().filter(|r| !r.is_default()).collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        for route in ordered {
            match self.route_matches(route, extraction_path, message) {
                Ok(true) => {
                    trace!(route = %route.route_name, "Route matched");
                    return RoutingDecision::matched(route.target_step.clone());
                }
                Ok(false) => {}
                Err(error) => return RoutingDecision::error(&error),
            }
        }

        match routes.iter().find(|r| r.is_default()) {
            Some(default) => RoutingDecision::matched(default.target_step.clone()),
            None => RoutingDecision::no_match(),
        }
    }

    fn route_matches(
        &self,
        route: &FlowRoute,
        extraction_path: Option<&str>,
        message: &FlowMessage,
    ) -> Result<bool, RoutingError> {
        for condition in &route.conditions {
            // Content-based routes may leave the condition path empty and
            // inherit the router's extraction path.
            let path = if condition.source_path.is_empty() {
                extraction_path.unwrap_or("")
            } else {
                &condition.source_path
            };
            if !evaluate_against_path(condition, path, message)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// RECIPIENT_LIST: fan-out to every configured recipient, static or
    /// resolved from a comma-separated message header.
    fn route_recipient_list(
        &self,
        recipients: &[String],
        variable: Option<&str>,
        message: &FlowMessage,
    ) -> RoutingDecision {
        if !recipients.is_empty() {
            return RoutingDecision::matched_all(recipients.to_vec());
        }

        let variable = match variable {
            Some(variable) => variable,
            None => return RoutingDecision::error(&RoutingError::NoTargets),
        };
        match message.headers.get(variable) {
            Some(raw) => {
                let resolved = parse_list(raw);
                if resolved.is_empty() {
                    RoutingDecision::error(&RoutingError::UnresolvedRecipientVariable {
                        variable: variable.to_string(),
                    })
                } else {
                    RoutingDecision::matched_all(resolved)
                }
            }
            None => RoutingDecision::error(&RoutingError::UnresolvedRecipientVariable {
                variable: variable.to_string(),
            }),
        }
    }

    /// ROUND_ROBIN: atomically rotating selection, safe under concurrent
    /// invocation.
    fn route_round_robin(&self, targets: &[String]) -> RoutingDecision {
        if targets.is_empty() {
            return RoutingDecision::error(&RoutingError::NoTargets);
        }
        let index =
            (self.round_robin_counter.fetch_add(1, Ordering::Relaxed) as usize) % targets.len();
        RoutingDecision::matched(targets[index].clone())
    }

    /// WEIGHTED: cumulative weights in declaration order; the first target
    /// whose cumulative weight exceeds the draw wins. Falls back to the
    /// first target on inconsistent weights.
    pub fn route_weighted_with_draw(
        &self,
        targets: &[(String, u32)],
        draw: u64,
    ) -> RoutingDecision {
        if targets.is_empty() {
            return RoutingDecision::error(&RoutingError::NoTargets);
        }

        let mut cumulative: u64 = 0;
        for (target, weight) in targets {
            cumulative += u64::from(*weight);
            if cumulative > draw {
                return RoutingDecision::matched(target.clone());
            }
        }

        // Total weight of zero or a draw past the total: inconsistent map,
        // fall back to the first target.
        RoutingDecision::matched(targets[0].0.clone())
    }
}

fn config_routes(config: &RouterConfig) -> &[FlowRoute] {
    match config {
        RouterConfig::Choice { routes } | RouterConfig::ContentBased { routes, .. } => routes,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(payload: serde_json::Value) -> FlowMessage {
        FlowMessage::new(payload)
    }

    #[test]
    fn test_string_operators() {
        let msg = message(json!({"status": "shipped", "tags": "priority,fragile"}));

        assert!(evaluate_condition(&RouteCondition::equals("status", "shipped"), &msg).unwrap());
        assert!(!evaluate_condition(&RouteCondition::equals("status", "pending"), &msg).unwrap());
        assert!(evaluate_condition(
            &RouteCondition::new("tags", ConditionOperator::Contains, Some("fragile".into())),
            &msg
        )
        .unwrap());
        assert!(evaluate_condition(
            &RouteCondition::new(
                "tags",
                ConditionOperator::NotContains,
                Some("hazmat".into())
            ),
            &msg
        )
        .unwrap());
    }

    #[test]
    fn test_numeric_operators_with_fallback() {
        let msg = message(json!({"amount": 150, "grade": "b"}));

        assert!(evaluate_condition(&RouteCondition::greater_than("amount", "100"), &msg).unwrap());
        assert!(!evaluate_condition(&RouteCondition::greater_than("amount", "200"), &msg).unwrap());
        assert!(evaluate_condition(
            &RouteCondition::new("amount", ConditionOperator::LessThan, Some("200".into())),
            &msg
        )
        .unwrap());

        // Unparseable operand falls back to lexicographic comparison
        assert!(evaluate_condition(&RouteCondition::greater_than("grade", "a"), &msg).unwrap());
        assert!(!evaluate_condition(&RouteCondition::greater_than("grade", "c"), &msg).unwrap());
    }

    #[test]
    fn test_null_operators_ignore_expected_value() {
        let msg = message(json!({"present": 1, "nil": null}));

        let is_null = RouteCondition::new("nil", ConditionOperator::IsNull, Some("junk".into()));
        assert!(evaluate_condition(&is_null, &msg).unwrap());

        let absent_is_null = RouteCondition::new("absent", ConditionOperator::IsNull, None);
        assert!(evaluate_condition(&absent_is_null, &msg).unwrap());

        let is_not_null = RouteCondition::new("present", ConditionOperator::IsNotNull, None);
        assert!(evaluate_condition(&is_not_null, &msg).unwrap());
    }

    #[test]
    fn test_list_operators_trim_and_drop_empties() {
        let msg = message(json!({"region": "emea"}));

        let in_list = RouteCondition::new(
            "region",
            ConditionOperator::InList,
            Some(" amer , emea ,, apac ".into()),
        );
        assert!(evaluate_condition(&in_list, &msg).unwrap());

        let not_in_list = RouteCondition::new(
            "region",
            ConditionOperator::NotInList,
            Some("amer,apac".into()),
        );
        assert!(evaluate_condition(&not_in_list, &msg).unwrap());
    }

    #[test]
    fn test_regex_operator_and_malformed_pattern() {
        let msg = message(json!({"sku": "AB-1234"}));

        let matches = RouteCondition::new(
            "sku",
            ConditionOperator::MatchesRegex,
            Some(r"^[A-Z]{2}-\d+$".into()),
        );
        assert!(evaluate_condition(&matches, &msg).unwrap());

        let malformed =
            RouteCondition::new("sku", ConditionOperator::MatchesRegex, Some("([".into()));
        assert!(matches!(
            evaluate_condition(&malformed, &msg),
            Err(RoutingError::MalformedRegex { .. })
        ));
    }

    #[test]
    fn test_missing_expected_value_is_error() {
        let msg = message(json!({"a": 1}));
        let condition = RouteCondition::new("a", ConditionOperator::Equals, None);
        assert!(matches!(
            evaluate_condition(&condition, &msg),
            Err(RoutingError::MissingExpectedValue { .. })
        ));
    }

    #[test]
    fn test_choice_priority_order_and_default() {
        let routes = vec![
            FlowRoute::default_route("fallback", "target-default"),
            FlowRoute::new("mid", "target-mid", 5)
                .with_condition(RouteCondition::greater_than("amount", "50")),
            FlowRoute::new("high", "target-high", 10)
                .with_condition(RouteCondition::greater_than("amount", "100")),
        ];
        let config = RouterConfig::Choice { routes };
        let engine = RoutingEngine::new();

        // Matches both priority-10 and priority-5 conditions: priority 10 wins
        let decision = engine.route(&config, &message(json!({"amount": 150})));
        assert_eq!(decision, RoutingDecision::matched("target-high"));

        // Matches only the mid route
        let decision = engine.route(&config, &message(json!({"amount": 75})));
        assert_eq!(decision, RoutingDecision::matched("target-mid"));

        // Matches none: default route wins
        let decision = engine.route(&config, &message(json!({"amount": 10})));
        assert_eq!(decision, RoutingDecision::matched("target-default"));
    }

    #[test]
    fn test_choice_without_default_reports_no_match() {
        let config = RouterConfig::Choice {
            routes: vec![FlowRoute::new("only", "target-a", 5)
                .with_condition(RouteCondition::equals("kind", "order"))],
        };
        let engine = RoutingEngine::new();
        let decision = engine.route(&config, &message(json!({"kind": "invoice"})));
        assert_eq!(decision, RoutingDecision::no_match());
    }

    #[test]
    fn test_content_based_inherits_extraction_path() {
        let config = RouterConfig::ContentBased {
            extraction_path: "order.amount".to_string(),
            routes: vec![
                FlowRoute::new("big", "target-a", 10).with_condition(RouteCondition::new(
                    "",
                    ConditionOperator::GreaterThan,
                    Some("100".into()),
                )),
                FlowRoute::default_route("rest", "target-b"),
            ],
        };
        let engine = RoutingEngine::new();

        let decision = engine.route(&config, &message(json!({"order": {"amount": 150}})));
        assert_eq!(decision, RoutingDecision::matched("target-a"));

        let decision = engine.route(&config, &message(json!({"order": {"amount": 99}})));
        assert_eq!(decision, RoutingDecision::matched("target-b"));
    }

    #[test]
    fn test_recipient_list_static_and_variable() {
        let engine = RoutingEngine::new();

        let static_config = RouterConfig::RecipientList {
            recipients: vec!["a".into(), "b".into()],
            recipient_list_variable: None,
        };
        let decision = engine.route(&static_config, &message(json!({})));
        assert_eq!(
            decision,
            RoutingDecision::matched_all(vec!["a".into(), "b".into()])
        );

        let variable_config = RouterConfig::RecipientList {
            recipients: vec![],
            recipient_list_variable: Some("downstreams".into()),
        };
        let msg = message(json!({})).header("downstreams", "x, y");
        let decision = engine.route(&variable_config, &msg);
        assert_eq!(
            decision,
            RoutingDecision::matched_all(vec!["x".into(), "y".into()])
        );

        // Unresolvable variable is an error decision, not a panic
        let decision = engine.route(&variable_config, &message(json!({})));
        assert!(matches!(decision, RoutingDecision::Error { .. }));
    }

    #[test]
    fn test_round_robin_cycles_in_order() {
        let config = RouterConfig::RoundRobin {
            targets: vec!["t0".into(), "t1".into(), "t2".into()],
        };
        let engine = RoutingEngine::new();
        let msg = message(json!({}));

        let selections: Vec<String> = (0..6)
            .map(|_| engine.route(&config, &msg).targets()[0].clone())
            .collect();
        assert_eq!(selections, vec!["t0", "t1", "t2", "t0", "t1", "t2"]);
    }

    #[test]
    fn test_weighted_draw_selection() {
        let targets = vec![("a".to_string(), 1), ("b".to_string(), 3)];
        let engine = RoutingEngine::new();

        // Draw 0 selects the first target with non-zero weight
        assert_eq!(
            engine.route_weighted_with_draw(&targets, 0),
            RoutingDecision::matched("a")
        );
        assert_eq!(
            engine.route_weighted_with_draw(&targets, 1),
            RoutingDecision::matched("b")
        );
        assert_eq!(
            engine.route_weighted_with_draw(&targets, 3),
            RoutingDecision::matched("b")
        );

        // Zero-weight head is skipped by a draw of 0
        let skewed = vec![("zero".to_string(), 0), ("one".to_string(), 1)];
        assert_eq!(
            engine.route_weighted_with_draw(&skewed, 0),
            RoutingDecision::matched("one")
        );

        // Inconsistent map (all zero) falls back to the first target
        let zeroes = vec![("z1".to_string(), 0), ("z2".to_string(), 0)];
        assert_eq!(
            engine.route_weighted_with_draw(&zeroes, 0),
            RoutingDecision::matched("z1")
        );
    }

    #[test]
    fn test_validate_router_config() {
        let engine = RoutingEngine::new();

        assert!(engine
            .validate_router_config(&RouterConfig::Choice { routes: vec![] })
            .is_err());
        assert!(engine
            .validate_router_config(&RouterConfig::ContentBased {
                extraction_path: String::new(),
                routes: vec![FlowRoute::default_route("d", "t")],
            })
            .is_err());
        assert!(engine
            .validate_router_config(&RouterConfig::RecipientList {
                recipients: vec![],
                recipient_list_variable: None,
            })
            .is_err());
        assert!(engine
            .validate_router_config(&RouterConfig::RoundRobin { targets: vec![] })
            .is_err());
        assert!(engine
            .validate_router_config(&RouterConfig::Weighted { targets: vec![] })
            .is_err());

        // Condition missing a required expected value is caught at validate
        let bad_condition = RouterConfig::Choice {
            routes: vec![FlowRoute::new("r", "t", 5).with_condition(RouteCondition::new(
                "a",
                ConditionOperator::Equals,
                None,
            ))],
        };
        assert!(matches!(
            engine.validate_router_config(&bad_condition),
            Err(ConfigurationError::InvalidCondition { .. })
        ));

        let valid = RouterConfig::RoundRobin {
            targets: vec!["a".into()],
        };
        assert!(engine.validate_router_config(&valid).is_ok());
    }
}

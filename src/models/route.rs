//! Route conditions and flow routes used by CHOICE/CONTENT_BASED routing.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comparison operator applied to a message field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    MatchesRegex,
    GreaterThan,
    LessThan,
    IsNull,
    IsNotNull,
    InList,
    NotInList,
}

impl ConditionOperator {
    /// Operators that compare against an expected value; IS_NULL and
    /// IS_NOT_NULL ignore it.
    pub fn requires_expected_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::MatchesRegex => "matches_regex",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::InList => "in_list",
            Self::NotInList => "not_in_list",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for ConditionOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            "matches_regex" => Ok(Self::MatchesRegex),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            "is_null" => Ok(Self::IsNull),
            "is_not_null" => Ok(Self::IsNotNull),
            "in_list" => Ok(Self::InList),
            "not_in_list" => Ok(Self::NotInList),
            _ => Err(format!("Invalid condition operator: {s}")),
        }
    }
}

/// One condition evaluated against a message field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteCondition {
    /// Dot/bracket path into the message payload
    pub source_path: String,
    pub operator: ConditionOperator,
    /// Required for every operator except `is_null`/`is_not_null`
    pub expected_value: Option<String>,
}

impl RouteCondition {
    pub fn new(
        source_path: impl Into<String>,
        operator: ConditionOperator,
        expected_value: Option<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            operator,
            expected_value,
        }
    }

    /// Shorthand for an equals comparison
    pub fn equals(source_path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::new(source_path, ConditionOperator::Equals, Some(expected.into()))
    }

    /// Shorthand for a numeric greater-than comparison
    pub fn greater_than(source_path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::new(
            source_path,
            ConditionOperator::GreaterThan,
            Some(expected.into()),
        )
    }
}

/// Priority reserved for the default/fallback route, always evaluated last
pub const DEFAULT_ROUTE_PRIORITY: i32 = 0;

/// A named set of AND-combined conditions plus a target step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowRoute {
    pub id: Uuid,
    pub route_name: String,
    pub target_step: String,
    /// Higher priorities evaluate first; priority 0 is the default route
    pub priority: i32,
    /// All conditions must hold (AND semantics)
    pub conditions: Vec<RouteCondition>,
}

impl FlowRoute {
    pub fn new(
        route_name: impl Into<String>,
        target_step: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            route_name: route_name.into(),
            target_step: target_step.into(),
            priority,
            conditions: Vec::new(),
        }
    }

    /// Create the default route (priority 0, no conditions)
    pub fn default_route(route_name: impl Into<String>, target_step: impl Into<String>) -> Self {
        Self::new(route_name, target_step, DEFAULT_ROUTE_PRIORITY)
    }

    /// Add a condition, returning self for chained construction
    pub fn with_condition(mut self, condition: RouteCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether this is the default/fallback route
    pub fn is_default(&self) -> bool {
        self.priority == DEFAULT_ROUTE_PRIORITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_expected_value_requirement() {
        assert!(ConditionOperator::Equals.requires_expected_value());
        assert!(ConditionOperator::InList.requires_expected_value());
        assert!(!ConditionOperator::IsNull.requires_expected_value());
        assert!(!ConditionOperator::IsNotNull.requires_expected_value());
    }

    #[test]
    fn test_operator_string_conversion() {
        assert_eq!(ConditionOperator::MatchesRegex.to_string(), "matches_regex");
        assert_eq!(
            "not_in_list".parse::<ConditionOperator>().unwrap(),
            ConditionOperator::NotInList
        );
        assert!("like".parse::<ConditionOperator>().is_err());
    }

    #[test]
    fn test_default_route() {
        let route = FlowRoute::default_route("fallback", "dead-end");
        assert!(route.is_default());
        assert!(route.conditions.is_empty());

        let other = FlowRoute::new("premium", "step-a", 10);
        assert!(!other.is_default());
    }
}

//! Routing decisions as data.

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// Outcome of routing one message through a router configuration.
///
/// A decision carries its error state instead of being thrown, so one bad
/// route cannot crash an otherwise-successful multi-target dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// One or more targets matched
    Match { targets: Vec<String> },
    /// No route matched and no default route exists
    NoMatch,
    /// Evaluation itself failed
    Error { detail: String },
}

impl RoutingDecision {
    /// A single-target match
    pub fn matched(target: impl Into<String>) -> Self {
        Self::Match {
            targets: vec![target.into()],
        }
    }

    /// A fan-out match
    pub fn matched_all(targets: Vec<String>) -> Self {
        Self::Match { targets }
    }

    /// A no-match decision
    pub fn no_match() -> Self {
        Self::NoMatch
    }

    /// An error decision from a routing failure
    pub fn error(error: &RoutingError) -> Self {
        Self::Error {
            detail: error.to_string(),
        }
    }

    /// Whether any target matched
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    /// Matched targets, empty for no-match and error decisions
    pub fn targets(&self) -> &[String] {
        match self {
            Self::Match { targets } => targets,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_accessors() {
        let matched = RoutingDecision::matched("target-a");
        assert!(matched.is_match());
        assert_eq!(matched.targets(), ["target-a".to_string()]);

        let no_match = RoutingDecision::no_match();
        assert!(!no_match.is_match());
        assert!(no_match.targets().is_empty());

        let error = RoutingDecision::error(&RoutingError::NoTargets);
        assert!(!error.is_match());
        assert!(matches!(error, RoutingDecision::Error { .. }));
    }
}

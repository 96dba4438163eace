//! Field mapping definitions owned by a flow's transformation layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::route::RouteCondition;

/// How a mapping moves data from source paths to target paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    /// Copy one source path to one target path
    Direct,
    /// Distribute one source value across multiple target paths
    Split,
    /// Combine multiple source paths into one target value
    Aggregate,
    /// Apply only if the associated predicate holds
    Conditional,
    /// Apply once per element of an array context
    Iterate,
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Split => write!(f, "split"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::Conditional => write!(f, "conditional"),
            Self::Iterate => write!(f, "iterate"),
        }
    }
}

impl std::str::FromStr for MappingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "split" => Ok(Self::Split),
            "aggregate" => Ok(Self::Aggregate),
            "conditional" => Ok(Self::Conditional),
            "iterate" => Ok(Self::Iterate),
            _ => Err(format!("Invalid mapping type: {s}")),
        }
    }
}

/// How a SPLIT mapping divides one source value across its target fields.
///
/// The source value is rendered to a string and split on `delimiter`; part
/// *i* goes to target field *i*. The last target field receives the joined
/// remainder when there are more parts than targets, and targets beyond the
/// available parts are left absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitConfig {
    pub delimiter: String,
    /// Trim whitespace from each part after splitting
    #[serde(default = "default_trim")]
    pub trim: bool,
}

fn default_trim() -> bool {
    true
}

impl SplitConfig {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            trim: true,
        }
    }
}

/// One field-level mapping definition.
///
/// Created under a parent [`FlowTransformation`], re-validated and
/// version-bumped on update, and never mutated while a dispatch holds a
/// snapshot of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldMapping {
    pub id: Uuid,
    pub source_fields: Vec<String>,
    pub target_fields: Vec<String>,
    pub mapping_type: MappingType,
    /// Required iff `mapping_type` is [`MappingType::Split`]
    pub split_config: Option<SplitConfig>,
    /// Predicate gating a [`MappingType::Conditional`] mapping
    pub condition: Option<RouteCondition>,
    /// Optional expression reference, e.g. `concat(first, last)`; validated
    /// for syntactic well-formedness only
    pub expression: Option<String>,
    pub is_array_mapping: bool,
    /// Required when `is_array_mapping` is set
    pub array_context_path: Option<String>,
    /// Execution position; mappings without an order sort last
    pub mapping_order: Option<i32>,
    /// Value written to unmapped target fields when configured; absent
    /// targets are otherwise left absent, never defaulted
    pub default_value: Option<Value>,
    /// Monotonically incremented on every successful update
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl FieldMapping {
    /// Create a DIRECT mapping from one source path to one target path
    pub fn direct(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            vec![source.into()],
            vec![target.into()],
            MappingType::Direct,
        )
    }

    /// Create a mapping with explicit source/target field sets
    pub fn new(
        source_fields: Vec<String>,
        target_fields: Vec<String>,
        mapping_type: MappingType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_fields,
            target_fields,
            mapping_type,
            split_config: None,
            condition: None,
            expression: None,
            is_array_mapping: false,
            array_context_path: None,
            mapping_order: None,
            default_value: None,
            version: 1,
            created_at: Utc::now(),
        }
    }

    /// Set the split configuration, returning self for chained construction
    pub fn with_split_config(mut self, config: SplitConfig) -> Self {
        self.split_config = Some(config);
        self
    }

    /// Set the conditional predicate
    pub fn with_condition(mut self, condition: RouteCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the execution order
    pub fn with_order(mut self, order: i32) -> Self {
        self.mapping_order = Some(order);
        self
    }

    /// Mark as an array mapping over the given context path
    pub fn with_array_context(mut self, context_path: impl Into<String>) -> Self {
        self.is_array_mapping = true;
        self.array_context_path = Some(context_path.into());
        self
    }

    /// Set the default value applied to this mapping's target fields
    pub fn with_default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Ordered container of field mappings belonging to one integration flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowTransformation {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub transformation_type: String,
    /// Unique per flow; transformations execute in ascending order
    pub execution_order: i32,
    pub active: bool,
    pub mappings: Vec<FieldMapping>,
}

impl FlowTransformation {
    pub fn new(flow_id: Uuid, transformation_type: impl Into<String>, execution_order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow_id,
            transformation_type: transformation_type.into(),
            execution_order,
            active: true,
            mappings: Vec::new(),
        }
    }

    /// Add a mapping, returning self for chained construction
    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mappings.push(mapping);
        self
    }
}

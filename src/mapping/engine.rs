//! Validation, ordering and application of field mappings.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ConfigurationError;
use crate::models::{FieldMapping, FlowMessage, FlowTransformation, MappingType};
use crate::routing::engine::evaluate_condition;

use super::path;

/// Validates and orders field-mapping definitions and applies them to
/// messages. Stateless; all inputs arrive per call.
#[derive(Debug, Clone, Default)]
pub struct MappingEngine;

impl MappingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate one mapping definition.
    ///
    /// Pure and side-effect free. Fails when source or target fields are
    /// empty, a SPLIT mapping lacks its split configuration, a DIRECT
    /// mapping names more than one target, an array mapping lacks its
    /// context path, or an expression reference is not a syntactically
    /// well-formed call.
    pub fn validate(&self, mapping: &FieldMapping) -> Result<(), ConfigurationError> {
        let mapping_id = mapping.id.to_string();

        if mapping.source_fields.is_empty() {
            return Err(ConfigurationError::invalid_mapping(
                mapping_id,
                "source fields must not be empty",
            ));
        }
        if mapping.target_fields.is_empty() {
            return Err(ConfigurationError::invalid_mapping(
                mapping_id,
                "target fields must not be empty",
            ));
        }
        if mapping.mapping_type == MappingType::Split && mapping.split_config.is_none() {
            return Err(ConfigurationError::invalid_mapping(
                mapping_id,
                "split mapping requires a split configuration",
            ));
        }
        if mapping.mapping_type == MappingType::Direct && mapping.target_fields.len() > 1 {
            return Err(ConfigurationError::invalid_mapping(
                mapping_id,
                "direct mapping cannot have more than one target field",
            ));
        }
        if (mapping.is_array_mapping || mapping.mapping_type == MappingType::Iterate)
            && mapping.array_context_path.is_none()
        {
            return Err(ConfigurationError::invalid_mapping(
                mapping_id,
                "array mapping requires an array context path",
            ));
        }
        if let Some(expression) = &mapping.expression {
            if !is_well_formed_call(expression) {
                return Err(ConfigurationError::invalid_mapping(
                    mapping_id,
                    format!("expression '{expression}' is not a well-formed function call"),
                ));
            }
        }
        for field in mapping
            .source_fields
            .iter()
            .chain(mapping.target_fields.iter())
        {
            if path::parse(field).is_none() {
                return Err(ConfigurationError::invalid_mapping(
                    mapping_id,
                    format!("field path '{field}' is not a valid locator"),
                ));
            }
        }

        Ok(())
    }

    /// Sort mappings into execution order.
    ///
    /// Ascending by `mapping_order` with missing orders last; mappings with
    /// equal order retain their original relative order. Deterministic and
    /// idempotent: re-sorting a sorted sequence yields the same sequence.
    pub fn order(&self, mappings: &[FieldMapping]) -> Vec<FieldMapping> {
        let mut ordered: Vec<FieldMapping> = mappings.to_vec();
        ordered.sort_by_key(|m| m.mapping_order.map_or((1, 0), |order| (0, order)));
        ordered
    }

    /// Apply one mapping to a source message, producing a target fragment.
    ///
    /// The fragment contains only the paths this mapping produced; unmapped
    /// target paths stay absent unless the mapping configures a default
    /// value.
    pub fn apply(&self, mapping: &FieldMapping, source: &FlowMessage) -> Value {
        let mut fragment = Value::Object(Map::new());
        self.apply_into(mapping, source, &mut fragment);
        fragment
    }

    /// Apply an ordered set of mappings and merge all fragments into one
    /// target message. Headers pass through unmodified.
    pub fn apply_all(
        &self,
        transformation: &FlowTransformation,
        source: &FlowMessage,
    ) -> Result<FlowMessage, ConfigurationError> {
        for mapping in &transformation.mappings {
            self.validate(mapping)?;
        }

        let ordered = self.order(&transformation.mappings);
        let mut payload = Value::Object(Map::new());
        for mapping in &ordered {
            self.apply_into(mapping, source, &mut payload);
        }

        debug!(
            transformation_id = %transformation.id,
            mappings = ordered.len(),
            "Applied transformation"
        );

        Ok(FlowMessage::with_headers(payload, source.headers.clone()))
    }

    /// Re-validate an updated mapping and bump its version.
    ///
    /// Returns a fresh snapshot; the original is left untouched so a
    /// dispatch holding it never observes a partial update.
    pub fn update(
        &self,
        existing: &FieldMapping,
        mut updated: FieldMapping,
    ) -> Result<FieldMapping, ConfigurationError> {
        updated.id = existing.id;
        updated.created_at = existing.created_at;
        self.validate(&updated)?;
        updated.version = existing.version + 1;
        Ok(updated)
    }

    fn apply_into(&self, mapping: &FieldMapping, source: &FlowMessage, out: &mut Value) {
        if mapping.is_array_mapping {
            self.apply_iterate(mapping, source, out);
            return;
        }

        match mapping.mapping_type {
            MappingType::Direct => self.apply_direct(mapping, source, out),
            MappingType::Split => self.apply_split(mapping, source, out),
            MappingType::Aggregate => self.apply_aggregate(mapping, source, out),
            MappingType::Conditional => self.apply_conditional(mapping, source, out),
            MappingType::Iterate => self.apply_iterate(mapping, source, out),
        }
    }

    fn apply_direct(&self, mapping: &FieldMapping, source: &FlowMessage, out: &mut Value) {
        let source_path = &mapping.source_fields[0];
        let target_path = &mapping.target_fields[0];
        match source.field(source_path) {
            Some(value) => {
                path::write(target_path, out, value.clone());
            }
            None => self.apply_default(mapping, out),
        }
    }

    fn apply_split(&self, mapping: &FieldMapping, source: &FlowMessage, out: &mut Value) {
        let config = match &mapping.split_config {
            Some(config) => config,
            None => return, // rejected by validate; nothing sane to do here
        };
        let raw = match source.field_as_string(&mapping.source_fields[0]) {
            Some(raw) => raw,
            None => {
                self.apply_default(mapping, out);
                return;
            }
        };

        let mut parts: Vec<String> = raw
            .split(config.delimiter.as_str())
            .map(|part| {
                if config.trim {
                    part.trim().to_string()
                } else {
                    part.to_string()
                }
            })
            .collect();

        let target_count = mapping.target_fields.len();
        // The last target absorbs any surplus parts.
        if parts.len() > target_count && target_count > 0 {
            let tail = parts.split_off(target_count - 1);
            parts.push(tail.join(config.delimiter.as_str()));
        }

        for (target, part) in mapping.target_fields.iter().zip(parts) {
            path::write(target, out, Value::String(part));
        }
    }

    fn apply_aggregate(&self, mapping: &FieldMapping, source: &FlowMessage, out: &mut Value) {
        let parts: Vec<String> = mapping
            .source_fields
            .iter()
            .filter_map(|field| source.field_as_string(field))
            .collect();

        if parts.is_empty() {
            self.apply_default(mapping, out);
            return;
        }

        path::write(
            &mapping.target_fields[0],
            out,
            Value::String(parts.join(" ")),
        );
    }

    fn apply_conditional(&self, mapping: &FieldMapping, source: &FlowMessage, out: &mut Value) {
        let condition = match &mapping.condition {
            Some(condition) => condition,
            None => {
                // No predicate configured: degenerates to a direct copy.
                self.apply_direct(mapping, source, out);
                return;
            }
        };

        match evaluate_condition(condition, source) {
            Ok(true) => self.apply_direct(mapping, source, out),
            Ok(false) => {}
            Err(error) => {
                warn!(
                    mapping_id = %mapping.id,
                    error = %error,
                    "Conditional mapping predicate failed to evaluate; skipping mapping"
                );
            }
        }
    }

    /// Apply the mapping once per element under the array context path.
    ///
    /// Source and target paths are relative to each element; the output
    /// array is written at the same context path.
    fn apply_iterate(&self, mapping: &FieldMapping, source: &FlowMessage, out: &mut Value) {
        let context_path = match &mapping.array_context_path {
            Some(context_path) => context_path,
            None => return, // rejected by validate
        };
        let elements = match source.field(context_path).and_then(Value::as_array) {
            Some(elements) => elements.clone(),
            None => {
                self.apply_default(mapping, out);
                return;
            }
        };

        let mut mapped = Vec::with_capacity(elements.len());
        for element in &elements {
            let mut target_element = Value::Object(Map::new());
            for (source_field, target_field) in mapping
                .source_fields
                .iter()
                .zip(mapping.target_fields.iter())
            {
                if let Some(value) = path::resolve(source_field, element) {
                    path::write(target_field, &mut target_element, value.clone());
                }
            }
            mapped.push(target_element);
        }

        path::write(context_path, out, Value::Array(mapped));
    }

    fn apply_default(&self, mapping: &FieldMapping, out: &mut Value) {
        if let Some(default) = &mapping.default_value {
            for target in &mapping.target_fields {
                path::write(target, out, default.clone());
            }
        }
    }
}

/// Check that an expression reference is a syntactically well-formed call:
/// an identifier head followed by a balanced parenthesized argument list.
fn is_well_formed_call(expression: &str) -> bool {
    let expression = expression.trim();
    let open = match expression.find('(') {
        Some(open) => open,
        None => return false,
    };
    let head = &expression[..open];
    if head.is_empty()
        || !head
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        || !head.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return false;
    }

    let mut depth = 0i32;
    for (position, c) in expression.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
                if depth == 0 && position != expression.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && expression.ends_with(')')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RouteCondition, SplitConfig};
    use serde_json::json;
    use uuid::Uuid;

    fn engine() -> MappingEngine {
        MappingEngine::new()
    }

    #[test]
    fn test_validate_direct_rejects_multiple_targets() {
        let valid = FieldMapping::direct("a", "b");
        assert!(engine().validate(&valid).is_ok());

        let invalid = FieldMapping::new(
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string()],
            MappingType::Direct,
        );
        assert!(matches!(
            engine().validate(&invalid),
            Err(ConfigurationError::InvalidMapping { .. })
        ));
    }

    #[test]
    fn test_validate_split_requires_config() {
        let missing = FieldMapping::new(
            vec!["full".to_string()],
            vec!["first".to_string(), "last".to_string()],
            MappingType::Split,
        );
        assert!(engine().validate(&missing).is_err());

        let present = missing.with_split_config(SplitConfig::new(" "));
        assert!(engine().validate(&present).is_ok());
    }

    #[test]
    fn test_validate_array_mapping_requires_context() {
        let mut mapping = FieldMapping::direct("sku", "sku");
        mapping.is_array_mapping = true;
        assert!(engine().validate(&mapping).is_err());

        mapping.array_context_path = Some("items".to_string());
        assert!(engine().validate(&mapping).is_ok());

        // An iterate mapping needs the context path even when the array
        // flag is unset
        let iterate = FieldMapping::new(
            vec!["sku".to_string()],
            vec!["item_code".to_string()],
            MappingType::Iterate,
        );
        assert!(engine().validate(&iterate).is_err());
        assert!(engine()
            .validate(&iterate.with_array_context("items"))
            .is_ok());
    }

    #[test]
    fn test_validate_empty_fields() {
        let no_sources =
            FieldMapping::new(vec![], vec!["t".to_string()], MappingType::Aggregate);
        assert!(engine().validate(&no_sources).is_err());

        let no_targets =
            FieldMapping::new(vec!["s".to_string()], vec![], MappingType::Aggregate);
        assert!(engine().validate(&no_targets).is_err());
    }

    #[test]
    fn test_expression_well_formedness() {
        assert!(is_well_formed_call("concat(first, last)"));
        assert!(is_well_formed_call("upper(trim(name))"));
        assert!(is_well_formed_call("now()"));
        assert!(!is_well_formed_call("concat(first"));
        assert!(!is_well_formed_call("(first, last)"));
        assert!(!is_well_formed_call("9concat(a)"));
        assert!(!is_well_formed_call("concat(a))extra"));
        assert!(!is_well_formed_call("just_a_name"));
    }

    #[test]
    fn test_order_missing_sorts_last_and_stable() {
        let a = FieldMapping::direct("a", "a").with_order(5);
        let b = FieldMapping::direct("b", "b");
        let c = FieldMapping::direct("c", "c").with_order(1);
        let d = FieldMapping::direct("d", "d").with_order(5);

        let input = vec![a.clone(), b.clone(), c.clone(), d.clone()];
        let ordered = engine().order(&input);
        assert_eq!(
            ordered.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![c.id, a.id, d.id, b.id]
        );

        // Idempotent: re-sorting yields the same sequence
        let reordered = engine().order(&ordered);
        assert_eq!(reordered, ordered);
    }

    #[test]
    fn test_apply_direct() {
        let mapping = FieldMapping::direct("customer.name", "contact.full_name");
        let source = FlowMessage::new(json!({"customer": {"name": "Ada Lovelace"}}));
        let fragment = engine().apply(&mapping, &source);
        assert_eq!(fragment, json!({"contact": {"full_name": "Ada Lovelace"}}));
    }

    #[test]
    fn test_apply_split_distributes_and_remainder() {
        let mapping = FieldMapping::new(
            vec!["full_name".to_string()],
            vec!["first".to_string(), "rest".to_string()],
            MappingType::Split,
        )
        .with_split_config(SplitConfig::new(" "));

        let source = FlowMessage::new(json!({"full_name": "Ada King Lovelace"}));
        let fragment = engine().apply(&mapping, &source);
        assert_eq!(fragment, json!({"first": "Ada", "rest": "King Lovelace"}));
    }

    #[test]
    fn test_apply_split_missing_parts_leave_targets_absent() {
        let mapping = FieldMapping::new(
            vec!["full_name".to_string()],
            vec!["first".to_string(), "last".to_string(), "suffix".to_string()],
            MappingType::Split,
        )
        .with_split_config(SplitConfig::new(" "));

        let source = FlowMessage::new(json!({"full_name": "Ada Lovelace"}));
        let fragment = engine().apply(&mapping, &source);
        assert_eq!(fragment, json!({"first": "Ada", "last": "Lovelace"}));
        assert!(fragment.get("suffix").is_none());
    }

    #[test]
    fn test_apply_aggregate() {
        let mapping = FieldMapping::new(
            vec!["first".to_string(), "last".to_string()],
            vec!["full_name".to_string()],
            MappingType::Aggregate,
        );
        let source = FlowMessage::new(json!({"first": "Ada", "last": "Lovelace"}));
        let fragment = engine().apply(&mapping, &source);
        assert_eq!(fragment, json!({"full_name": "Ada Lovelace"}));
    }

    #[test]
    fn test_apply_conditional() {
        let mapping = FieldMapping::new(
            vec!["amount".to_string()],
            vec!["big_amount".to_string()],
            MappingType::Conditional,
        )
        .with_condition(RouteCondition::greater_than("amount", "100"));

        let matching = FlowMessage::new(json!({"amount": 150}));
        assert_eq!(
            engine().apply(&mapping, &matching),
            json!({"big_amount": 150})
        );

        let non_matching = FlowMessage::new(json!({"amount": 50}));
        assert_eq!(engine().apply(&mapping, &non_matching), json!({}));
    }

    #[test]
    fn test_apply_iterate_over_array_context() {
        let mapping = FieldMapping::new(
            vec!["sku".to_string(), "qty".to_string()],
            vec!["item_code".to_string(), "quantity".to_string()],
            MappingType::Iterate,
        )
        .with_array_context("order.items");

        let source = FlowMessage::new(json!({
            "order": {"items": [
                {"sku": "A-1", "qty": 2},
                {"sku": "B-2", "qty": 5}
            ]}
        }));
        let fragment = engine().apply(&mapping, &source);
        assert_eq!(
            fragment,
            json!({"order": {"items": [
                {"item_code": "A-1", "quantity": 2},
                {"item_code": "B-2", "quantity": 5}
            ]}})
        );
    }

    #[test]
    fn test_default_value_applied_only_when_source_absent() {
        let mapping = FieldMapping::direct("nickname", "contact.nickname")
            .with_default_value(json!("n/a"));

        let absent = FlowMessage::new(json!({}));
        assert_eq!(
            engine().apply(&mapping, &absent),
            json!({"contact": {"nickname": "n/a"}})
        );

        let present = FlowMessage::new(json!({"nickname": "Al"}));
        assert_eq!(
            engine().apply(&mapping, &present),
            json!({"contact": {"nickname": "Al"}})
        );
    }

    #[test]
    fn test_apply_all_merges_fragments_in_order() {
        let transformation = FlowTransformation::new(Uuid::new_v4(), "field_mapping", 1)
            .with_mapping(FieldMapping::direct("a", "out.first").with_order(1))
            .with_mapping(FieldMapping::direct("b", "out.second").with_order(2));

        let source = FlowMessage::new(json!({"a": 1, "b": 2}))
            .header("correlation-id", "c-1");
        let result = engine().apply_all(&transformation, &source).unwrap();
        assert_eq!(result.payload, json!({"out": {"first": 1, "second": 2}}));
        assert_eq!(
            result.headers.get("correlation-id").map(String::as_str),
            Some("c-1")
        );
    }

    #[test]
    fn test_update_bumps_version_and_revalidates() {
        let original = FieldMapping::direct("a", "b");
        let mut changed = original.clone();
        changed.source_fields = vec!["c".to_string()];

        let updated = engine().update(&original, changed).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.id, original.id);
        // Original snapshot untouched
        assert_eq!(original.version, 1);

        let mut broken = original.clone();
        broken.target_fields.clear();
        assert!(engine().update(&original, broken).is_err());
    }
}

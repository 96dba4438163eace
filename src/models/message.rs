//! Message shape shared by the mapping engine, routing engine and dispatcher.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message moving through a flow: a structured payload plus a string-keyed
/// header map.
///
/// Field paths used by mappings and route conditions are dot/bracket-style
/// locators (`order.items[2].sku`) resolved against the payload's structured
/// form; see [`crate::mapping::path`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowMessage {
    pub payload: Value,
    pub headers: HashMap<String, String>,
}

impl FlowMessage {
    /// Create a message from a payload with no headers
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            headers: HashMap::new(),
        }
    }

    /// Create a message with payload and headers
    pub fn with_headers(payload: Value, headers: HashMap<String, String>) -> Self {
        Self { payload, headers }
    }

    /// Set a header, returning self for chained construction
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Resolve a field path against the payload
    pub fn field(&self, path: &str) -> Option<&Value> {
        crate::mapping::path::resolve(path, &self.payload)
    }

    /// Resolve a field path and render it as a comparison string.
    ///
    /// Strings render without surrounding quotes; other JSON values render
    /// in their serialized form. Absent fields and explicit nulls both
    /// return `None`.
    pub fn field_as_string(&self, path: &str) -> Option<String> {
        match self.field(path) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

impl Default for FlowMessage {
    fn default() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_resolution() {
        let message = FlowMessage::new(json!({
            "order": { "id": "o-77", "amount": 150.5, "items": [{"sku": "A"}, {"sku": "B"}] }
        }));

        assert_eq!(message.field("order.id"), Some(&json!("o-77")));
        assert_eq!(message.field("order.items[1].sku"), Some(&json!("B")));
        assert_eq!(message.field("order.missing"), None);
    }

    #[test]
    fn test_field_as_string() {
        let message = FlowMessage::new(json!({
            "name": "ada", "count": 3, "active": true, "gone": null
        }));

        assert_eq!(message.field_as_string("name").as_deref(), Some("ada"));
        assert_eq!(message.field_as_string("count").as_deref(), Some("3"));
        assert_eq!(message.field_as_string("active").as_deref(), Some("true"));
        assert_eq!(message.field_as_string("gone"), None);
        assert_eq!(message.field_as_string("absent"), None);
    }

    #[test]
    fn test_header_builder() {
        let message = FlowMessage::new(json!({})).header("source", "sftp-inbound");
        assert_eq!(message.headers.get("source").map(String::as_str), Some("sftp-inbound"));
    }
}

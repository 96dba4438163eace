//! Dot/bracket field-path resolution over JSON payloads.
//!
//! Paths are locators like `order.items[2].sku`: dot-separated object keys
//! with optional `[index]` array subscripts. Reads return `None` for any
//! missing segment; writes create intermediate objects and extend arrays
//! with nulls as needed.

use serde_json::{Map, Value};

/// One parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parse a locator into segments.
///
/// Returns `None` for syntactically broken paths (unbalanced brackets,
/// non-numeric subscripts, empty keys).
pub fn parse(path: &str) -> Option<Vec<PathSegment>> {
    if path.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }
        let mut rest = part;
        // Leading key before any subscript
        if !rest.starts_with('[') {
            let key_end = rest.find('[').unwrap_or(rest.len());
            segments.push(PathSegment::Key(rest[..key_end].to_string()));
            rest = &rest[key_end..];
        }
        // Zero or more [index] subscripts
        while !rest.is_empty() {
            if !rest.starts_with('[') {
                return None;
            }
            let close = rest.find(']')?;
            let index: usize = rest[1..close].parse().ok()?;
            segments.push(PathSegment::Index(index));
            rest = &rest[close + 1..];
        }
    }
    Some(segments)
}

/// Resolve a path against a JSON value
pub fn resolve<'a>(path: &str, root: &'a Value) -> Option<&'a Value> {
    let segments = parse(path)?;
    let mut current = root;
    for segment in &segments {
        current = match segment {
            PathSegment::Key(key) => current.as_object()?.get(key)?,
            PathSegment::Index(index) => current.as_array()?.get(*index)?,
        };
    }
    Some(current)
}

/// Write a value at a path, creating intermediate objects and arrays.
///
/// Returns false when the path is unparseable or an existing intermediate
/// value has an incompatible shape (e.g. indexing into a string).
pub fn write(path: &str, root: &mut Value, value: Value) -> bool {
    let segments = match parse(path) {
        Some(segments) => segments,
        None => return false,
    };

    let mut current = root;
    for (position, segment) in segments.iter().enumerate() {
        let last = position == segments.len() - 1;
        match segment {
            PathSegment::Key(key) => {
                if current.is_null() {
                    *current = Value::Object(Map::new());
                }
                let object = match current.as_object_mut() {
                    Some(object) => object,
                    None => return false,
                };
                if last {
                    object.insert(key.clone(), value);
                    return true;
                }
                current = object
                    .entry(key.clone())
                    .or_insert(Value::Null);
            }
            PathSegment::Index(index) => {
                if current.is_null() {
                    *current = Value::Array(Vec::new());
                }
                let array = match current.as_array_mut() {
                    Some(array) => array,
                    None => return false,
                };
                while array.len() <= *index {
                    array.push(Value::Null);
                }
                if last {
                    array[*index] = value;
                    return true;
                }
                current = &mut array[*index];
            }
        }
    }
    false
}

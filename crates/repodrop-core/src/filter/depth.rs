//! Depth limiting for nested filter documents.

use serde_json::{Map, Value};

/// Rebuild `value` without anything nested deeper than `max_depth`.
///
/// The value passed in sits at depth 0 and each object member sits one level
/// below its parent. Any member (scalar, array or object) deeper than the
/// limit is removed, and an object left empty by removal is removed from its
/// parent in turn. Arrays are leaves: their contents are never inspected.
/// Returns `None` when the value itself is removed.
pub fn limit_depth(value: &Value, max_depth: usize) -> Option<Value> {
    limit_at(value, 0, max_depth)
}

fn limit_at(value: &Value, depth: usize, max_depth: usize) -> Option<Value> {
    if depth > max_depth {
        return None;
    }

    let Value::Object(map) = value else {
        return Some(value.clone());
    };

    let limited: Map<String, Value> = map
        .iter()
        .filter_map(|(key, child)| {
            limit_at(child, depth + 1, max_depth).map(|kept| (key.clone(), kept))
        })
        .collect();

    if limited.is_empty() {
        None
    } else {
        Some(Value::Object(limited))
    }
}

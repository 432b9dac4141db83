//! Query operators that a caller-supplied filter may never contain.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operators that run server-side code, join or scan other collections,
/// expose server or session state, or match unbounded regular expressions.
pub const STANDARD_DENIED_OPERATORS: &[&str] = &[
    "$listLocalSessions",
    "$listSessions",
    "$listSearchIndexes",
    "$listSampledQueries",
    "$indexStats",
    "$limit",
    "$documents",
    "$regex",
    "$func",
    "$lookup",
    "$where",
    "$currentOp",
    "$changeStream",
    "$vectorSearch",
    "$unwind",
    "$unset",
    "$setWindowFields",
    "$search",
    "$searchMeta",
    "$queryStats",
    "$planCacheStats",
    "$collStats",
    "$graphLookup",
    "$replaceRoot",
    "$mergeObjects",
    "$setUnion",
    "$setIntersection",
    "$meta",
    "$zip",
    "$unionWith",
    "$match",
    "$out",
    "$merge",
    "$accumulator",
    "$function",
    "$set",
    "$javascript",
    "$code",
    "$eval",
];

/// A set of operator names matched exactly against filter keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorDenylist {
    operators: BTreeSet<String>,
}

impl OperatorDenylist {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        STANDARD_DENIED_OPERATORS
            .iter()
            .fold(Self::empty(), |list, op| list.with_operator(*op))
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operators.insert(operator.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.operators.contains(key)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// First denied key found anywhere in `value`.
    ///
    /// Every object key at every level is checked, including objects nested
    /// inside arrays. Keys are visited in document order, depth first.
    pub fn find_denied<'a>(&self, value: &'a Value) -> Option<&'a str> {
        match value {
            Value::Object(map) => map.iter().find_map(|(key, child)| {
                if self.contains(key) {
                    Some(key.as_str())
                } else {
                    self.find_denied(child)
                }
            }),
            Value::Array(items) => items.iter().find_map(|item| self.find_denied(item)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_list() {
        let list = OperatorDenylist::standard();
        assert_eq!(list.len(), STANDARD_DENIED_OPERATORS.len());
        assert!(list.contains("$where"));
        assert!(list.contains("$lookup"));
        assert!(!list.contains("$eq"));
        assert!(!list.contains("$WHERE"));
    }

    #[test]
    fn test_top_level_key_is_denied() {
        let list = OperatorDenylist::standard();
        let filter = json!({"$where": "sleep(10000)", "name": "admin"});
        assert_eq!(list.find_denied(&filter), Some("$where"));
    }

    #[test]
    fn test_nested_key_is_denied() {
        let list = OperatorDenylist::standard();
        let filter = json!({"username": {"$regex": "^a"}});
        assert_eq!(list.find_denied(&filter), Some("$regex"));
    }

    #[test]
    fn test_key_inside_array_is_denied() {
        let list = OperatorDenylist::standard();
        let filter = json!({"$or": [{"username": "a"}, {"$where": "1"}]});
        assert_eq!(list.find_denied(&filter), Some("$where"));
    }

    #[test]
    fn test_values_are_not_checked() {
        let list = OperatorDenylist::standard();
        let filter = json!({"username": "$where"});
        assert_eq!(list.find_denied(&filter), None);
    }

    #[test]
    fn test_custom_list() {
        let list = OperatorDenylist::empty().with_operator("$ne");
        assert_eq!(list.find_denied(&json!({"a": {"$ne": 1}})), Some("$ne"));
        assert_eq!(list.find_denied(&json!({"$where": "x"})), None);
    }
}

//! Sanitizing caller-supplied aggregation filters.
//!
//! A filter passes four gates in order: it must be a non-empty JSON object,
//! have at most `max_keys` top-level keys, contain no denied operator at any
//! level, and survive depth limiting. The survivor becomes the first stage of
//! a capped, time-bounded pipeline.

pub mod denylist;
pub mod depth;
pub mod executor;

use std::time::Instant;

use serde_json::Value;

use repodrop_state::AggregateSource;

use crate::config::FilterPolicy;
use crate::error::FilterError;
use crate::obs;

pub use denylist::OperatorDenylist;
pub use depth::limit_depth;
pub use executor::{build_pipeline, execute_bounded};

/// Apply the shape, denylist and depth gates. Returns the filter to execute.
pub fn sanitize_filter(filter: &Value, policy: &FilterPolicy) -> Result<Value, FilterError> {
    let Value::Object(map) = filter else {
        return Err(FilterError::NotAnObject);
    };
    if map.is_empty() {
        return Err(FilterError::Empty);
    }
    if map.len() > policy.max_keys {
        return Err(FilterError::TooManyKeys {
            count: map.len(),
            limit: policy.max_keys,
        });
    }
    if let Some(operator) = policy.denylist.find_denied(filter) {
        return Err(FilterError::DeniedOperator {
            operator: operator.to_string(),
        });
    }

    limit_depth(filter, policy.max_depth).ok_or(FilterError::TooDeep)
}

/// Sanitize `filter` and execute it against `source`.
pub async fn run_search<S>(
    source: &S,
    filter: &Value,
    policy: &FilterPolicy,
) -> Result<Vec<Value>, FilterError>
where
    S: AggregateSource + ?Sized,
{
    let start = Instant::now();
    let outcome = match sanitize_filter(filter, policy) {
        Ok(sanitized) => execute_bounded(source, sanitized, policy).await,
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(results) => {
            obs::emit_search_completed(results.len(), start.elapsed().as_millis() as u64)
        }
        Err(e) => obs::emit_filter_failed(e),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> FilterPolicy {
        FilterPolicy::default()
    }

    #[test]
    fn test_non_object_is_rejected() {
        for filter in [json!([1, 2]), json!("x"), json!(null), json!(7)] {
            assert!(matches!(
                sanitize_filter(&filter, &policy()),
                Err(FilterError::NotAnObject)
            ));
        }
    }

    #[test]
    fn test_empty_object_is_missing() {
        assert!(matches!(
            sanitize_filter(&json!({}), &policy()),
            Err(FilterError::Empty)
        ));
    }

    #[test]
    fn test_key_count_checked_before_denylist() {
        let filter = json!({"$where": 1, "b": 1, "c": 1, "d": 1, "e": 1, "f": 1});
        assert!(matches!(
            sanitize_filter(&filter, &policy()),
            Err(FilterError::TooManyKeys { count: 6, limit: 5 })
        ));
    }

    #[test]
    fn test_denylist_checked_before_depth() {
        let filter = json!({"a": {"b": {"$where": "1"}}});
        assert!(matches!(
            sanitize_filter(&filter, &policy()),
            Err(FilterError::DeniedOperator { operator }) if operator == "$where"
        ));
    }

    #[test]
    fn test_too_deep_is_rejected() {
        let filter = json!({"$project": {"a": {"b": 1}}});
        assert!(matches!(
            sanitize_filter(&filter, &policy()),
            Err(FilterError::TooDeep)
        ));
    }

    #[test]
    fn test_acceptable_filter_is_returned() {
        let filter = json!({"$project": {"username": 1, "email": 1}});
        assert_eq!(sanitize_filter(&filter, &policy()).unwrap(), filter);
    }
}

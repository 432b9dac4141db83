//! Execution of a sanitized filter under a result cap and a time budget.

use serde_json::{json, Value};
use tracing::debug;

use repodrop_state::AggregateSource;

use crate::config::FilterPolicy;
use crate::error::FilterError;

/// `[filter, {"$limit": cap}]`
pub fn build_pipeline(filter: Value, cap: u32) -> Vec<Value> {
    vec![filter, json!({ "$limit": cap })]
}

/// Run `filter` as the first stage of a capped pipeline.
///
/// The wall-clock budget covers the whole call, including cursor draining.
/// Timeouts from either the local clock or the backend surface as
/// [`FilterError::Timeout`]; zero matches is an empty `Ok`.
pub async fn execute_bounded<S>(
    source: &S,
    filter: Value,
    policy: &FilterPolicy,
) -> Result<Vec<Value>, FilterError>
where
    S: AggregateSource + ?Sized,
{
    let pipeline = build_pipeline(filter, policy.result_cap);
    let budget = policy.timeout();
    let limit_ms = policy.timeout_ms;

    debug!(stages = pipeline.len(), limit_ms, "executing aggregation");

    let mut results = match tokio::time::timeout(budget, source.aggregate(pipeline, budget)).await
    {
        Err(_) => return Err(FilterError::Timeout { limit_ms }),
        Ok(Err(e)) if e.is_timeout() => return Err(FilterError::Timeout { limit_ms }),
        Ok(Err(e)) => return Err(FilterError::Backend(e.to_string())),
        Ok(Ok(results)) => results,
    };

    results.truncate(policy.result_cap as usize);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodrop_state::fakes::MemoryAggregateSource;
    use std::time::Duration;

    #[test]
    fn test_pipeline_shape() {
        let pipeline = build_pipeline(json!({"$project": {"username": 1}}), 2);
        assert_eq!(
            pipeline,
            vec![json!({"$project": {"username": 1}}), json!({"$limit": 2})]
        );
    }

    #[tokio::test]
    async fn test_results_are_capped() {
        let source = MemoryAggregateSource::new(vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
        let results = execute_bounded(&source, json!({"$project": {"n": 1}}), &FilterPolicy::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_no_matches_is_not_an_error() {
        let source = MemoryAggregateSource::new(Vec::new());
        let results = execute_bounded(&source, json!({"$project": {"n": 1}}), &FilterPolicy::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let source = MemoryAggregateSource::new(vec![json!({"n": 1})])
            .with_delay(Duration::from_secs(30));
        let err = execute_bounded(&source, json!({"$project": {"n": 1}}), &FilterPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Timeout { limit_ms: 4000 }));
    }

    #[tokio::test]
    async fn test_backend_failure_is_distinct_from_timeout() {
        let source = MemoryAggregateSource::new(Vec::new()).failing("connection reset");
        let err = execute_bounded(&source, json!({"$project": {"n": 1}}), &FilterPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Backend(msg) if msg.contains("connection reset")));
    }
}

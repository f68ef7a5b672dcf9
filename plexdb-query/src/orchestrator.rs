//! Parallel fan-out execution against shard targets.
//!
//! Every targeted shard's invocation is launched eagerly and raced against
//! its own timeout; the orchestrator then waits for all of them to settle.
//! Waiting for all rather than failing fast is deliberate: losing a shard's
//! data silently is worse than waiting for a slow shard to time out, so
//! partial failure is enumerated in the result instead of aborting the call.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use plexdb_cluster::{RouteKey, ShardRouter, ShardTarget};
use serde::Serialize;

use crate::error::QueryError;
use crate::merge::{self, ShardResult};
use crate::query::{PointResult, QueryPlanEntry, ScatterQuery, ScatterResult, ShardOutcome};

enum Invocation<T> {
    Success(Vec<T>),
    Failed(String),
    TimedOut,
}

/// Executes point and scatter queries against the shards a [`ShardRouter`]
/// selects. Stateless between calls; share freely across tasks.
pub struct QueryOrchestrator {
    router: Arc<ShardRouter>,
}

impl QueryOrchestrator {
    pub fn new(router: Arc<ShardRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    /// Resolve one shard for `key` (failover-aware) and invoke `query_fn`
    /// against it exactly once. No concurrency, no merge.
    pub async fn point<T, F, Fut>(
        &self,
        entity_type: &str,
        key: impl Into<RouteKey>,
        query_fn: F,
    ) -> Result<PointResult<T>, QueryError>
    where
        F: FnOnce(ShardTarget) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<Vec<T>>>,
    {
        let shard = self.router.resolve_with_failover(entity_type, key)?;
        let data = query_fn(shard.clone()).await.map_err(QueryError::Shard)?;
        Ok(PointResult { data, shard })
    }

    /// Fan the query out to every target shard concurrently, wait for all
    /// invocations to settle, merge the successful partial results, and
    /// paginate the merged sequence.
    ///
    /// Never fails: shard errors and timeouts are recorded in the query
    /// plan and excluded from the merge. Callers that need fail-fast
    /// semantics must inspect `shards_failed` themselves.
    pub async fn scatter<T>(&self, query: ScatterQuery<T>) -> ScatterResult<T>
    where
        T: Serialize + Send + 'static,
    {
        let started = Instant::now();
        let targets = match &query.shards {
            Some(shards) => shards.clone(),
            None => self.router.all_shards(),
        };
        tracing::debug!("scatter to {} shards, timeout {:?}", targets.len(), query.timeout);

        // Launch every invocation eagerly, each isolated behind its own
        // timeout race. One shard failing or stalling cannot cancel or
        // corrupt another's in-flight work.
        let invocations = targets.iter().map(|target| {
            let shard = target.clone();
            let query_fn = Arc::clone(&query.query_fn);
            let per_shard_timeout = query.timeout;
            async move {
                let shard_started = Instant::now();
                let outcome =
                    match tokio::time::timeout(per_shard_timeout, (query_fn)(shard.clone())).await
                    {
                        Ok(Ok(rows)) => Invocation::Success(rows),
                        Ok(Err(error)) => Invocation::Failed(error.to_string()),
                        Err(_) => Invocation::TimedOut,
                    };
                (shard, outcome, shard_started.elapsed())
            }
        });
        let settled = join_all(invocations).await;

        let mut query_plan = Vec::with_capacity(settled.len());
        let mut successes: Vec<ShardResult<T>> = Vec::new();
        let mut failed_shards = Vec::new();
        let mut total_from_shards = 0usize;

        for (shard, outcome, elapsed) in settled {
            let duration_ms = elapsed.as_millis() as u64;
            match outcome {
                Invocation::Success(rows) => {
                    total_from_shards += rows.len();
                    query_plan.push(QueryPlanEntry {
                        shard_id: shard.shard_id.clone(),
                        status: ShardOutcome::Success,
                        rows: rows.len(),
                        duration_ms,
                        error: None,
                    });
                    successes.push(ShardResult { shard, data: rows });
                }
                Invocation::Failed(message) => {
                    tracing::warn!("shard {} query failed: {}", shard.shard_id, message);
                    query_plan.push(QueryPlanEntry {
                        shard_id: shard.shard_id.clone(),
                        status: ShardOutcome::Error,
                        rows: 0,
                        duration_ms,
                        error: Some(message),
                    });
                    failed_shards.push(shard.shard_id);
                }
                Invocation::TimedOut => {
                    tracing::warn!(
                        "shard {} timed out after {}ms",
                        shard.shard_id,
                        query.timeout.as_millis()
                    );
                    query_plan.push(QueryPlanEntry {
                        shard_id: shard.shard_id.clone(),
                        status: ShardOutcome::Timeout,
                        rows: 0,
                        duration_ms,
                        error: Some(format!("timed out after {}ms", query.timeout.as_millis())),
                    });
                    failed_shards.push(shard.shard_id);
                }
            }
        }

        let shards_queried = targets.len();
        let shards_failed = failed_shards.len();
        let shards_succeeded = shards_queried - shards_failed;

        let merged = merge::apply(successes, &query.merge);
        let data = paginate(merged, query.offset, query.limit);
        let duration_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            "scatter complete: {}/{} shards in {}ms, {} rows",
            shards_succeeded,
            shards_queried,
            duration_ms,
            data.len()
        );

        ScatterResult {
            data,
            total_from_shards,
            shards_queried,
            shards_succeeded,
            shards_failed,
            failed_shards,
            duration_ms,
            query_plan,
        }
    }
}

/// Offset/limit over the merged sequence, never per-shard.
fn paginate<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    match limit {
        Some(limit) => items.into_iter().skip(offset).take(limit).collect(),
        None if offset == 0 => items,
        None => items.into_iter().skip(offset).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_slices_merged_sequence() {
        let items: Vec<i32> = (0..10).collect();
        assert_eq!(paginate(items.clone(), 3, Some(4)), vec![3, 4, 5, 6]);
        assert_eq!(paginate(items.clone(), 8, Some(4)), vec![8, 9]);
        assert_eq!(paginate(items.clone(), 0, None), items);
        assert_eq!(paginate(items, 9, None), vec![9]);
    }
}

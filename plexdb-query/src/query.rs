//! Scatter query requests and their result/diagnostic records.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use plexdb_cluster::ShardTarget;
use serde::Serialize;

use crate::merge::MergeStrategy;

/// Per-shard wait bound when none is configured.
pub const DEFAULT_SHARD_TIMEOUT: Duration = Duration::from_secs(5);

/// The caller-supplied query callback, invoked once per target shard.
///
/// This is the only place the subsystem calls back into the surrounding
/// application. It is treated as opaque: it may be slow, it may fail, and
/// it may exceed the timeout.
pub type QueryFn<T> =
    Arc<dyn Fn(ShardTarget) -> BoxFuture<'static, anyhow::Result<Vec<T>>> + Send + Sync>;

/// A scatter-gather request: the per-shard query, the target set, the merge
/// strategy, pagination, and the per-shard timeout.
pub struct ScatterQuery<T> {
    pub(crate) query_fn: QueryFn<T>,
    pub(crate) shards: Option<Vec<ShardTarget>>,
    pub(crate) merge: MergeStrategy<T>,
    pub(crate) offset: usize,
    pub(crate) limit: Option<usize>,
    pub(crate) timeout: Duration,
}

impl<T> ScatterQuery<T> {
    pub fn new<F, Fut>(query_fn: F) -> Self
    where
        F: Fn(ShardTarget) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<T>>> + Send + 'static,
    {
        Self {
            query_fn: Arc::new(move |shard| query_fn(shard).boxed()),
            shards: None,
            merge: MergeStrategy::Concat,
            offset: 0,
            limit: None,
            timeout: DEFAULT_SHARD_TIMEOUT,
        }
    }

    /// Restrict the query to an explicit shard set. Defaults to all shards.
    pub fn shards(mut self, shards: Vec<ShardTarget>) -> Self {
        self.shards = Some(shards);
        self
    }

    pub fn merge(mut self, strategy: MergeStrategy<T>) -> Self {
        self.merge = strategy;
        self
    }

    /// Skip `offset` items of the merged sequence, never per-shard.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Cap the merged sequence at `limit` items, applied after `offset`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Outcome of one shard's invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardOutcome {
    Success,
    Timeout,
    Error,
}

/// Diagnostic record for one targeted shard, produced fresh per scatter.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlanEntry {
    pub shard_id: String,
    pub status: ShardOutcome,
    pub rows: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The merged, paginated response of a scatter query, together with a full
/// account of what happened on every shard.
#[derive(Debug, Serialize)]
pub struct ScatterResult<T> {
    pub data: Vec<T>,
    /// Sum of raw per-shard row counts before merge and pagination.
    pub total_from_shards: usize,
    pub shards_queried: usize,
    pub shards_succeeded: usize,
    pub shards_failed: usize,
    pub failed_shards: Vec<String>,
    /// Wall clock for the whole scatter, bounded by the per-shard timeout
    /// plus merge overhead.
    pub duration_ms: u64,
    pub query_plan: Vec<QueryPlanEntry>,
}

/// Response of a single-shard point query.
#[derive(Debug, Serialize)]
pub struct PointResult<T> {
    pub data: Vec<T>,
    pub shard: ShardTarget,
}

//! Scatter-gather query orchestration for PlexDB.
//!
//! Fans a caller-supplied query out to some or all shards concurrently,
//! bounds each shard's wall-clock time, merges the partial results under a
//! pluggable strategy, and reports exactly what happened per shard. Partial
//! shard failure is data, not an exception: a scatter always returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plexdb_query::{MergeStrategy, QueryOrchestrator, ScatterQuery, SortDirection};
//! use plexdb_query::{RouterConfig, ShardRouter};
//!
//! let router = Arc::new(ShardRouter::new(RouterConfig::default()));
//! let orchestrator = QueryOrchestrator::new(router);
//!
//! let result = orchestrator
//!     .scatter(
//!         ScatterQuery::new(|shard| async move { fetch_posts(&shard).await })
//!             .merge(MergeStrategy::sort("created_at", SortDirection::Desc))
//!             .limit(20),
//!     )
//!     .await;
//!
//! if result.shards_failed > 0 {
//!     // Partial results: decide whether that is acceptable here.
//! }
//! ```

pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod query;

// Re-exports
pub use error::QueryError;
pub use merge::{MergeFn, MergeStrategy, ShardResult, SortDirection};
pub use orchestrator::QueryOrchestrator;
pub use query::{
    PointResult, QueryFn, QueryPlanEntry, ScatterQuery, ScatterResult, ShardOutcome,
    DEFAULT_SHARD_TIMEOUT,
};

// Routing types callers need alongside the orchestrator.
pub use plexdb_cluster::{RouteKey, RouterConfig, ShardRouter, ShardTarget};

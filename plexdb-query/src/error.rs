use plexdb_cluster::ClusterError;
use thiserror::Error;

/// Errors surfaced by point queries and orchestrator construction.
///
/// `scatter` never returns these: per-shard failures and timeouts are
/// routine conditions reported inside the [`crate::ScatterResult`].
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Routing(#[from] ClusterError),

    #[error("shard query failed: {0}")]
    Shard(anyhow::Error),
}

//! Shard routing for PlexDB.
//!
//! Deterministically maps partition keys to logical shards over a
//! consistent-hash ring, tracks per-shard health, and fails over to the
//! next healthy shard when a primary is down. The router performs no I/O
//! of its own; it only answers "which shard owns this key".
//!
//! # Example
//!
//! ```rust,ignore
//! use plexdb_cluster::{RouterConfig, ShardRouter};
//!
//! let router = ShardRouter::new(RouterConfig::default());
//! let target = router.resolve("user", "user-42")?;
//! println!("user-42 lives on {}", target.shard_id);
//! ```

pub mod error;
pub mod health;
pub mod ring;
pub mod router;

// Re-exports
pub use error::{ClusterError, Result};
pub use health::ShardHealth;
pub use ring::HashRing;
pub use router::{FailoverPolicy, KeyExtractor, RouteKey, RouterConfig, ShardRouter, ShardTarget};

//! Deterministic key-to-shard routing with health-aware failover.
//!
//! The router owns the hash ring, the shard health map, and the per-entity
//! key-extraction policy. It performs no I/O: callers resolve a key to a
//! [`ShardTarget`] and run their own query against whatever backs that shard.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{ClusterError, Result};
use crate::health::{HealthRegistry, ShardHealth};
use crate::ring::HashRing;

/// Identifies one logical shard. Produced by the router, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ShardTarget {
    pub shard_id: String,
    pub shard_index: usize,
}

/// Derives a partition key from a structured entity.
pub type KeyExtractor = Arc<dyn Fn(&serde_json::Value) -> Option<String> + Send + Sync>;

/// A routing key: either a raw partition key or a structured entity that
/// still needs one extracted.
#[derive(Debug, Clone)]
pub enum RouteKey {
    Raw(String),
    Entity(serde_json::Value),
}

impl From<&str> for RouteKey {
    fn from(key: &str) -> Self {
        RouteKey::Raw(key.to_string())
    }
}

impl From<String> for RouteKey {
    fn from(key: String) -> Self {
        RouteKey::Raw(key)
    }
}

impl From<serde_json::Value> for RouteKey {
    fn from(entity: serde_json::Value) -> Self {
        RouteKey::Entity(entity)
    }
}

/// What `resolve_with_failover` does when every shard is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailoverPolicy {
    /// Return the primary shard anyway. Refusing to route is worse than
    /// routing to a possibly-down shard when no alternative exists.
    #[default]
    BestEffort,
    /// Surface [`ClusterError::NoHealthyShard`] instead.
    RequireHealthy,
}

/// Router construction parameters.
#[derive(Clone)]
pub struct RouterConfig {
    pub shard_count: usize,
    /// Virtual nodes per shard; more nodes smooth the key distribution.
    pub virtual_nodes: usize,
    pub failover: FailoverPolicy,
    pub extractors: HashMap<String, KeyExtractor>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            shard_count: 4,
            virtual_nodes: 150,
            failover: FailoverPolicy::BestEffort,
            extractors: HashMap::new(),
        }
    }
}

impl RouterConfig {
    pub fn extractor<F>(mut self, entity_type: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Option<String> + Send + Sync + 'static,
    {
        self.extractors.insert(entity_type.into(), Arc::new(extractor));
        self
    }
}

/// Maps partition keys to shards over an immutable consistent-hash ring.
///
/// Long-lived: construct once per process and share behind an `Arc`. The
/// ring is read-only after construction; the health map is the single
/// synchronization point between health probes and queries.
pub struct ShardRouter {
    ring: HashRing,
    shard_count: usize,
    health: HealthRegistry,
    extractors: RwLock<HashMap<String, KeyExtractor>>,
    failover: FailoverPolicy,
}

impl ShardRouter {
    pub fn new(config: RouterConfig) -> Self {
        let ring = HashRing::build(config.shard_count, config.virtual_nodes);
        let health = HealthRegistry::new((0..config.shard_count).map(shard_id));
        Self {
            ring,
            shard_count: config.shard_count,
            health,
            extractors: RwLock::new(config.extractors),
            failover: config.failover,
        }
    }

    /// Resolve a key to its owning shard.
    ///
    /// Raw keys hash directly. Entities go through the extractor registered
    /// for `entity_type`, falling back to their `id`/`_id` field; when
    /// neither yields a key this fails rather than silently hashing
    /// something meaningless.
    pub fn resolve(&self, entity_type: &str, key: impl Into<RouteKey>) -> Result<ShardTarget> {
        let partition_key = self.partition_key(entity_type, key.into())?;
        Ok(self.target(self.ring.locate(&partition_key)))
    }

    /// Resolve a key, walking the ring clockwise past unhealthy shards.
    ///
    /// Returns the primary shard when it is healthy, otherwise the first
    /// healthy shard after it. When every shard is down, the configured
    /// [`FailoverPolicy`] decides between best-effort and an error.
    pub fn resolve_with_failover(
        &self,
        entity_type: &str,
        key: impl Into<RouteKey>,
    ) -> Result<ShardTarget> {
        let primary = self.resolve(entity_type, key)?;
        if self.health.healthy(&primary.shard_id) {
            return Ok(primary);
        }

        for offset in 1..self.shard_count {
            let candidate = self.target((primary.shard_index + offset) % self.shard_count);
            if self.health.healthy(&candidate.shard_id) {
                tracing::debug!(
                    "shard {} unhealthy, failing over to {}",
                    primary.shard_id,
                    candidate.shard_id
                );
                return Ok(candidate);
            }
        }

        match self.failover {
            FailoverPolicy::BestEffort => {
                tracing::warn!(
                    "no healthy shard available, routing to primary {} anyway",
                    primary.shard_id
                );
                Ok(primary)
            }
            FailoverPolicy::RequireHealthy => Err(ClusterError::NoHealthyShard {
                primary: primary.shard_id,
            }),
        }
    }

    /// Every shard, in index order. The default scatter target set.
    pub fn all_shards(&self) -> Vec<ShardTarget> {
        (0..self.shard_count).map(|index| self.target(index)).collect()
    }

    /// Register (or overwrite) the key extractor for an entity type.
    /// Affects only future resolutions.
    pub fn register_key_extractor<F>(&self, entity_type: impl Into<String>, extractor: F)
    where
        F: Fn(&serde_json::Value) -> Option<String> + Send + Sync + 'static,
    {
        self.extractors
            .write()
            .insert(entity_type.into(), Arc::new(extractor));
    }

    /// Overwrite a shard's health record. The only mutator on the router.
    pub fn update_health(&self, shard_id: &str, healthy: bool, latency_ms: Option<u64>) {
        self.health.set(shard_id, healthy, latency_ms);
    }

    pub fn is_healthy(&self, shard_id: &str) -> bool {
        self.health.healthy(shard_id)
    }

    /// Health snapshot for every shard, in index order.
    pub fn health(&self) -> Vec<ShardHealth> {
        (0..self.shard_count)
            .filter_map(|index| self.health.get(&shard_id(index)))
            .collect()
    }

    /// Count how many of the supplied keys land on each shard. Diagnostic
    /// only; includes zero-count shards so gaps are visible.
    pub fn analyse_distribution<I, S>(&self, keys: I) -> HashMap<String, usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts: HashMap<String, usize> =
            (0..self.shard_count).map(|index| (shard_id(index), 0)).collect();
        for key in keys {
            let index = self.ring.locate(key.as_ref());
            *counts.entry(shard_id(index)).or_insert(0) += 1;
        }
        counts
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    fn target(&self, index: usize) -> ShardTarget {
        ShardTarget {
            shard_id: shard_id(index),
            shard_index: index,
        }
    }

    fn partition_key(&self, entity_type: &str, key: RouteKey) -> Result<String> {
        let entity = match key {
            RouteKey::Raw(raw) => return Ok(raw),
            RouteKey::Entity(entity) => entity,
        };

        if let Some(extractor) = self.extractors.read().get(entity_type) {
            if let Some(extracted) = extractor(&entity) {
                return Ok(extracted);
            }
        }

        for field in ["id", "_id"] {
            match entity.get(field) {
                Some(serde_json::Value::String(value)) => return Ok(value.clone()),
                Some(value) if value.is_number() => return Ok(value.to_string()),
                _ => {}
            }
        }

        Err(ClusterError::KeyResolution {
            entity_type: entity_type.to_string(),
        })
    }
}

fn shard_id(index: usize) -> String {
    format!("shard-{index}")
}

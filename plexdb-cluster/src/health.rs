//! Per-shard liveness tracking.
//!
//! The health map is the only mutable state shared between concurrent
//! callers of the router: health probes write through [`HealthRegistry::set`]
//! while in-flight queries read through [`HealthRegistry::healthy`]. A
//! `DashMap` keeps both paths safe without a global lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Liveness record for one shard.
#[derive(Debug, Clone, Serialize)]
pub struct ShardHealth {
    pub shard_id: String,
    pub healthy: bool,
    /// Last observed latency, informational only.
    pub latency_ms: Option<u64>,
    pub last_checked: DateTime<Utc>,
}

/// Keyed health records, one per shard, created healthy.
pub(crate) struct HealthRegistry {
    shards: DashMap<String, ShardHealth>,
}

impl HealthRegistry {
    pub(crate) fn new(shard_ids: impl IntoIterator<Item = String>) -> Self {
        let shards = DashMap::new();
        let now = Utc::now();
        for shard_id in shard_ids {
            shards.insert(
                shard_id.clone(),
                ShardHealth {
                    shard_id,
                    healthy: true,
                    latency_ms: None,
                    last_checked: now,
                },
            );
        }
        Self { shards }
    }

    /// Overwrite a shard's health record. Unknown shard ids are dropped
    /// with a warning; the registry never grows after construction.
    pub(crate) fn set(&self, shard_id: &str, healthy: bool, latency_ms: Option<u64>) {
        match self.shards.get_mut(shard_id) {
            Some(mut record) => {
                record.healthy = healthy;
                record.latency_ms = latency_ms;
                record.last_checked = Utc::now();
            }
            None => {
                tracing::warn!("health update for unknown shard {} ignored", shard_id);
            }
        }
    }

    pub(crate) fn healthy(&self, shard_id: &str) -> bool {
        self.shards
            .get(shard_id)
            .map(|record| record.healthy)
            .unwrap_or(false)
    }

    pub(crate) fn get(&self, shard_id: &str) -> Option<ShardHealth> {
        self.shards.get(shard_id).map(|record| record.value().clone())
    }
}

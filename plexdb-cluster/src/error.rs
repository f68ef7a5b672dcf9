use thiserror::Error;

/// Errors raised by the routing layer.
///
/// Only programmer errors surface here; routine runtime conditions such as
/// an unhealthy shard are reported through routing results, not errors.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("cannot derive a partition key for entity type '{entity_type}': no extractor registered and no id/_id field")]
    KeyResolution { entity_type: String },

    #[error("no healthy shard available, primary {primary} is down")]
    NoHealthyShard { primary: String },
}

pub type Result<T> = std::result::Result<T, ClusterError>;

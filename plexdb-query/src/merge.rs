//! Result-merge strategies for scatter queries.
//!
//! The strategy set is a closed enum so that each variant carries exactly
//! the parameters it needs: a `Sort` always has a sort key, a `Custom`
//! always has its merge function.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use plexdb_cluster::ShardTarget;
use serde::Serialize;

/// One successful shard's contribution to a scatter query.
#[derive(Debug, Clone, Serialize)]
pub struct ShardResult<T> {
    pub shard: ShardTarget,
    pub data: Vec<T>,
}

/// Caller-supplied combination logic for `Aggregate`/`Custom` merges.
pub type MergeFn<T> = Arc<dyn Fn(&[ShardResult<T>]) -> Vec<T> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// How partial results from successful shards are combined.
pub enum MergeStrategy<T> {
    /// Flatten in shard order. No ordering guarantee across shards.
    Concat,
    /// Flatten, then globally sort by a field of the item.
    Sort { key: String, direction: SortDirection },
    /// `Sort` plus truncation to the globally-best `limit` items. Shards
    /// may return locally-sorted slices; the global re-sort is what makes
    /// the top-K correct.
    TopN {
        key: String,
        direction: SortDirection,
        limit: usize,
    },
    /// Reductions that are not simply "more rows" (sums, counts).
    Aggregate(MergeFn<T>),
    /// Arbitrary application-specific combination.
    Custom(MergeFn<T>),
}

impl<T> Default for MergeStrategy<T> {
    fn default() -> Self {
        MergeStrategy::Concat
    }
}

impl<T> Clone for MergeStrategy<T> {
    fn clone(&self) -> Self {
        match self {
            MergeStrategy::Concat => MergeStrategy::Concat,
            MergeStrategy::Sort { key, direction } => MergeStrategy::Sort {
                key: key.clone(),
                direction: *direction,
            },
            MergeStrategy::TopN {
                key,
                direction,
                limit,
            } => MergeStrategy::TopN {
                key: key.clone(),
                direction: *direction,
                limit: *limit,
            },
            MergeStrategy::Aggregate(merge) => MergeStrategy::Aggregate(Arc::clone(merge)),
            MergeStrategy::Custom(merge) => MergeStrategy::Custom(Arc::clone(merge)),
        }
    }
}

impl<T> MergeStrategy<T> {
    pub fn sort(key: impl Into<String>, direction: SortDirection) -> Self {
        MergeStrategy::Sort {
            key: key.into(),
            direction,
        }
    }

    pub fn top_n(key: impl Into<String>, direction: SortDirection, limit: usize) -> Self {
        MergeStrategy::TopN {
            key: key.into(),
            direction,
            limit,
        }
    }

    pub fn aggregate<F>(merge: F) -> Self
    where
        F: Fn(&[ShardResult<T>]) -> Vec<T> + Send + Sync + 'static,
    {
        MergeStrategy::Aggregate(Arc::new(merge))
    }

    pub fn custom<F>(merge: F) -> Self
    where
        F: Fn(&[ShardResult<T>]) -> Vec<T> + Send + Sync + 'static,
    {
        MergeStrategy::Custom(Arc::new(merge))
    }
}

/// Merge successful shard results under the chosen strategy.
pub(crate) fn apply<T: Serialize>(
    shard_results: Vec<ShardResult<T>>,
    strategy: &MergeStrategy<T>,
) -> Vec<T> {
    match strategy {
        MergeStrategy::Concat => flatten(shard_results),
        MergeStrategy::Sort { key, direction } => {
            sort_by_key(flatten(shard_results), key, *direction)
        }
        MergeStrategy::TopN {
            key,
            direction,
            limit,
        } => {
            let mut sorted = sort_by_key(flatten(shard_results), key, *direction);
            sorted.truncate(*limit);
            sorted
        }
        MergeStrategy::Aggregate(merge) | MergeStrategy::Custom(merge) => merge(&shard_results),
    }
}

fn flatten<T>(shard_results: Vec<ShardResult<T>>) -> Vec<T> {
    shard_results
        .into_iter()
        .flat_map(|result| result.data)
        .collect()
}

/// Decorate-sort-undecorate so each item's sort key is computed once. The
/// sort is stable, so ties keep shard order.
fn sort_by_key<T: Serialize>(items: Vec<T>, key: &str, direction: SortDirection) -> Vec<T> {
    let mut decorated: Vec<(SortValue, T)> = items
        .into_iter()
        .map(|item| (SortValue::of(&item, key), item))
        .collect();
    decorated.sort_by(|a, b| {
        let ordering = a.0.compare(&b.0);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    decorated.into_iter().map(|(_, item)| item).collect()
}

/// A sortable view of one field of an item.
enum SortValue {
    Number(f64),
    Text(String),
    Missing,
}

impl SortValue {
    fn of<T: Serialize>(item: &T, key: &str) -> Self {
        let value = match serde_json::to_value(item) {
            Ok(value) => value,
            Err(_) => return SortValue::Missing,
        };
        match value.get(key) {
            Some(serde_json::Value::Number(number)) => number
                .as_f64()
                .map(SortValue::Number)
                .unwrap_or(SortValue::Missing),
            Some(serde_json::Value::String(text)) => SortValue::Text(text.clone()),
            Some(serde_json::Value::Null) | None => SortValue::Missing,
            Some(other) => SortValue::Text(other.to_string()),
        }
    }

    /// Two numbers compare numerically; every other pairing compares the
    /// textual renderings. Missing keys render as the empty string.
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            _ => self.as_text().cmp(&other.as_text()),
        }
    }

    fn as_text(&self) -> Cow<'_, str> {
        match self {
            SortValue::Number(number) => Cow::Owned(number.to_string()),
            SortValue::Text(text) => Cow::Borrowed(text),
            SortValue::Missing => Cow::Borrowed(""),
        }
    }
}

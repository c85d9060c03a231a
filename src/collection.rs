//! Eager collections
//!
//! [`Collection`] is the non-lazy counterpart of [`Pipeline`]: every helper
//! evaluates immediately over an owned vector and never touches the operator
//! engine. Use [`Collection::lazy`] to switch into deferred mode.

use std::collections::BTreeMap;
use std::future::Future;
use std::iter::Sum;

use serde_json::Value;

use crate::configuration::ParallelConfig;
use crate::error::{BoxError, PipelineResult};
use crate::executor::{self, ParallelOutcome};
use crate::pipeline::{self, Pipeline};

/// An owned, ordered collection with eager helpers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Collection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// All items, in order
    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U, F>(&self, f: F) -> Collection<U>
    where
        F: FnMut(&T) -> U,
    {
        Collection::new(self.items.iter().map(f).collect())
    }

    pub fn reduce<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &T) -> A,
    {
        self.items.iter().fold(init, f)
    }

    /// Group items by key, preserving their relative order inside each group
    pub fn group_by<K, F>(&self, mut key_fn: F) -> BTreeMap<K, Vec<T>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
        T: Clone,
    {
        let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
        for item in &self.items {
            groups.entry(key_fn(item)).or_default().push(item.clone());
        }
        groups
    }
}

impl<T: Clone> Collection<T> {
    pub fn filter<F>(&self, mut predicate: F) -> Collection<T>
    where
        F: FnMut(&T) -> bool,
    {
        Collection::new(self.items.iter().filter(|&item| predicate(item)).cloned().collect())
    }

    /// First `n` items for `n >= 0`, last `|n|` items for `n < 0`
    pub fn take(&self, n: isize) -> Collection<T> {
        let len = self.items.len();
        let range = if n >= 0 {
            0..n.unsigned_abs().min(len)
        } else {
            len.saturating_sub(n.unsigned_abs())..len
        };
        Collection::new(self.items[range].to_vec())
    }

    /// Consecutive groups of `size` items; the last may be shorter. A size of
    /// zero is treated as one.
    pub fn chunk(&self, size: usize) -> Collection<Vec<T>> {
        Collection::new(self.items.chunks(size.max(1)).map(<[T]>::to_vec).collect())
    }

    /// Stable sort by a derived key
    pub fn sort_by_key<K, F>(&self, f: F) -> Collection<T>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        let mut items = self.items.clone();
        items.sort_by_key(f);
        Collection::new(items)
    }

    /// Stable sort with a comparator
    pub fn sort_by<F>(&self, compare: F) -> Collection<T>
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        let mut items = self.items.clone();
        items.sort_by(compare);
        Collection::new(items)
    }

    pub fn sum<S>(&self) -> S
    where
        S: Sum<T>,
    {
        self.items.iter().cloned().sum()
    }
}

impl<T> Collection<T>
where
    T: Copy + Into<f64>,
{
    /// Arithmetic mean, or `None` for an empty collection
    pub fn average(&self) -> Option<f64> {
        if self.items.is_empty() {
            return None;
        }
        let total: f64 = self.items.iter().map(|&item| item.into()).sum();
        Some(total / self.items.len() as f64)
    }
}

impl<T> Collection<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Deferred view over a snapshot of the items
    pub fn lazy(&self) -> Pipeline<T> {
        pipeline::lazy(self.items.clone())
    }

    /// Run `worker` over contiguous partitions with bounded concurrency
    pub async fn parallel<U, E, F, Fut>(
        &self,
        worker: F,
        config: &ParallelConfig,
    ) -> PipelineResult<ParallelOutcome<U>>
    where
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<U>, E>>,
        E: Into<BoxError>,
    {
        executor::parallel(self.items.clone(), worker, config).await
    }
}

impl<K, V> Collection<(K, V)> {
    /// Keyed records as `(key, value)` pairs in key order
    pub fn from_map(map: BTreeMap<K, V>) -> Self {
        Collection::new(map.into_iter().collect())
    }
}

impl Collection<Value> {
    /// Values stored under `key` in each object record; records without it are skipped
    pub fn pluck(&self, key: &str) -> Collection<Value> {
        Collection::new(
            self.items
                .iter()
                .filter_map(|record| record.get(key).cloned())
                .collect(),
        )
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Collection::new(items)
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Collection::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

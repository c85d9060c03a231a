//! Lazy pipelines
//!
//! A [`Pipeline`] pairs a read-only source with an ordered chain of operator
//! templates. Every fluent method borrows `self` and returns a new pipeline;
//! nothing is evaluated until a terminal consumer drives a [`Puller`].
//!
//! # Examples
//! ```
//! use fluent_collections::lazy;
//!
//! let doubled = lazy(vec![1, 2, 3, 4, 5]).map(|n| n * 2);
//! let big = doubled.filter(|n| *n > 5);
//!
//! assert_eq!(big.collect_vec().unwrap(), vec![6, 8, 10]);
//! // `doubled` is untouched and can be consumed on its own
//! assert_eq!(doubled.count().unwrap(), 5);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::error::{BoxError, PipelineResult};
use crate::operator::{BoxStage, Chunk, Filter, FlatMap, Map, Operator, OperatorKind, Take, TakeWhile};
use crate::pipe::Pipe;
use crate::puller::{Completion, Puller, PullerState};
use crate::source::{Source, SourceStage};

/// Builds a fresh stage chain for one run
type ChainFn<T> = Arc<dyn Fn() -> BoxStage<T> + Send + Sync>;

/// Immutable, reusable composition of deferred operators over one source
pub struct Pipeline<T> {
    chain: ChainFn<T>,
    kinds: Arc<[OperatorKind]>,
    source_len: usize,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Pipeline {
            chain: Arc::clone(&self.chain),
            kinds: Arc::clone(&self.kinds),
            source_len: self.source_len,
        }
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("source_len", &self.source_len)
            .field("operators", &self.kinds)
            .finish()
    }
}

// ================================
// Entry points
// ================================

/// Enter lazy mode over an owned vector
pub fn lazy<T>(items: Vec<T>) -> Pipeline<T>
where
    T: Clone + Send + Sync + 'static,
{
    from_source(items)
}

/// Enter lazy mode over any [`Source`]
pub fn from_source<S, T>(source: S) -> Pipeline<T>
where
    S: Source<T>,
    T: Send + 'static,
{
    let source_len = source.len();
    let source = Arc::new(source);
    Pipeline {
        chain: Arc::new(move || -> BoxStage<T> { Box::new(SourceStage::new(Arc::clone(&source))) }),
        kinds: Arc::from(Vec::new()),
        source_len,
    }
}

/// Enter lazy mode over keyed records, in key order
pub fn from_map<K, V>(map: BTreeMap<K, V>) -> Pipeline<(K, V)>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    lazy(map.into_iter().collect())
}

/// A pipeline over nothing
pub fn empty<T>() -> Pipeline<T>
where
    T: Clone + Send + Sync + 'static,
{
    lazy(Vec::new())
}

impl<T> Pipeline<T> {
    /// Number of elements in the underlying source
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Operator kinds in declared order
    pub fn operator_kinds(&self) -> Vec<OperatorKind> {
        self.kinds.to_vec()
    }

    fn with_kinds(&self, added: &[OperatorKind]) -> Arc<[OperatorKind]> {
        self.kinds.iter().chain(added).copied().collect()
    }
}

// ================================
// Fluent operators
// ================================

impl<T: Send + 'static> Pipeline<T> {
    fn append<O>(&self, operator: O) -> Pipeline<O::Out>
    where
        O: Operator<T>,
    {
        let kinds = self.with_kinds(&[operator.kind()]);
        let upstream = Arc::clone(&self.chain);
        Pipeline {
            chain: Arc::new(move || operator.instantiate(upstream())),
            kinds,
            source_len: self.source_len,
        }
    }

    /// Transform every element
    pub fn map<U, F>(&self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.append(Map::new(f))
    }

    /// Transform every element with a fallible callback
    pub fn try_map<U, E, F>(&self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        E: Into<BoxError>,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        self.append(Map::fallible(f))
    }

    /// Keep elements matching `predicate`
    pub fn filter<F>(&self, predicate: F) -> Pipeline<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.append(Filter::new(predicate))
    }

    pub fn try_filter<E, F>(&self, predicate: F) -> Pipeline<T>
    where
        E: Into<BoxError>,
        F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
    {
        self.append(Filter::fallible(predicate))
    }

    /// Emit at most `n` elements, then stop pulling the source
    pub fn take(&self, n: usize) -> Pipeline<T> {
        self.append(Take::new(n))
    }

    /// Emit elements while `predicate` holds; the first failing element is
    /// dropped and the run stops
    pub fn take_while<F>(&self, predicate: F) -> Pipeline<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.append(TakeWhile::new(predicate, false))
    }

    /// Emit elements until `predicate` holds; the matching element is dropped
    /// and the run stops
    pub fn take_until<F>(&self, predicate: F) -> Pipeline<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.append(TakeWhile::new(predicate, true))
    }

    /// Group elements into vectors of `size`; the last one may be shorter.
    /// A size of zero is treated as one.
    pub fn chunk(&self, size: usize) -> Pipeline<Vec<T>> {
        self.append(Chunk::new(size))
    }

    /// Replace every element by the items of an iterable, in order.
    ///
    /// The iterable is consumed one item per pull, so an unbounded expansion
    /// followed by `take` still terminates.
    pub fn flat_map<U, I, F>(&self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        I: IntoIterator<Item = U>,
        I::IntoIter: Send + 'static,
        F: Fn(T) -> I + Send + Sync + 'static,
    {
        self.append(FlatMap::<T, I::IntoIter>::new(f))
    }

    pub fn try_flat_map<U, I, E, F>(&self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        I: IntoIterator<Item = U>,
        I::IntoIter: Send + 'static,
        E: Into<BoxError>,
        F: Fn(T) -> Result<I, E> + Send + Sync + 'static,
    {
        self.append(FlatMap::<T, I::IntoIter>::fallible(f))
    }

    /// Append every operator of a reusable [`Pipe`]
    pub fn through<U: Send + 'static>(&self, pipe: &Pipe<T, U>) -> Pipeline<U> {
        let build = pipe.builder();
        let upstream = Arc::clone(&self.chain);
        Pipeline {
            chain: Arc::new(move || build(upstream())),
            kinds: self.with_kinds(pipe.kinds()),
            source_len: self.source_len,
        }
    }
}

// ================================
// Terminal consumers
// ================================

impl<T: Send + 'static> Pipeline<T> {
    /// Start a new independent run
    pub fn puller(&self) -> Puller<T> {
        Puller::new((self.chain)())
    }

    /// Drive a run, handing each output to `on_item` until it breaks, an
    /// operator stops, or the source is exhausted
    pub fn run<F>(&self, mut on_item: F) -> PipelineResult<Completion>
    where
        F: FnMut(T) -> ControlFlow<()>,
    {
        let mut puller = self.puller();
        while let Some(item) = puller.next_item()? {
            if on_item(item).is_break() {
                return Ok(Completion::Stopped);
            }
        }
        match puller.state() {
            PullerState::Exhausted => Ok(Completion::Exhausted),
            _ => Ok(Completion::Stopped),
        }
    }

    /// Materialize every output
    pub fn collect_vec(&self) -> PipelineResult<Vec<T>> {
        self.puller().collect()
    }

    /// Materialize every output (async form of [`collect_vec`](Self::collect_vec))
    pub async fn to_vec(&self) -> PipelineResult<Vec<T>> {
        self.collect_vec()
    }

    /// First output; pulls only as far as needed to produce it
    pub fn first(&self) -> PipelineResult<Option<T>> {
        self.puller().next_item()
    }

    pub fn count(&self) -> PipelineResult<usize> {
        let mut puller = self.puller();
        let mut count = 0;
        while puller.next_item()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

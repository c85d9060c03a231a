//! Operator nodes
//!
//! An [`Operator`] is an immutable template describing one deferred step of a
//! pipeline. Every run calls [`Operator::instantiate`] to wrap the upstream
//! stage in a fresh [`Stage`] that owns the mutable per-run state (take
//! counters, chunk buffers, the live `flat_map` expansion), so the same
//! pipeline can be consumed repeatedly or concurrently.
//!
//! Stages are pull-based: a stage asks its upstream for one item only when
//! its own consumer asks it for one. A stage that has stopped never pulls
//! again, so `take` and `take_while` stop the source and any in-progress
//! `flat_map` expansion.

use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use crate::error::{BoxError, PipelineError, PipelineResult};
use crate::puller::{Completion, RunContext};

/// Upper bound on eager buffer reservation for chunked output
pub(crate) const PREALLOCATE_LIMIT: usize = 1024;

pub(crate) type MapFn<T, U> = Arc<dyn Fn(T) -> PipelineResult<U> + Send + Sync>;
pub(crate) type PredicateFn<T> = Arc<dyn Fn(&T) -> PipelineResult<bool> + Send + Sync>;
pub(crate) type ExpandFn<T, I> = Arc<dyn Fn(T) -> PipelineResult<I> + Send + Sync>;

fn map_fn<T, U, F>(f: F) -> MapFn<T, U>
where
    F: Fn(T) -> PipelineResult<U> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn predicate_fn<T, F>(f: F) -> PredicateFn<T>
where
    F: Fn(&T) -> PipelineResult<bool> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn expand_fn<T, I, F>(f: F) -> ExpandFn<T, I>
where
    F: Fn(T) -> PipelineResult<I> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Kind of a pipeline operator, as reported by [`Pipeline::operator_kinds`](crate::Pipeline::operator_kinds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Map,
    Filter,
    Take,
    TakeWhile,
    TakeUntil,
    Chunk,
    FlatMap,
}

/// Result of pulling once from a stage
pub(crate) enum Pull<T> {
    Item(T),
    /// The stage will not produce anything more in this run
    End(Completion),
}

/// One operator instantiated for a single run
pub(crate) trait Stage<T>: Send {
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<T>>;
}

pub(crate) type BoxStage<T> = Box<dyn Stage<T>>;

/// Stateless template for one deferred transformation step
pub(crate) trait Operator<In>: Send + Sync + 'static {
    type Out: Send + 'static;

    fn kind(&self) -> OperatorKind;

    /// Fresh per-run stage reading from `upstream`
    fn instantiate(&self, upstream: BoxStage<In>) -> BoxStage<Self::Out>;
}

// ================================
// map
// ================================

pub(crate) struct Map<T, U> {
    f: MapFn<T, U>,
}

impl<T: 'static, U: 'static> Map<T, U> {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Map {
            f: map_fn(move |item| Ok(f(item))),
        }
    }

    pub(crate) fn fallible<E, F>(f: F) -> Self
    where
        E: Into<BoxError>,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        Map {
            f: map_fn(move |item| f(item).map_err(PipelineError::callback)),
        }
    }
}

impl<T, U> Operator<T> for Map<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    type Out = U;

    fn kind(&self) -> OperatorKind {
        OperatorKind::Map
    }

    fn instantiate(&self, upstream: BoxStage<T>) -> BoxStage<U> {
        Box::new(MapStage {
            upstream,
            f: Arc::clone(&self.f),
        })
    }
}

struct MapStage<T, U> {
    upstream: BoxStage<T>,
    f: MapFn<T, U>,
}

impl<T: 'static, U: 'static> Stage<U> for MapStage<T, U> {
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<U>> {
        match self.upstream.pull(ctx)? {
            Pull::Item(item) => Ok(Pull::Item((self.f)(item)?)),
            Pull::End(end) => Ok(Pull::End(end)),
        }
    }
}

// ================================
// filter
// ================================

pub(crate) struct Filter<T> {
    predicate: PredicateFn<T>,
}

impl<T: 'static> Filter<T> {
    pub(crate) fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Filter {
            predicate: predicate_fn(move |item| Ok(predicate(item))),
        }
    }

    pub(crate) fn fallible<E, F>(predicate: F) -> Self
    where
        E: Into<BoxError>,
        F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
    {
        Filter {
            predicate: predicate_fn(move |item| predicate(item).map_err(PipelineError::callback)),
        }
    }
}

impl<T: Send + 'static> Operator<T> for Filter<T> {
    type Out = T;

    fn kind(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn instantiate(&self, upstream: BoxStage<T>) -> BoxStage<T> {
        Box::new(FilterStage {
            upstream,
            predicate: Arc::clone(&self.predicate),
        })
    }
}

struct FilterStage<T> {
    upstream: BoxStage<T>,
    predicate: PredicateFn<T>,
}

impl<T: 'static> Stage<T> for FilterStage<T> {
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<T>> {
        loop {
            match self.upstream.pull(ctx)? {
                Pull::Item(item) => {
                    if (self.predicate)(&item)? {
                        return Ok(Pull::Item(item));
                    }
                }
                Pull::End(end) => return Ok(Pull::End(end)),
            }
        }
    }
}

// ================================
// take
// ================================

pub(crate) struct Take {
    limit: usize,
}

impl Take {
    pub(crate) fn new(limit: usize) -> Self {
        Take { limit }
    }
}

impl<T: Send + 'static> Operator<T> for Take {
    type Out = T;

    fn kind(&self) -> OperatorKind {
        OperatorKind::Take
    }

    fn instantiate(&self, upstream: BoxStage<T>) -> BoxStage<T> {
        Box::new(TakeStage {
            upstream,
            remaining: self.limit,
        })
    }
}

struct TakeStage<T> {
    upstream: BoxStage<T>,
    remaining: usize,
}

impl<T: 'static> Stage<T> for TakeStage<T> {
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<T>> {
        if self.remaining == 0 {
            return Ok(Pull::End(Completion::Stopped));
        }
        let pulled = self.upstream.pull(ctx)?;
        if matches!(pulled, Pull::Item(_)) {
            self.remaining -= 1;
        }
        Ok(pulled)
    }
}

// ================================
// take_while / take_until
// ================================

pub(crate) struct TakeWhile<T> {
    predicate: PredicateFn<T>,
    /// Inverts the predicate (take_until)
    until: bool,
}

impl<T: 'static> TakeWhile<T> {
    pub(crate) fn new<F>(predicate: F, until: bool) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        TakeWhile {
            predicate: predicate_fn(move |item| Ok(predicate(item))),
            until,
        }
    }
}

impl<T: Send + 'static> Operator<T> for TakeWhile<T> {
    type Out = T;

    fn kind(&self) -> OperatorKind {
        if self.until {
            OperatorKind::TakeUntil
        } else {
            OperatorKind::TakeWhile
        }
    }

    fn instantiate(&self, upstream: BoxStage<T>) -> BoxStage<T> {
        Box::new(TakeWhileStage {
            upstream,
            predicate: Arc::clone(&self.predicate),
            until: self.until,
            open: true,
        })
    }
}

struct TakeWhileStage<T> {
    upstream: BoxStage<T>,
    predicate: PredicateFn<T>,
    until: bool,
    open: bool,
}

impl<T: 'static> Stage<T> for TakeWhileStage<T> {
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<T>> {
        if !self.open {
            return Ok(Pull::End(Completion::Stopped));
        }
        let item = match self.upstream.pull(ctx)? {
            Pull::Item(item) => item,
            end => return Ok(end),
        };
        if (self.predicate)(&item)? != self.until {
            return Ok(Pull::Item(item));
        }
        // the element that closes the stage is dropped
        self.open = false;
        Ok(Pull::End(Completion::Stopped))
    }
}

// ================================
// chunk
// ================================

pub(crate) struct Chunk {
    size: usize,
}

impl Chunk {
    /// A size of zero is treated as one
    pub(crate) fn new(size: usize) -> Self {
        Chunk { size: size.max(1) }
    }
}

impl<T: Send + 'static> Operator<T> for Chunk {
    type Out = Vec<T>;

    fn kind(&self) -> OperatorKind {
        OperatorKind::Chunk
    }

    fn instantiate(&self, upstream: BoxStage<T>) -> BoxStage<Vec<T>> {
        Box::new(ChunkStage {
            upstream,
            size: self.size,
            buffer: Vec::with_capacity(self.size.min(PREALLOCATE_LIMIT)),
            finished: None,
        })
    }
}

struct ChunkStage<T> {
    upstream: BoxStage<T>,
    size: usize,
    buffer: Vec<T>,
    /// Set once upstream ended; a partial buffer is flushed before it is reported
    finished: Option<Completion>,
}

impl<T: Send + 'static> Stage<Vec<T>> for ChunkStage<T> {
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<Vec<T>>> {
        if let Some(end) = self.finished {
            return Ok(Pull::End(end));
        }

        while self.buffer.len() < self.size {
            match self.upstream.pull(ctx)? {
                Pull::Item(item) => self.buffer.push(item),
                Pull::End(end) => {
                    self.finished = Some(end);
                    if self.buffer.is_empty() {
                        return Ok(Pull::End(end));
                    }
                    break;
                }
            }
        }

        let capacity = if self.finished.is_some() {
            0
        } else {
            self.size.min(PREALLOCATE_LIMIT)
        };
        Ok(Pull::Item(mem::replace(&mut self.buffer, Vec::with_capacity(capacity))))
    }
}

// ================================
// flat_map
// ================================

pub(crate) struct FlatMap<T, I> {
    f: ExpandFn<T, I>,
}

impl<T, I> FlatMap<T, I>
where
    T: 'static,
    I: Iterator + 'static,
{
    pub(crate) fn new<It, F>(f: F) -> Self
    where
        It: IntoIterator<IntoIter = I, Item = I::Item>,
        F: Fn(T) -> It + Send + Sync + 'static,
    {
        FlatMap {
            f: expand_fn(move |item| Ok(f(item).into_iter())),
        }
    }

    pub(crate) fn fallible<It, E, F>(f: F) -> Self
    where
        It: IntoIterator<IntoIter = I, Item = I::Item>,
        E: Into<BoxError>,
        F: Fn(T) -> Result<It, E> + Send + Sync + 'static,
    {
        FlatMap {
            f: expand_fn(move |item| {
                f(item)
                    .map(IntoIterator::into_iter)
                    .map_err(PipelineError::callback)
            }),
        }
    }
}

impl<T, I> Operator<T> for FlatMap<T, I>
where
    T: Send + 'static,
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    type Out = I::Item;

    fn kind(&self) -> OperatorKind {
        OperatorKind::FlatMap
    }

    fn instantiate(&self, upstream: BoxStage<T>) -> BoxStage<I::Item> {
        Box::new(FlatMapStage {
            upstream,
            f: Arc::clone(&self.f),
            current: None,
            _marker: PhantomData,
        })
    }
}

struct FlatMapStage<T, I> {
    upstream: BoxStage<T>,
    f: ExpandFn<T, I>,
    /// Expansion of the latest upstream element, consumed one item per pull
    current: Option<I>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, I> Stage<I::Item> for FlatMapStage<T, I>
where
    T: 'static,
    I: Iterator + Send + 'static,
{
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<I::Item>> {
        loop {
            if let Some(expansion) = self.current.as_mut() {
                if let Some(item) = expansion.next() {
                    return Ok(Pull::Item(item));
                }
                self.current = None;
            }

            match self.upstream.pull(ctx)? {
                Pull::Item(item) => self.current = Some((self.f)(item)?),
                Pull::End(end) => return Ok(Pull::End(end)),
            }
        }
    }
}

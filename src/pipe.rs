//! Reusable operator chains
//!
//! A [`Pipe`] is a chain of operators detached from any source. Build one
//! with the free constructors in this module, join pipes with [`compose`] or
//! [`PipeExt::compose`], and attach the result to a pipeline with
//! [`Pipe::apply`] or [`Pipeline::through`].
//!
//! # Examples
//! ```
//! use fluent_collections::{lazy, pipe, PipeExt};
//!
//! let evens_doubled = pipe::filter(|n: &i32| n % 2 == 0).compose(pipe::map(|n: i32| n * 2));
//! let result = evens_doubled.apply(&lazy(vec![1, 2, 3, 4])).collect_vec().unwrap();
//! assert_eq!(result, vec![4, 8]);
//! ```

use std::sync::Arc;

use crate::error::BoxError;
use crate::operator::{BoxStage, Chunk, Filter, FlatMap, Map, Operator, OperatorKind, Take, TakeWhile};
use crate::pipeline::Pipeline;

/// Wraps an upstream stage chain in the stages of a pipe
pub(crate) type BuildFn<I, O> = Arc<dyn Fn(BoxStage<I>) -> BoxStage<O> + Send + Sync>;

fn builder<I, O, F>(f: F) -> BuildFn<I, O>
where
    F: Fn(BoxStage<I>) -> BoxStage<O> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A Pipe is a reusable, detached chain of operators taking elements of `I`
/// to elements of `O`. Applying it to a pipeline appends its operators.
pub struct Pipe<I, O> {
    build: BuildFn<I, O>,
    kinds: Arc<[OperatorKind]>,
}

impl<I, O> Clone for Pipe<I, O> {
    fn clone(&self) -> Self {
        Pipe {
            build: Arc::clone(&self.build),
            kinds: Arc::clone(&self.kinds),
        }
    }
}

impl<I, O> Pipe<I, O> {
    pub(crate) fn builder(&self) -> BuildFn<I, O> {
        Arc::clone(&self.build)
    }

    pub(crate) fn kinds(&self) -> &[OperatorKind] {
        &self.kinds
    }

    /// Number of operators in this pipe
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl<I, O> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Apply this pipe to a pipeline
    pub fn apply(&self, input: &Pipeline<I>) -> Pipeline<O> {
        input.through(self)
    }
}

fn single<I, Op>(operator: Op) -> Pipe<I, Op::Out>
where
    I: Send + 'static,
    Op: Operator<I>,
{
    let kinds: Arc<[OperatorKind]> = Arc::from(vec![operator.kind()]);
    Pipe {
        build: builder(move |upstream| operator.instantiate(upstream)),
        kinds,
    }
}

/// Create a pipe that applies the given function to each element
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> O + Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    single(Map::new(f))
}

/// Like [`map`], for a callback that can fail
pub fn try_map<I, O, E, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    E: Into<BoxError>,
    I: Send + 'static,
    O: Send + 'static,
{
    single(Map::fallible(f))
}

/// Create a pipe that filters elements based on the predicate
pub fn filter<I, F>(predicate: F) -> Pipe<I, I>
where
    F: Fn(&I) -> bool + Send + Sync + 'static,
    I: Send + 'static,
{
    single(Filter::new(predicate))
}

pub fn try_filter<I, E, F>(predicate: F) -> Pipe<I, I>
where
    F: Fn(&I) -> Result<bool, E> + Send + Sync + 'static,
    E: Into<BoxError>,
    I: Send + 'static,
{
    single(Filter::fallible(predicate))
}

/// Create a pipe that keeps at most `n` elements
pub fn take<I>(n: usize) -> Pipe<I, I>
where
    I: Send + 'static,
{
    single(Take::new(n))
}

/// Create a pipe that keeps elements while the predicate holds
pub fn take_while<I, F>(predicate: F) -> Pipe<I, I>
where
    F: Fn(&I) -> bool + Send + Sync + 'static,
    I: Send + 'static,
{
    single(TakeWhile::new(predicate, false))
}

/// Create a pipe that keeps elements until the predicate holds
pub fn take_until<I, F>(predicate: F) -> Pipe<I, I>
where
    F: Fn(&I) -> bool + Send + Sync + 'static,
    I: Send + 'static,
{
    single(TakeWhile::new(predicate, true))
}

/// Create a pipe that groups elements into vectors of `size`
pub fn chunk<I>(size: usize) -> Pipe<I, Vec<I>>
where
    I: Send + 'static,
{
    single(Chunk::new(size))
}

/// Create a pipe that expands each element into zero or more elements
pub fn flat_map<I, O, It, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> It + Send + Sync + 'static,
    It: IntoIterator<Item = O>,
    It::IntoIter: Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    single(FlatMap::<I, It::IntoIter>::new(f))
}

pub fn try_flat_map<I, O, It, E, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> Result<It, E> + Send + Sync + 'static,
    It: IntoIterator<Item = O>,
    It::IntoIter: Send + 'static,
    E: Into<BoxError>,
    I: Send + 'static,
    O: Send + 'static,
{
    single(FlatMap::<I, It::IntoIter>::fallible(f))
}

/// Compose two pipes together
pub fn compose<I, M, O>(p1: Pipe<I, M>, p2: Pipe<M, O>) -> Pipe<I, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    let kinds = p1.kinds.iter().chain(p2.kinds.iter()).copied().collect();
    let (first, second) = (p1.build, p2.build);
    Pipe {
        build: builder(move |upstream| second(first(upstream))),
        kinds,
    }
}

/// Identity pipe that doesn't transform the pipeline
pub fn identity<I>() -> Pipe<I, I>
where
    I: Send + 'static,
{
    Pipe {
        build: builder(|upstream| upstream),
        kinds: Arc::from(Vec::new()),
    }
}

/// Extension trait for pipes
pub trait PipeExt<I, O> {
    /// Compose this pipe with another pipe
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static;
}

impl<I, O> PipeExt<I, O> for Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static,
    {
        compose(self, other)
    }
}

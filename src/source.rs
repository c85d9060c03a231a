//! Source sequence adapters
//!
//! A [`Source`] is an ordered, index-addressed, read-only collection. The
//! pipeline never mutates it; every run wraps it in a fresh [`SourceStage`]
//! that pulls elements by position.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::PipelineResult;
use crate::operator::{Pull, Stage};
use crate::puller::{Completion, RunContext};

/// Ordered, read-only sequence that a pipeline can pull from by index
pub trait Source<T>: Send + Sync + 'static {
    /// Number of elements in the sequence
    fn len(&self) -> usize;

    /// Element at `index`, or `None` past the end
    fn at(&self, index: usize) -> Option<T>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Source<T> for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn at(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).cloned()
    }
}

impl<T> Source<T> for VecDeque<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn at(&self, index: usize) -> Option<T> {
        VecDeque::get(self, index).cloned()
    }
}

impl<T> Source<T> for Arc<[T]>
where
    T: Clone + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn at(&self, index: usize) -> Option<T> {
        <[T]>::get(self, index).cloned()
    }
}

/// Head of every run: reads the shared source one position at a time
pub(crate) struct SourceStage<S, T> {
    source: Arc<S>,
    position: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<S, T> SourceStage<S, T> {
    pub(crate) fn new(source: Arc<S>) -> Self {
        Self {
            source,
            position: 0,
            _marker: PhantomData,
        }
    }
}

impl<S, T> Stage<T> for SourceStage<S, T>
where
    S: Source<T>,
    T: Send + 'static,
{
    fn pull(&mut self, ctx: &mut RunContext) -> PipelineResult<Pull<T>> {
        match self.source.at(self.position) {
            Some(item) => {
                self.position += 1;
                ctx.pulled += 1;
                Ok(Pull::Item(item))
            }
            None => Ok(Pull::End(Completion::Exhausted)),
        }
    }
}

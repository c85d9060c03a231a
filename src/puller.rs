//! Single-pass iteration driver
//!
//! The [`Puller`] owns one instantiated stage chain. Every call asks the last
//! stage for one output, which pulls from its upstream only as far as needed,
//! so each source element travels depth-first through the whole chain before
//! the next one is read. `take`/`take_while` end the run by refusing to pull.

use std::iter::FusedIterator;

use crate::error::{PipelineError, PipelineResult};
use crate::operator::{BoxStage, Pull};

/// Lifecycle of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullerState {
    /// Created, nothing requested yet
    Idle,
    /// Pulling through the stage chain for the next output
    Pulling,
    /// The latest output has been handed to the consumer
    Emitting,
    /// The source ran out; the run ended normally
    Exhausted,
    /// An operator short-circuited the run
    Stopped,
    /// A callback failed; the run is over
    Failed,
}

impl PullerState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            PullerState::Exhausted | PullerState::Stopped | PullerState::Failed
        )
    }
}

/// Counters collected over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Raw elements fetched from the source
    pub pulled: usize,
    /// Output items handed to the consumer
    pub delivered: usize,
}

/// How a completed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every source element was consumed
    Exhausted,
    /// An operator or the consumer stopped the run early
    Stopped,
}

/// Mutable state shared by every stage of one run
#[derive(Debug, Default)]
pub(crate) struct RunContext {
    pub(crate) pulled: usize,
}

/// Pull-based driver over one pipeline run.
///
/// Created through [`Pipeline::puller`](crate::Pipeline::puller). Every puller
/// owns fresh per-run state; dropping it releases that state. The puller is an
/// `Iterator` over `PipelineResult<T>` and yields nothing after it has finished
/// or failed.
pub struct Puller<T> {
    /// Released as soon as the run finishes
    chain: Option<BoxStage<T>>,
    ctx: RunContext,
    state: PullerState,
    delivered: usize,
}

impl<T: Send + 'static> Puller<T> {
    pub(crate) fn new(chain: BoxStage<T>) -> Self {
        Self {
            chain: Some(chain),
            ctx: RunContext::default(),
            state: PullerState::Idle,
            delivered: 0,
        }
    }

    pub fn state(&self) -> PullerState {
        self.state
    }

    pub fn metrics(&self) -> RunMetrics {
        RunMetrics {
            pulled: self.ctx.pulled,
            delivered: self.delivered,
        }
    }

    /// Advance the run by one output item; `Ok(None)` once finished.
    pub fn next_item(&mut self) -> PipelineResult<Option<T>> {
        let Some(mut chain) = self.chain.take() else {
            return Ok(None);
        };
        self.transition(PullerState::Pulling);

        match chain.pull(&mut self.ctx) {
            Ok(Pull::Item(item)) => {
                self.chain = Some(chain);
                self.transition(PullerState::Emitting);
                self.delivered += 1;
                Ok(Some(item))
            }
            Ok(Pull::End(completion)) => {
                self.transition(match completion {
                    Completion::Exhausted => PullerState::Exhausted,
                    Completion::Stopped => PullerState::Stopped,
                });
                log::debug!(
                    "pipeline run {:?}: pulled {} source elements, delivered {}",
                    self.state,
                    self.ctx.pulled,
                    self.delivered
                );
                Ok(None)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        self.transition(PullerState::Failed);
        log::debug!("pipeline run failed after {} source elements: {}", self.ctx.pulled, err);
        err
    }

    fn transition(&mut self, next: PullerState) {
        log::trace!("puller {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl<T: Send + 'static> Iterator for Puller<T> {
    type Item = PipelineResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

impl<T: Send + 'static> FusedIterator for Puller<T> {}

//! Bounded-concurrency parallel executor
//!
//! The input is split eagerly into contiguous partitions. A
//! [`ConcurrencyToken`] admits queued partitions in FIFO order while fewer than
//! `max_concurrency` workers are unresolved, and every completion releases one
//! slot. All workers are polled by the calling task, so "parallel" means
//! interleaved futures rather than threads.
//!
//! Results land in the slot of their partition index, so the flattened output
//! follows source order no matter which partition resolves first.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::future::Future;

use crate::configuration::ParallelConfig;
use crate::error::{BoxError, PipelineError, PipelineResult};
use crate::pipeline::Pipeline;

/// Admission bookkeeping for in-flight partition workers
#[derive(Debug, Clone)]
pub struct ConcurrencyToken {
    max_concurrency: usize,
    in_flight: usize,
    waiters: VecDeque<usize>,
    peak: usize,
}

impl ConcurrencyToken {
    /// Token for `partitions` queued partitions, admitting at most
    /// `max_concurrency` at once (at least one)
    pub fn new(max_concurrency: usize, partitions: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            in_flight: 0,
            waiters: (0..partitions).collect(),
            peak: 0,
        }
    }

    /// Admit the next queued partition if a slot is free
    pub fn admit(&mut self) -> Option<usize> {
        if self.in_flight >= self.max_concurrency {
            return None;
        }
        let index = self.waiters.pop_front()?;
        self.in_flight += 1;
        self.peak = self.peak.max(self.in_flight);
        Some(index)
    }

    /// Release the slot of a completed partition
    pub fn release(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Highest number of simultaneously admitted partitions seen so far
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.waiters.is_empty()
    }
}

/// Split `items` into `chunks` contiguous, non-empty partitions of balanced
/// size. Fewer items than chunks gives one partition per item.
pub fn partition<T>(items: Vec<T>, chunks: usize) -> Vec<Vec<T>> {
    let chunks = chunks.max(1).min(items.len());
    if chunks == 0 {
        return Vec::new();
    }

    let base = items.len() / chunks;
    let extra = items.len() % chunks;
    let mut rest = items.into_iter();
    (0..chunks)
        .map(|index| {
            let size = base + usize::from(index < extra);
            rest.by_ref().take(size).collect()
        })
        .collect()
}

/// Per-partition results of a [`parallel`] run, in partition order
#[derive(Debug)]
pub struct ParallelOutcome<U> {
    partitions: Vec<PipelineResult<Vec<U>>>,
    peak_in_flight: usize,
}

impl<U> ParallelOutcome<U> {
    pub fn partitions(&self) -> &[PipelineResult<Vec<U>>] {
        &self.partitions
    }

    pub fn into_partitions(self) -> Vec<PipelineResult<Vec<U>>> {
        self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Indices of partitions whose worker failed
    pub fn failed_partitions(&self) -> Vec<usize> {
        self.partitions
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_err())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.partitions.iter().all(Result::is_ok)
    }

    /// Highest number of workers that were unresolved at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    /// Concatenate partition outputs in order; the lowest failing partition
    /// index wins if any worker failed
    pub fn flatten(self) -> PipelineResult<Vec<U>> {
        let mut output = Vec::new();
        for slot in self.partitions {
            output.extend(slot?);
        }
        Ok(output)
    }
}

/// Run `worker` over contiguous partitions of `items` with bounded concurrency.
///
/// A failing worker only fills its own slot with
/// [`PipelineError::Partition`]; the other partitions keep running. The call
/// itself fails only for an invalid configuration.
///
/// # Examples
/// ```
/// use fluent_collections::{parallel, ParallelConfig};
///
/// # async fn example() {
/// let config = ParallelConfig::new().chunks(2).max_concurrency(1);
/// let upper = parallel(
///     vec!["a", "b", "c", "d"],
///     |part| async move {
///         Ok::<_, std::convert::Infallible>(part.iter().map(|s| s.to_uppercase()).collect::<Vec<_>>())
///     },
///     &config,
/// )
/// .await
/// .unwrap();
/// assert_eq!(upper.flatten().unwrap(), vec!["A", "B", "C", "D"]);
/// # }
/// ```
pub async fn parallel<T, U, E, F, Fut>(
    items: Vec<T>,
    mut worker: F,
    config: &ParallelConfig,
) -> PipelineResult<ParallelOutcome<U>>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<U>, E>>,
    E: Into<BoxError>,
{
    config.validate().map_err(PipelineError::InvalidConfig)?;
    let chunks = config.resolved_chunks();
    let max_concurrency = config.resolved_max_concurrency();

    let mut ready: Vec<Option<Vec<T>>> = partition(items, chunks).into_iter().map(Some).collect();
    let total = ready.len();
    let mut token = ConcurrencyToken::new(max_concurrency, total);
    let mut slots: Vec<Option<PipelineResult<Vec<U>>>> = (0..total).map(|_| None).collect();
    let mut running = FuturesUnordered::new();

    log::debug!(
        "parallel run: {} partitions, at most {} in flight",
        total,
        token.max_concurrency()
    );

    loop {
        while let Some(index) = token.admit() {
            let part = ready[index].take().unwrap_or_default();
            log::debug!(
                "admitting partition {} ({} items), {} in flight",
                index,
                part.len(),
                token.in_flight()
            );
            let fut = worker(part);
            running.push(async move { (index, fut.await) });
        }

        let Some((index, result)) = running.next().await else {
            break;
        };
        token.release();
        log::debug!("partition {} completed, {} waiting", index, token.waiting());

        slots[index] = Some(result.map_err(|err| {
            let source: BoxError = err.into();
            log::warn!("partition {} worker failed: {}", index, source);
            PipelineError::Partition { index, source }
        }));
    }

    let partitions = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                Err(PipelineError::Partition {
                    index,
                    source: "partition was never scheduled".into(),
                })
            })
        })
        .collect();

    Ok(ParallelOutcome {
        partitions,
        peak_in_flight: token.peak(),
    })
}

impl<T: Send + 'static> Pipeline<T> {
    /// Materialize the pipeline, then run `worker` over its partitions.
    ///
    /// A failing pipeline callback fails the whole call before any worker runs.
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
        let items = self.collect_vec()?;
        parallel(items, worker, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_admits_up_to_limit_in_fifo_order() {
        let mut token = ConcurrencyToken::new(2, 4);
        assert_eq!(token.admit(), Some(0));
        assert_eq!(token.admit(), Some(1));
        assert_eq!(token.admit(), None);
        assert_eq!(token.in_flight(), 2);

        token.release();
        assert_eq!(token.admit(), Some(2));
        token.release();
        token.release();
        assert_eq!(token.admit(), Some(3));
        token.release();

        assert!(token.is_idle());
        assert_eq!(token.peak(), 2);
    }

    #[test]
    fn token_clamps_zero_limit() {
        let mut token = ConcurrencyToken::new(0, 1);
        assert_eq!(token.max_concurrency(), 1);
        assert_eq!(token.admit(), Some(0));
    }

    #[test]
    fn partition_balances_contiguous_runs() {
        let parts = partition((1..=7).collect::<Vec<_>>(), 3);
        assert_eq!(parts, vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]]);
    }

    #[test]
    fn partition_never_yields_empty_parts() {
        assert_eq!(partition(vec!['a', 'b'], 5), vec![vec!['a'], vec!['b']]);
        assert!(partition(Vec::<u8>::new(), 4).is_empty());
        assert_eq!(partition(vec![1, 2, 3], 0), vec![vec![1, 2, 3]]);
    }
}

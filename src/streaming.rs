//! Streaming and chunked terminal consumers
//!
//! Both consumers drive a fresh [`Puller`] and only advance while they are
//! being polled; nothing is pulled in the background.

use async_stream::stream;
use futures_core::Stream;
use futures_util::stream::{BoxStream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::PipelineResult;
use crate::operator::PREALLOCATE_LIMIT;
use crate::pipeline::Pipeline;
use crate::puller::{Puller, PullerState};

/// Async stream of output chunks produced by [`Pipeline::cursor`]
pub type ChunkCursor<T> = BoxStream<'static, PipelineResult<Vec<T>>>;

impl<T: Send + 'static> Pipeline<T> {
    /// Yield outputs in chunks of up to `size` elements.
    ///
    /// Each poll runs the pipeline just far enough to fill one chunk and then
    /// suspends until the caller polls again. The last chunk may be shorter;
    /// an empty run yields no chunks. A size of zero is treated as one.
    ///
    /// An error ends the cursor after it has been yielded.
    pub fn cursor(&self, size: usize) -> ChunkCursor<T> {
        let size = size.max(1);
        let mut puller = self.puller();

        stream! {
            'chunks: loop {
                let mut chunk = Vec::with_capacity(size.min(PREALLOCATE_LIMIT));
                while chunk.len() < size {
                    match puller.next_item() {
                        Ok(Some(item)) => chunk.push(item),
                        Ok(None) => break,
                        Err(err) => {
                            yield Err(err);
                            break 'chunks;
                        }
                    }
                }

                if chunk.is_empty() {
                    break;
                }
                let last = chunk.len() < size;
                yield Ok(chunk);
                if last {
                    break;
                }
            }
        }
        .boxed()
    }

    /// Element-at-a-time stream over a fresh run
    pub fn stream(&self) -> ElementStream<T> {
        ElementStream {
            puller: self.puller(),
        }
    }
}

/// Pull-based stream where every read advances the pipeline by one output.
///
/// Reading past the end (or after an error) keeps returning `Ok(None)`.
pub struct ElementStream<T> {
    puller: Puller<T>,
}

impl<T: Send + 'static> ElementStream<T> {
    /// Read the next element; `Ok(None)` means done
    pub async fn read(&mut self) -> PipelineResult<Option<T>> {
        self.puller.next_item()
    }

    /// True once a read has reported the end of the run (or an error)
    pub fn is_done(&self) -> bool {
        self.puller.state().is_finished()
    }

    /// Current state of the underlying run
    pub fn state(&self) -> PullerState {
        self.puller.state()
    }
}

impl<T: Send + 'static> Stream for ElementStream<T> {
    type Item = PipelineResult<T>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Poll::Ready(this.puller.next_item().transpose())
    }
}

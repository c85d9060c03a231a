//! Fluent collections with a lazy, pull-based operator engine.
//!
//! [`Collection`] evaluates eagerly. [`lazy`] (or [`Collection::lazy`])
//! builds an immutable [`Pipeline`] of deferred operators that only runs when
//! a terminal consumer pulls from it: [`Pipeline::collect_vec`],
//! [`Pipeline::first`], [`Pipeline::count`], [`Pipeline::cursor`],
//! [`Pipeline::stream`] or [`Pipeline::parallel`].

pub mod error;
pub mod source;
pub mod operator;
pub mod puller;
pub mod pipeline;

pub mod pipe;
pub mod streaming;

pub mod configuration;
pub mod executor;
pub mod collection;
pub mod lazy_ext;

pub use collection::Collection;
pub use configuration::ParallelConfig;
pub use error::{BoxError, PipelineError, PipelineResult};
pub use executor::{parallel, partition, ConcurrencyToken, ParallelOutcome};
pub use lazy_ext::LazyExt;
pub use operator::OperatorKind;
pub use pipe::{Pipe, PipeExt};
pub use pipeline::{empty, from_map, from_source, lazy, Pipeline};
pub use puller::{Completion, Puller, PullerState, RunMetrics};
pub use source::Source;
pub use streaming::{ChunkCursor, ElementStream};

use std::collections::VecDeque;

use crate::collection::Collection;
use crate::pipeline::{from_source, Pipeline};
use crate::source::Source;

/// Extension trait entering lazy or eager mode directly from std collections
pub trait LazyExt<T>: Source<T> + Sized
where
    T: Send + 'static,
{
    /// Deferred pipeline over this collection
    fn lazy(self) -> Pipeline<T> {
        from_source(self)
    }

    /// Eager [`Collection`] holding the same items
    fn into_collection(self) -> Collection<T>;
}

impl<T> LazyExt<T> for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn into_collection(self) -> Collection<T> {
        Collection::new(self)
    }
}

impl<T> LazyExt<T> for VecDeque<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn into_collection(self) -> Collection<T> {
        Collection::new(self.into())
    }
}

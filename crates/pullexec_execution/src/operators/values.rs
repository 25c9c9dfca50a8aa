//! Adapter over an already-fully-available in-memory sequence.

use futures::future::BoxFuture;
use pullexec_error::Result;

use crate::cursor::Source;

/// Source over a plain in-memory collection.
///
/// Always synchronous; the entire collection is delivered as a single batch.
#[derive(Debug)]
pub struct ValuesSource<T> {
    items: Option<Vec<T>>,
}

impl<T> ValuesSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        ValuesSource { items: Some(items) }
    }
}

impl<T: Send> Source<T> for ValuesSource<T> {
    fn is_synchronous(&self) -> bool {
        true
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move { Ok(self.items.take()) })
    }
}

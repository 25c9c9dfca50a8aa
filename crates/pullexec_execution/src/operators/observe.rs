//! Callback adapter: side-effect hooks at fixed points of the stream.

use futures::future::BoxFuture;
use pullexec_error::Result;

use crate::cursor::{Cursor, Source};

struct IndexHook<T> {
    index: usize,
    hook: Box<dyn FnMut(&T) + Send>,
    fired: bool,
}

/// Pass-through source that fires hooks without altering the data stream.
///
/// Hooks: before enumeration starts, after enumeration completes (with the
/// total item count), and when the item at a given zero-based index is
/// produced (with that item). Used for progress reporting and similar side
/// effects.
pub struct ObserveSource<T> {
    input: Cursor<T>,
    on_begin: Option<Box<dyn FnMut() + Send>>,
    on_complete: Option<Box<dyn FnMut(usize) + Send>>,
    on_index: Option<IndexHook<T>>,
    seen: usize,
    finished: bool,
}

impl<T> ObserveSource<T> {
    pub fn new(input: Cursor<T>) -> Self {
        ObserveSource {
            input,
            on_begin: None,
            on_complete: None,
            on_index: None,
            seen: 0,
            finished: false,
        }
    }

    pub fn on_begin(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_begin = Some(Box::new(hook));
        self
    }

    pub fn on_complete(mut self, hook: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn on_index(mut self, index: usize, hook: impl FnMut(&T) + Send + 'static) -> Self {
        self.on_index = Some(IndexHook {
            index,
            hook: Box::new(hook),
            fired: false,
        });
        self
    }
}

impl<T: Send + 'static> Source<T> for ObserveSource<T> {
    fn is_synchronous(&self) -> bool {
        self.input.is_synchronous()
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move {
            if let Some(mut hook) = self.on_begin.take() {
                hook();
            }

            match self.input.pull_batch().await? {
                Some(batch) => {
                    if let Some(index_hook) = &mut self.on_index {
                        if !index_hook.fired
                            && index_hook.index >= self.seen
                            && index_hook.index < self.seen + batch.len()
                        {
                            (index_hook.hook)(&batch[index_hook.index - self.seen]);
                            index_hook.fired = true;
                        }
                    }
                    self.seen += batch.len();
                    Ok(Some(batch))
                }
                None => {
                    if !self.finished {
                        self.finished = true;
                        if let Some(hook) = &mut self.on_complete {
                            hook(self.seen);
                        }
                    }
                    Ok(None)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::operators::values::ValuesSource;
    use crate::testutil::{ChunkedSource, block_on};

    fn drain<T: Send + 'static>(mut cursor: Cursor<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(item) = block_on(cursor.next_item()).unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn stream_unaltered() {
        let input = Cursor::from_source(ValuesSource::new(vec![1, 2, 3]));
        let cursor = Cursor::from_source(ObserveSource::new(input));
        assert_eq!(vec![1, 2, 3], drain(cursor));
    }

    #[test]
    fn begin_fires_once_before_items() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let input = Cursor::from_source(ChunkedSource::asynchronous(vec![vec![1], vec![2]]));
        let cursor = Cursor::from_source(
            ObserveSource::new(input).on_begin(move || {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(vec![1, 2], drain(cursor));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn complete_fires_with_count() {
        let count = Arc::new(AtomicUsize::new(usize::MAX));
        let count2 = count.clone();

        let input = Cursor::from_source(ChunkedSource::asynchronous(vec![vec![1, 2], vec![3]]));
        let cursor = Cursor::from_source(
            ObserveSource::new(input).on_complete(move |n| {
                count2.store(n, Ordering::SeqCst);
            }),
        );

        assert_eq!(vec![1, 2, 3], drain(cursor));
        assert_eq!(3, count.load(Ordering::SeqCst));
    }

    #[test]
    fn index_hook_sees_element() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();

        let input = Cursor::from_source(ChunkedSource::asynchronous(vec![
            vec![10, 20],
            vec![30, 40],
        ]));
        let cursor = Cursor::from_source(
            ObserveSource::new(input).on_index(2, move |item: &usize| {
                seen2.store(*item, Ordering::SeqCst);
            }),
        );

        assert_eq!(vec![10, 20, 30, 40], drain(cursor));
        assert_eq!(30, seen.load(Ordering::SeqCst));
    }

    #[test]
    fn index_hook_past_end_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();

        let input = Cursor::from_source(ValuesSource::new(vec![1]));
        let cursor = Cursor::from_source(
            ObserveSource::new(input).on_index(5, move |_: &i32| {
                fired2.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(vec![1], drain(cursor));
        assert_eq!(0, fired.load(Ordering::SeqCst));
    }
}

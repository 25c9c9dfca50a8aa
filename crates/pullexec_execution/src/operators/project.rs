//! Per-element projection with an optional row limit.

use futures::future::BoxFuture;
use pullexec_error::Result;

use crate::cursor::{Cursor, Source};

/// Maps each input item through a selector, optionally stopping after a
/// fixed number of output rows.
pub struct ProjectSource<T, O> {
    input: Cursor<T>,
    selector: Box<dyn FnMut(T) -> O + Send>,
    /// Remaining rows before the limit cuts the stream. None means no limit.
    remaining: Option<usize>,
    done: bool,
}

impl<T, O> ProjectSource<T, O> {
    pub fn new(
        input: Cursor<T>,
        selector: impl FnMut(T) -> O + Send + 'static,
        limit: Option<usize>,
    ) -> Self {
        ProjectSource {
            input,
            selector: Box::new(selector),
            remaining: limit,
            done: limit == Some(0),
        }
    }
}

impl<T: Send + 'static, O: Send> Source<O> for ProjectSource<T, O> {
    fn is_synchronous(&self) -> bool {
        self.input.is_synchronous()
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<O>>>> {
        Box::pin(async move {
            if self.done {
                return Ok(None);
            }

            let batch = match self.input.pull_batch().await? {
                Some(batch) => batch,
                None => {
                    self.done = true;
                    return Ok(None);
                }
            };

            let take = match self.remaining {
                Some(remaining) => usize::min(remaining, batch.len()),
                None => batch.len(),
            };
            let out: Vec<_> = batch
                .into_iter()
                .take(take)
                .map(&mut self.selector)
                .collect();

            if let Some(remaining) = &mut self.remaining {
                *remaining -= out.len();
                if *remaining == 0 {
                    self.done = true;
                }
            }

            Ok(Some(out))
        })
    }
}

#[cfg(test)]
mod tests {
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
    fn maps_all_items() {
        let input = Cursor::from_source(ValuesSource::new(vec![1, 2, 3]));
        let cursor = Cursor::from_source(ProjectSource::new(input, |v: i32| v * 10, None));
        assert_eq!(vec![10, 20, 30], drain(cursor));
    }

    #[test]
    fn limit_cuts_stream() {
        let input = Cursor::from_source(ChunkedSource::asynchronous(vec![
            vec![1, 2, 3],
            vec![4, 5],
        ]));
        let cursor = Cursor::from_source(ProjectSource::new(input, |v: i32| v, Some(4)));
        assert_eq!(vec![1, 2, 3, 4], drain(cursor));
    }

    #[test]
    fn limit_zero_produces_nothing() {
        let input = Cursor::from_source(ValuesSource::new(vec![1, 2]));
        let mut cursor = Cursor::from_source(ProjectSource::new(input, |v: i32| v, Some(0)));
        assert!(!cursor.advance().unwrap());
    }

    #[test]
    fn synchronous_mirrors_input() {
        let input = Cursor::from_source(ValuesSource::new(vec![1]));
        let cursor = Cursor::from_source(ProjectSource::new(input, |v: i32| v, None));
        assert!(cursor.is_synchronous());
    }
}

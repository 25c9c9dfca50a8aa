//! Pairwise zip of two cursors.

use futures::future::BoxFuture;
use pullexec_error::Result;

use crate::cursor::{Cursor, Source};

/// Zips two inputs element by element.
///
/// In strict mode output stops as soon as either side runs out. With
/// `zip_all` the left side is drained to the end, pairing with `None` once
/// the right side is exhausted. Each pull produces a single pair, keeping
/// both sides in lockstep.
pub struct ZipSource<L, R, O> {
    left: Cursor<L>,
    right: Cursor<R>,
    selector: Box<dyn Fn(&L, Option<&R>) -> O + Send>,
    zip_all: bool,
    right_done: bool,
    done: bool,
}

impl<L, R, O> ZipSource<L, R, O>
where
    L: Send + 'static,
    R: Send + 'static,
    O: Send + 'static,
{
    pub fn new(
        left: Cursor<L>,
        right: Cursor<R>,
        selector: impl Fn(&L, Option<&R>) -> O + Send + 'static,
        zip_all: bool,
    ) -> Self {
        ZipSource {
            left,
            right,
            selector: Box::new(selector),
            zip_all,
            right_done: false,
            done: false,
        }
    }
}

impl<L, R, O> Source<O> for ZipSource<L, R, O>
where
    L: Send + 'static,
    R: Send + 'static,
    O: Send + 'static,
{
    fn is_synchronous(&self) -> bool {
        self.left.is_synchronous() && self.right.is_synchronous()
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<O>>>> {
        Box::pin(async move {
            if self.done {
                return Ok(None);
            }

            let left = match self.left.next_item().await? {
                Some(item) => item,
                None => {
                    self.done = true;
                    self.right.close();
                    return Ok(None);
                }
            };

            let right = if self.right_done {
                None
            } else {
                let item = self.right.next_item().await?;
                if item.is_none() {
                    self.right_done = true;
                    if !self.zip_all {
                        self.done = true;
                        self.left.close();
                        return Ok(None);
                    }
                }
                item
            };

            Ok(Some(vec![(self.selector)(&left, right.as_ref())]))
        })
    }
}

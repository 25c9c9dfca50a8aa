//! Nested-loop cross join.

use std::sync::Arc;

use futures::future::BoxFuture;
use pullexec_error::{OptionExt, Result};

use crate::collection::Materialized;
use crate::cursor::{Cursor, Source};
use crate::materialize::Materializer;
use crate::operators::Input;

/// Produces the cartesian product of two inputs.
///
/// The right side is materialized once and rescanned for every left element.
/// Synchronous only when the left cursor is synchronous and the right side
/// arrives already materialized.
pub struct CrossJoinSource<L, R, O> {
    left: Cursor<L>,
    right: Option<Input<R>>,
    right_collection: Option<Materialized<R>>,
    materializer: Arc<dyn Materializer<R>>,
    selector: Box<dyn Fn(&L, &R) -> O + Send>,
    /// Left element currently being paired, retained across output batches.
    current_left: Option<L>,
    /// Position in the right collection for the current left element.
    right_pos: usize,
    batch_size: usize,
    synchronous: bool,
    done: bool,
}

impl<L, R, O> CrossJoinSource<L, R, O>
where
    L: Send + 'static,
    R: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn new(
        left: Cursor<L>,
        right: Input<R>,
        selector: impl Fn(&L, &R) -> O + Send + 'static,
        materializer: Arc<dyn Materializer<R>>,
    ) -> Self {
        let synchronous = left.is_synchronous() && right.is_materialized();
        let batch_size = materializer.batch_size();
        CrossJoinSource {
            left,
            right: Some(right),
            right_collection: None,
            materializer,
            selector: Box::new(selector),
            current_left: None,
            right_pos: 0,
            batch_size,
            synchronous,
            done: false,
        }
    }
}

impl<L, R, O> Source<O> for CrossJoinSource<L, R, O>
where
    L: Send + 'static,
    R: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<O>>>> {
        Box::pin(async move {
            if self.done {
                return Ok(None);
            }
            if self.right_collection.is_none() {
                let right = self.right.take().required("cross join right input")?;
                let collection = right.into_materialized(self.materializer.clone()).await?;
                if collection.is_empty() {
                    self.done = true;
                    self.left.close();
                    return Ok(None);
                }
                self.right_collection = Some(collection);
            }

            let mut out = Vec::new();
            loop {
                if self.current_left.is_none() {
                    match self.left.next_item().await? {
                        Some(item) => {
                            self.current_left = Some(item);
                            self.right_pos = 0;
                        }
                        None => {
                            self.done = true;
                            break;
                        }
                    }
                }

                let left = self.current_left.as_ref().required("cross join left item")?;
                let right = self
                    .right_collection
                    .as_ref()
                    .required("cross join right collection")?;
                while self.right_pos < right.len() && out.len() < self.batch_size {
                    let item = right.get(self.right_pos).required("right item")?;
                    out.push((self.selector)(left, item));
                    self.right_pos += 1;
                }

                if self.right_pos >= right.len() {
                    self.current_left = None;
                }
                if out.len() >= self.batch_size {
                    return Ok(Some(out));
                }
            }

            if out.is_empty() { Ok(None) } else { Ok(Some(out)) }
        })
    }
}

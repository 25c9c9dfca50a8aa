//! Sort-based duplicate elimination.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use pullexec_error::{OptionExt, Result};

use crate::collection::Materialized;
use crate::cursor::Source;
use crate::materialize::{Comparator, Materializer};
use crate::operators::Input;

/// Emits each distinct value once, in comparator order.
///
/// Sorts the input on first pull, then walks the sorted collection keeping
/// only values that compare unequal to their predecessor. Already-sorted
/// materialized inputs skip the sort.
pub struct DistinctSource<T> {
    input: Option<Input<T>>,
    comparator: Comparator<T>,
    materializer: Arc<dyn Materializer<T>>,
    /// True when the input is known to already be in comparator order.
    input_sorted: bool,
    collection: Option<Materialized<T>>,
    offset: usize,
}

impl<T: Clone + Send + Sync + 'static> DistinctSource<T> {
    pub fn new(
        input: Input<T>,
        comparator: Comparator<T>,
        materializer: Arc<dyn Materializer<T>>,
        input_sorted: bool,
    ) -> Self {
        // The sort can only be skipped when there's nothing left to
        // materialize.
        let input_sorted = input_sorted && input.is_materialized();
        DistinctSource {
            input: Some(input),
            comparator,
            materializer,
            input_sorted,
            collection: None,
            offset: 0,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Source<T> for DistinctSource<T> {
    fn is_synchronous(&self) -> bool {
        false
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move {
            if self.collection.is_none() {
                let input = self.input.take().required("distinct input")?;
                let sorted = if self.input_sorted {
                    match input {
                        Input::Materialized(collection) => collection,
                        Input::Cursor(_) => {
                            unreachable!("sorted distinct input must be materialized")
                        }
                    }
                } else {
                    input
                        .into_sorted(self.materializer.clone(), self.comparator.clone())
                        .await?
                };
                self.collection = Some(sorted);
            }
            let collection = self.collection.as_ref().required("distinct collection")?;

            let items = collection.as_slice();
            if self.offset >= items.len() {
                return Ok(None);
            }

            let mut out = Vec::new();
            let end = usize::min(items.len(), self.offset + self.materializer.batch_size());
            while self.offset < end {
                let keep = self.offset == 0
                    || (self.comparator)(&items[self.offset], &items[self.offset - 1])
                        != Ordering::Equal;
                if keep {
                    out.push(items[self.offset].clone());
                }
                self.offset += 1;
            }

            // The scanned window may have held only duplicates. An empty
            // batch is fine, the cursor keeps pulling.
            Ok(Some(out))
        })
    }
}

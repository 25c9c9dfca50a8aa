//! Value-based batching: grouping consecutive equal-key runs after a sort.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use pullexec_error::{OptionExt, Result};

use crate::collection::{Batch, Materialized};
use crate::cursor::Source;
use crate::materialize::{Comparator, Materializer};
use crate::operators::Input;

/// Groups a sequence into per-key [`Batch`]es.
///
/// The input is first fully sorted by the comparator (always asynchronous),
/// then walked grouping consecutive equal-key runs. A run longer than the
/// materializer's batch-size cap is split at the cap.
pub struct ValueBatchSource<T> {
    input: Option<Input<T>>,
    comparator: Comparator<T>,
    materializer: Arc<dyn Materializer<T>>,
    collection: Option<Materialized<T>>,
    /// Start offset of the next group to emit.
    group_start: usize,
}

impl<T: Clone + Send + Sync + 'static> ValueBatchSource<T> {
    pub fn new(
        input: Input<T>,
        comparator: Comparator<T>,
        materializer: Arc<dyn Materializer<T>>,
    ) -> Self {
        ValueBatchSource {
            input: Some(input),
            comparator,
            materializer,
            collection: None,
            group_start: 0,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Source<Batch<T>> for ValueBatchSource<T> {
    fn is_synchronous(&self) -> bool {
        false
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<Batch<T>>>>> {
        Box::pin(async move {
            if self.collection.is_none() {
                let input = self.input.take().required("value batching input")?;
                let sorted = input
                    .into_sorted(self.materializer.clone(), self.comparator.clone())
                    .await?;
                self.collection = Some(sorted);
            }
            let collection = self.collection.as_ref().required("value batching collection")?;

            let items = collection.as_slice();
            if self.group_start >= items.len() {
                return Ok(None);
            }

            // A group ends at the size cap or at the first value comparing
            // unequal to its predecessor.
            let cap = self.materializer.batch_size();
            let mut end = self.group_start + 1;
            while end < items.len()
                && end - self.group_start < cap
                && (self.comparator)(&items[end], &items[end - 1]) == Ordering::Equal
            {
                end += 1;
            }

            let batch = Batch::new(collection.clone(), self.group_start, end - self.group_start);
            self.group_start = end;

            Ok(Some(vec![batch]))
        })
    }
}

//! Full-sort operator.

use std::sync::Arc;

use futures::future::BoxFuture;
use pullexec_error::{OptionExt, Result};

use crate::collection::Materialized;
use crate::cursor::Source;
use crate::materialize::{Comparator, Materializer};
use crate::operators::Input;

#[derive(Debug)]
enum OrderedState {
    /// Input not yet materialized.
    Init,
    /// Streaming chunks of the sorted collection.
    Stream,
    /// All rows emitted.
    Done,
}

/// Sorts the entire input, then streams it back out in batch-size chunks.
pub struct OrderedSource<T> {
    input: Option<Input<T>>,
    comparator: Comparator<T>,
    materializer: Arc<dyn Materializer<T>>,
    collection: Option<Materialized<T>>,
    offset: usize,
    state: OrderedState,
}

impl<T: Clone + Send + Sync + 'static> OrderedSource<T> {
    pub fn new(
        input: Input<T>,
        comparator: Comparator<T>,
        materializer: Arc<dyn Materializer<T>>,
    ) -> Self {
        OrderedSource {
            input: Some(input),
            comparator,
            materializer,
            collection: None,
            offset: 0,
            state: OrderedState::Init,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Source<T> for OrderedSource<T> {
    fn is_synchronous(&self) -> bool {
        false
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move {
            loop {
                match self.state {
                    OrderedState::Init => {
                        let input = self.input.take().required("ordered input")?;
                        let sorted = input
                            .into_sorted(self.materializer.clone(), self.comparator.clone())
                            .await?;
                        self.collection = Some(sorted);
                        self.state = OrderedState::Stream;
                    }
                    OrderedState::Stream => {
                        let collection =
                            self.collection.as_ref().required("ordered collection")?;
                        let items = collection.as_slice();
                        if self.offset >= items.len() {
                            self.state = OrderedState::Done;
                            continue;
                        }
                        let end =
                            usize::min(items.len(), self.offset + self.materializer.batch_size());
                        let out = items[self.offset..end].to_vec();
                        self.offset = end;
                        return Ok(Some(out));
                    }
                    OrderedState::Done => return Ok(None),
                }
            }
        })
    }
}

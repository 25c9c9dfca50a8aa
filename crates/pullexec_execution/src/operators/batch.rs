//! Fixed-size batching: consecutive runs of at most N elements.

use std::sync::Arc;

use futures::future::BoxFuture;
use pullexec_error::{OptionExt, PullexecError, Result};

use crate::collection::{Batch, Materialized};
use crate::cursor::{Cursor, Source};
use crate::materialize::Materializer;
use crate::operators::Input;

/// Groups a sequence into consecutive [`Batch`]es of at most `size` items.
///
/// A pre-materialized input is chunked purely synchronously by index; any
/// other input is fully materialized first (asynchronous). An input whose
/// length is an exact multiple of `size` produces no trailing empty batch.
pub struct BatchingSource<T> {
    input: Option<Cursor<T>>,
    materializer: Arc<dyn Materializer<T>>,
    collection: Option<Materialized<T>>,
    size: usize,
    offset: usize,
    synchronous: bool,
}

impl<T: Clone + Send + Sync + 'static> BatchingSource<T> {
    pub fn try_new(
        input: Input<T>,
        size: usize,
        materializer: Arc<dyn Materializer<T>>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(PullexecError::new("batch size must be greater than zero"));
        }

        let (input, collection, synchronous) = match input {
            Input::Materialized(collection) => (None, Some(collection), true),
            Input::Cursor(cursor) => (Some(cursor), None, false),
        };

        Ok(BatchingSource {
            input,
            materializer,
            collection,
            size,
            offset: 0,
            synchronous,
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Source<Batch<T>> for BatchingSource<T> {
    fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<Batch<T>>>>> {
        Box::pin(async move {
            if self.collection.is_none() {
                let cursor = self.input.take().required("batching input")?;
                self.collection = Some(self.materializer.materialize(cursor).await?);
            }
            let collection = self.collection.as_ref().required("batching collection")?;

            if self.offset >= collection.len() {
                return Ok(None);
            }

            let len = usize::min(self.size, collection.len() - self.offset);
            let batch = Batch::new(collection.clone(), self.offset, len);
            self.offset += len;

            Ok(Some(vec![batch]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::HeapMaterializer;
    use crate::operators::values::ValuesSource;
    use crate::testutil::{ChunkedSource, block_on};

    fn drain_batches<T: Clone + Send + Sync + 'static>(mut cursor: Cursor<Batch<T>>) -> Vec<Vec<T>> {
        let mut out = Vec::new();
        while let Some(batch) = block_on(cursor.next_item()).unwrap() {
            out.push(batch.to_vec());
        }
        out
    }

    #[test]
    fn final_partial_batch() {
        let materializer: Arc<dyn Materializer<i32>> = Arc::new(HeapMaterializer::default());
        let input = Cursor::from_source(ValuesSource::new(vec![1, 2, 3, 4, 5]));
        let source = BatchingSource::try_new(input.into(), 2, materializer).unwrap();

        let got = drain_batches(Cursor::from_source(source));
        assert_eq!(vec![vec![1, 2], vec![3, 4], vec![5]], got);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_batch() {
        let materializer: Arc<dyn Materializer<i32>> = Arc::new(HeapMaterializer::default());
        let input = Cursor::from_source(ValuesSource::new(vec![1, 2, 3, 4]));
        let source = BatchingSource::try_new(input.into(), 2, materializer).unwrap();

        let got = drain_batches(Cursor::from_source(source));
        assert_eq!(vec![vec![1, 2], vec![3, 4]], got);
    }

    #[test]
    fn materialized_input_is_synchronous() {
        let materializer: Arc<dyn Materializer<i32>> = Arc::new(HeapMaterializer::default());
        let collection = Materialized::new(vec![1, 2, 3], 16);
        let source = BatchingSource::try_new(collection.into(), 2, materializer).unwrap();

        let mut cursor = Cursor::from_source(source);
        assert!(cursor.is_synchronous());

        // Entire output available through advance alone.
        let mut got = Vec::new();
        while cursor.advance().unwrap() {
            got.push(cursor.current().unwrap().to_vec());
        }
        assert_eq!(vec![vec![1, 2], vec![3]], got);
    }

    #[test]
    fn lazy_input_is_materialized_first() {
        let materializer: Arc<dyn Materializer<i32>> = Arc::new(HeapMaterializer::default());
        let input = Cursor::from_source(ChunkedSource::asynchronous(vec![vec![1, 2, 3], vec![4]]));
        let source = BatchingSource::try_new(input.into(), 3, materializer).unwrap();

        let cursor = Cursor::from_source(source);
        assert!(!cursor.is_synchronous());
        assert_eq!(vec![vec![1, 2, 3], vec![4]], drain_batches(cursor));
    }

    #[test]
    fn zero_size_rejected() {
        let materializer: Arc<dyn Materializer<i32>> = Arc::new(HeapMaterializer::default());
        let input = Cursor::from_source(ValuesSource::new(vec![1]));
        assert!(BatchingSource::try_new(input.into(), 0, materializer).is_err());
    }

    #[test]
    fn empty_input_produces_no_batches() {
        let materializer: Arc<dyn Materializer<i32>> = Arc::new(HeapMaterializer::default());
        let input = Cursor::from_source(ValuesSource::<i32>::new(Vec::new()));
        let source = BatchingSource::try_new(input.into(), 2, materializer).unwrap();
        assert!(drain_batches(Cursor::from_source(source)).is_empty());
    }
}

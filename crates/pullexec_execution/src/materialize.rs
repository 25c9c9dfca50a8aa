//! Materialization policy: buffering and sorting lazy sequences into
//! random-access collections.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use pullexec_error::Result;
use tracing::trace;

use crate::collection::Materialized;
use crate::cursor::Cursor;

/// Total-order comparison delegate supplied by the plan-building layer.
///
/// Must be consistent (`cmp(a, b) == cmp(b, a).reverse()`) and transitive;
/// the core treats it as opaque.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Policy for realizing a lazy sequence into a random-access collection.
///
/// Implementations choose the buffering strategy (in-memory, spill-to-disk);
/// operators are agnostic. The batch-size hint bounds the chunks emitted by
/// batch-size-sensitive operators.
pub trait Materializer<T: Send>: Send + Sync {
    /// Maximum chunk size hint for batch-sensitive operators.
    fn batch_size(&self) -> usize;

    /// Fully buffer the sequence, preserving input order.
    fn materialize(&self, source: Cursor<T>) -> BoxFuture<'static, Result<Materialized<T>>>;

    /// Fully buffer the sequence and sort it by the given comparator.
    fn sort(
        &self,
        source: Cursor<T>,
        comparator: Comparator<T>,
    ) -> BoxFuture<'static, Result<Materialized<T>>>;
}

/// In-memory materialization.
#[derive(Debug, Clone, Copy)]
pub struct HeapMaterializer {
    batch_size: usize,
}

impl HeapMaterializer {
    pub fn new(batch_size: usize) -> Self {
        HeapMaterializer {
            batch_size: batch_size.max(1),
        }
    }
}

impl Default for HeapMaterializer {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl<T: Send + 'static> Materializer<T> for HeapMaterializer {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn materialize(&self, source: Cursor<T>) -> BoxFuture<'static, Result<Materialized<T>>> {
        let batch_size = self.batch_size;
        Box::pin(async move {
            let items = drain(source).await?;
            trace!(rows = items.len(), "materialized sequence");
            Ok(Materialized::new(items, batch_size))
        })
    }

    fn sort(
        &self,
        source: Cursor<T>,
        comparator: Comparator<T>,
    ) -> BoxFuture<'static, Result<Materialized<T>>> {
        let batch_size = self.batch_size;
        Box::pin(async move {
            let mut items = drain(source).await?;
            // Stable sort keeps input order among equal keys.
            items.sort_by(|a, b| comparator(a, b));
            trace!(rows = items.len(), "sorted sequence");
            Ok(Materialized::new(items, batch_size))
        })
    }
}

async fn drain<T: Send + 'static>(mut cursor: Cursor<T>) -> Result<Vec<T>> {
    let mut items = Vec::new();
    while let Some(item) = cursor.next_item().await? {
        items.push(item);
    }
    Ok(items)
}

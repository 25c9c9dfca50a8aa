//! Random-access materialized collections and contiguous batch views.

use std::fmt;
use std::slice;
use std::sync::Arc;

use futures::future::BoxFuture;
use pullexec_error::Result;

use crate::cursor::{Cursor, Source};

/// A fully-materialized, randomly-indexable collection.
///
/// Produced by the materialization policy. Read-only once produced; any
/// number of cursors may scan it concurrently, each with its own position.
/// Cloning is cheap and shares the underlying storage.
pub struct Materialized<T> {
    items: Arc<Vec<T>>,
    /// Number of rows emitted per scan batch.
    batch_size: usize,
}

impl<T> Clone for Materialized<T> {
    fn clone(&self) -> Self {
        Materialized {
            items: self.items.clone(),
            batch_size: self.batch_size,
        }
    }
}

impl<T> fmt::Debug for Materialized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Materialized")
            .field("len", &self.items.len())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl<T> Materialized<T> {
    pub fn new(items: Vec<T>, batch_size: usize) -> Self {
        Materialized {
            items: Arc::new(items),
            batch_size: batch_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Clone + Send + Sync + 'static> Materialized<T> {
    /// Cursor over the full collection.
    pub fn cursor(&self) -> Cursor<T> {
        self.cursor_at(0)
    }

    /// Cursor starting at the given row index.
    ///
    /// The index-addressable entry point joins use to resume the right side
    /// from the first still-possibly-matching row.
    pub fn cursor_at(&self, start: usize) -> Cursor<T> {
        Cursor::from_source(CollectionScan {
            collection: self.clone(),
            pos: start,
        })
    }
}

/// Synchronous scan over a materialized collection.
#[derive(Debug)]
struct CollectionScan<T> {
    collection: Materialized<T>,
    pos: usize,
}

impl<T: Clone + Send + Sync> Source<T> for CollectionScan<T> {
    fn is_synchronous(&self) -> bool {
        true
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move {
            let items = self.collection.as_slice();
            if self.pos >= items.len() {
                return Ok(None);
            }
            let end = usize::min(self.pos + self.collection.batch_size, items.len());
            let batch = items[self.pos..end].to_vec();
            self.pos = end;
            Ok(Some(batch))
        })
    }
}

/// An immutable contiguous view into a materialized collection.
///
/// The unit of output for the batching and value-batching operators. Shares
/// the collection's storage; does not own it.
pub struct Batch<T> {
    collection: Materialized<T>,
    offset: usize,
    len: usize,
}

impl<T> Clone for Batch<T> {
    fn clone(&self) -> Self {
        Batch {
            collection: self.collection.clone(),
            offset: self.offset,
            len: self.len,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Batch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: PartialEq> PartialEq for Batch<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T> Batch<T> {
    pub fn new(collection: Materialized<T>, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= collection.len());
        Batch {
            collection,
            offset,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element at the given batch-relative index.
    pub fn get(&self, idx: usize) -> Option<&T> {
        if idx >= self.len {
            return None;
        }
        self.collection.get(self.offset + idx)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.collection.as_slice()[self.offset..self.offset + self.len]
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T: Clone> Batch<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reproduces_original_order() {
        let collection = Materialized::new(vec![3, 1, 4, 1, 5, 9, 2, 6], 3);
        let mut cursor = collection.cursor();
        assert!(cursor.is_synchronous());

        let mut got = Vec::new();
        while cursor.advance().unwrap() {
            got.push(*cursor.current().unwrap());
        }
        assert_eq!(vec![3, 1, 4, 1, 5, 9, 2, 6], got);
    }

    #[test]
    fn cursor_at_starts_mid_collection() {
        let collection = Materialized::new(vec![10, 20, 30, 40], 2);
        let mut cursor = collection.cursor_at(2);

        let mut got = Vec::new();
        while cursor.advance().unwrap() {
            got.push(*cursor.current().unwrap());
        }
        assert_eq!(vec![30, 40], got);
    }

    #[test]
    fn cursor_at_past_end_is_exhausted() {
        let collection = Materialized::new(vec![1, 2], 2);
        let mut cursor = collection.cursor_at(5);
        assert!(!cursor.advance().unwrap());
    }

    #[test]
    fn batch_views_share_storage() {
        let collection = Materialized::new(vec![1, 2, 3, 4, 5], 16);
        let batch = Batch::new(collection.clone(), 1, 3);

        assert_eq!(&[2, 3, 4], batch.as_slice());
        assert_eq!(Some(&3), batch.get(1));
        assert_eq!(None, batch.get(3));
        assert_eq!(vec![2, 3, 4], batch.to_vec());
    }
}

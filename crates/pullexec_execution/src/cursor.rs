//! Cursor state machine driving batch-at-a-time pull iteration.

use std::fmt;
use std::vec;

use futures::FutureExt;
use futures::future::BoxFuture;
use pullexec_error::{OptionExt, PullexecError, Result};

/// A producer of item batches for a single consumer.
///
/// Each operator in a query plan implements this for its output. `pull`
/// returns the next non-emitted batch, or None once the source is exhausted.
/// An exhausted source keeps returning None on subsequent pulls.
///
/// Batches may legitimately be empty (e.g. a join step that matched nothing);
/// the consuming [`Cursor`] skips empty batches transparently.
pub trait Source<T>: Send {
    /// True if every batch this source will ever produce can be obtained
    /// without suspending.
    ///
    /// Computed eagerly from the immediate inputs at construction. Sources
    /// with asynchronous merge points (sorting, materialization) are
    /// unconditionally asynchronous.
    fn is_synchronous(&self) -> bool;

    /// Produce the next batch, suspending at upstream fetch boundaries.
    ///
    /// Implementations must never suspend while emitting from data that is
    /// already in memory; awaits are confined to upstream batch fetches and
    /// materialization.
    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>>;
}

/// Iteration handle over a [`Source`].
///
/// Consumption follows a two-phase protocol: synchronous [`advance`] calls
/// step through the current in-memory batch, and an asynchronous
/// [`fetch_next_batch`] crosses batch boundaries when the source is not fully
/// synchronous. For synchronous sources, `advance` chains across batch
/// boundaries inline and `fetch_next_batch` is never required.
///
/// [`advance`]: Cursor::advance
/// [`fetch_next_batch`]: Cursor::fetch_next_batch
pub struct Cursor<T> {
    /// None once closed, dropping the source's owned upstream state.
    source: Option<Box<dyn Source<T>>>,
    synchronous: bool,
    /// Iterator over the batch currently being consumed. Replaced wholesale
    /// at each batch boundary.
    batch: Option<vec::IntoIter<T>>,
    current: Option<T>,
    /// True while the current batch has not been fully consumed.
    enumerating: bool,
    initialized: bool,
    closed: bool,
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("enumerating", &self.enumerating)
            .field("initialized", &self.initialized)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Cursor<T> {
    pub fn from_source(source: impl Source<T> + 'static) -> Self {
        let synchronous = source.is_synchronous();
        Cursor {
            source: Some(Box::new(source)),
            synchronous,
            batch: None,
            current: None,
            enumerating: false,
            initialized: false,
            closed: false,
        }
    }

    /// True if the entire output can be produced by `advance` alone.
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// The item produced by the most recent successful advance or batch
    /// fetch. None after an unsuccessful advance.
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Step to the next item of the current batch.
    ///
    /// On the first call this lazily fetches the initial batch, inline if the
    /// source is synchronous. Once the current batch is exhausted this
    /// returns false; for asynchronous sources further advances keep
    /// returning false until a new batch is fetched, while synchronous
    /// sources chain to the next batch inline.
    pub fn advance(&mut self) -> Result<bool> {
        self.check_open()?;

        if !self.initialized {
            self.initialized = true;
            if self.synchronous {
                self.install_next_batch_inline()?;
            }
        }

        loop {
            if let Some(item) = self.batch.as_mut().and_then(|iter| iter.next()) {
                self.current = Some(item);
                return Ok(true);
            }

            // Current batch exhausted.
            self.batch = None;
            self.current = None;
            self.enumerating = false;

            if !self.synchronous {
                return Ok(false);
            }
            if !self.install_next_batch_inline()? {
                return Ok(false);
            }
        }
    }

    /// Fetch the next batch, suspending at the source's I/O boundaries.
    ///
    /// Errors if the current batch has not been fully consumed. Skips empty
    /// batches. On success the cursor's current item is the first element of
    /// the new batch. Calling after exhaustion is a no-op returning false.
    pub async fn fetch_next_batch(&mut self) -> Result<bool> {
        self.check_open()?;
        if self.enumerating {
            return Err(PullexecError::invalid_operation(
                "fetch_next_batch called before the current batch was fully consumed",
            ));
        }
        self.initialized = true;

        let source = self.source.as_mut().required("cursor source")?;
        loop {
            match source.pull().await? {
                Some(batch) if batch.is_empty() => continue,
                Some(batch) => {
                    let mut iter = batch.into_iter();
                    self.current = iter.next();
                    self.batch = Some(iter);
                    self.enumerating = true;
                    return Ok(true);
                }
                None => {
                    self.current = None;
                    return Ok(false);
                }
            }
        }
    }

    /// Pull the next item by value, fetching batches as needed.
    ///
    /// This is the consumption loop used by downstream operators. Returns
    /// None once the cursor is exhausted.
    pub async fn next_item(&mut self) -> Result<Option<T>> {
        if self.advance()? {
            return Ok(self.current.take());
        }
        if self.is_synchronous() {
            // A synchronous cursor that failed to advance is exhausted.
            return Ok(None);
        }
        if self.fetch_next_batch().await? {
            Ok(self.current.take())
        } else {
            Ok(None)
        }
    }

    /// Drain the remainder of the current batch, or fetch and drain the next
    /// one, preserving upstream batch boundaries.
    ///
    /// Used by pass-through sources (factory, observe) so that downstream
    /// batch boundaries mirror upstream ones.
    pub(crate) async fn pull_batch(&mut self) -> Result<Option<Vec<T>>> {
        let mut out = Vec::new();
        while self.advance()? {
            if let Some(item) = self.current.take() {
                out.push(item);
            }
        }
        if !out.is_empty() {
            return Ok(Some(out));
        }

        if self.fetch_next_batch().await? {
            if let Some(item) = self.current.take() {
                out.push(item);
            }
            while self.advance()? {
                if let Some(item) = self.current.take() {
                    out.push(item);
                }
            }
            Ok(Some(out))
        } else {
            Ok(None)
        }
    }

    /// Close the cursor. Idempotent.
    ///
    /// Any operation on a closed cursor fails with a closed-cursor error.
    /// Drops the source immediately, cascading teardown through its owned
    /// upstream cursors and buffered state.
    pub fn close(&mut self) {
        self.source = None;
        self.batch = None;
        self.current = None;
        self.enumerating = false;
        self.closed = true;
    }

    /// Inline batch fetch for synchronous sources.
    ///
    /// A synchronous source's pull futures must complete without suspending;
    /// a pending poll here indicates a source that lied about its
    /// synchronicity.
    fn install_next_batch_inline(&mut self) -> Result<bool> {
        let source = self.source.as_mut().required("cursor source")?;
        loop {
            let fetched = source.pull().now_or_never().ok_or_else(|| {
                PullexecError::internal("synchronous source returned a pending batch fetch")
            })??;

            match fetched {
                Some(batch) if batch.is_empty() => continue,
                Some(batch) => {
                    self.batch = Some(batch.into_iter());
                    self.enumerating = true;
                    return Ok(true);
                }
                None => return Ok(false),
            }
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(PullexecError::closed("cursor closed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pullexec_error::ErrorKind;

    use super::*;
    use crate::operators::values::ValuesSource;
    use crate::testutil::{ChunkedSource, block_on};

    #[test]
    fn advance_through_synchronous_source() {
        let mut cursor = Cursor::from_source(ValuesSource::new(vec![1, 2, 3]));
        assert!(cursor.is_synchronous());

        let mut got = Vec::new();
        while cursor.advance().unwrap() {
            got.push(*cursor.current().unwrap());
        }
        assert_eq!(vec![1, 2, 3], got);

        // Exhausted, stays exhausted.
        assert!(!cursor.advance().unwrap());
        assert_eq!(None, cursor.current());
    }

    #[test]
    fn advance_chains_synchronous_batches_inline() {
        let source = ChunkedSource::synchronous(vec![vec![1, 2], vec![], vec![3]]);
        let mut cursor = Cursor::from_source(source);

        let mut got = Vec::new();
        while cursor.advance().unwrap() {
            got.push(*cursor.current().unwrap());
        }
        assert_eq!(vec![1, 2, 3], got);
    }

    #[test]
    fn fetch_required_for_asynchronous_source() {
        let source = ChunkedSource::asynchronous(vec![vec![1, 2], vec![3]]);
        let mut cursor = Cursor::from_source(source);
        assert!(!cursor.is_synchronous());

        // Nothing available synchronously before the first fetch.
        assert!(!cursor.advance().unwrap());

        assert!(block_on(cursor.fetch_next_batch()).unwrap());
        // Fetch positions the cursor on the batch's first element.
        assert_eq!(Some(&1), cursor.current());
        assert!(cursor.advance().unwrap());
        assert_eq!(Some(&2), cursor.current());
        assert!(!cursor.advance().unwrap());

        assert!(block_on(cursor.fetch_next_batch()).unwrap());
        assert_eq!(Some(&3), cursor.current());
        assert!(!cursor.advance().unwrap());

        assert!(!block_on(cursor.fetch_next_batch()).unwrap());
        // No-op after exhaustion.
        assert!(!block_on(cursor.fetch_next_batch()).unwrap());
    }

    #[test]
    fn fetch_skips_empty_batches() {
        let source = ChunkedSource::asynchronous(vec![vec![], vec![], vec![7]]);
        let mut cursor = Cursor::from_source(source);

        assert!(block_on(cursor.fetch_next_batch()).unwrap());
        assert_eq!(Some(&7), cursor.current());
    }

    #[test]
    fn fetch_mid_batch_is_protocol_violation() {
        let source = ChunkedSource::asynchronous(vec![vec![1, 2]]);
        let mut cursor = Cursor::from_source(source);

        assert!(block_on(cursor.fetch_next_batch()).unwrap());
        let err = block_on(cursor.fetch_next_batch()).unwrap_err();
        assert_eq!(ErrorKind::InvalidOperation, err.kind());
    }

    #[test]
    fn closed_cursor_fails_all_operations() {
        let mut cursor = Cursor::from_source(ValuesSource::new(vec![1]));
        cursor.close();
        cursor.close(); // Idempotent.

        assert_eq!(ErrorKind::Closed, cursor.advance().unwrap_err().kind());
        assert_eq!(
            ErrorKind::Closed,
            block_on(cursor.fetch_next_batch()).unwrap_err().kind()
        );
    }

    #[test]
    fn close_drops_source_state() {
        use std::sync::Arc;

        struct HoldsState {
            _state: Arc<()>,
        }

        impl Source<i32> for HoldsState {
            fn is_synchronous(&self) -> bool {
                true
            }

            fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<i32>>>> {
                Box::pin(async move { Ok(None) })
            }
        }

        let state = Arc::new(());
        let mut cursor = Cursor::from_source(HoldsState {
            _state: state.clone(),
        });
        assert_eq!(2, Arc::strong_count(&state));

        // Closing releases the source and everything it owns, without
        // waiting for the cursor itself to drop.
        cursor.close();
        assert_eq!(1, Arc::strong_count(&state));
    }

    #[test]
    fn next_item_drains_asynchronous_source() {
        let source = ChunkedSource::asynchronous(vec![vec![1], vec![], vec![2, 3]]);
        let mut cursor = Cursor::from_source(source);

        let mut got = Vec::new();
        while let Some(item) = block_on(cursor.next_item()).unwrap() {
            got.push(item);
        }
        assert_eq!(vec![1, 2, 3], got);
    }
}

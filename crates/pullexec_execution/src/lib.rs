//! Pull-based query execution core.
//!
//! Everything is a [`Source`]: a stream of item batches pulled on demand.
//! A [`Cursor`] wraps a source and exposes the two-phase iteration
//! protocol, synchronous [`Cursor::advance`] within the buffered batch and
//! asynchronous [`Cursor::fetch_next_batch`] across batch boundaries.
//! Operators compose by wrapping the cursor of their input.

pub mod collection;
pub mod cursor;
pub mod materialize;
pub mod operators;

#[cfg(test)]
mod testutil;

pub use collection::{Batch, Materialized};
pub use cursor::{Cursor, Source};
pub use materialize::{Comparator, DEFAULT_BATCH_SIZE, HeapMaterializer, Materializer};

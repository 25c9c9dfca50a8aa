//! Operator sources, one state machine per relational operator.

pub mod batch;
pub mod cross_join;
pub mod distinct;
pub mod factory;
pub mod key_join;
pub mod observe;
pub mod ordered;
pub mod project;
pub mod union;
pub mod value_batch;
pub mod values;
pub mod zip;

use std::sync::Arc;

use pullexec_error::Result;

use crate::collection::Materialized;
use crate::cursor::Cursor;
use crate::materialize::{Comparator, Materializer};

/// Operator input that may already be materialized.
///
/// Operators with a random-access or pre-sorted precondition check this at
/// construction to pick their synchronous fast path.
pub enum Input<T> {
    Cursor(Cursor<T>),
    Materialized(Materialized<T>),
}

impl<T> From<Cursor<T>> for Input<T> {
    fn from(cursor: Cursor<T>) -> Self {
        Input::Cursor(cursor)
    }
}

impl<T> From<Materialized<T>> for Input<T> {
    fn from(collection: Materialized<T>) -> Self {
        Input::Materialized(collection)
    }
}

impl<T> Input<T> {
    pub fn is_materialized(&self) -> bool {
        matches!(self, Input::Materialized(_))
    }
}

impl<T: Clone + Send + Sync + 'static> Input<T> {
    pub fn is_synchronous(&self) -> bool {
        match self {
            Input::Cursor(cursor) => cursor.is_synchronous(),
            Input::Materialized(_) => true,
        }
    }

    pub(crate) fn into_cursor(self) -> Cursor<T> {
        match self {
            Input::Cursor(cursor) => cursor,
            Input::Materialized(collection) => collection.cursor(),
        }
    }

    /// Resolve to a materialized collection, buffering if needed.
    pub(crate) async fn into_materialized(
        self,
        materializer: Arc<dyn Materializer<T>>,
    ) -> Result<Materialized<T>> {
        match self {
            Input::Materialized(collection) => Ok(collection),
            Input::Cursor(cursor) => materializer.materialize(cursor).await,
        }
    }

    /// Resolve to a collection sorted by the given comparator.
    pub(crate) async fn into_sorted(
        self,
        materializer: Arc<dyn Materializer<T>>,
        comparator: Comparator<T>,
    ) -> Result<Materialized<T>> {
        materializer.sort(self.into_cursor(), comparator).await
    }
}

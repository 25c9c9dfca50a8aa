//! Sorted merge union with duplicate elimination.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::try_join;
use pullexec_error::{OptionExt, Result};

use crate::collection::Materialized;
use crate::cursor::Source;
use crate::materialize::{Comparator, Materializer};
use crate::operators::Input;

/// Set union of two inputs in comparator order.
///
/// Both sides are sorted concurrently, then merged. Ties take the left
/// element and consume both sides. Values equal to the previously emitted
/// value are suppressed, so duplicates within a single side collapse too.
pub struct UnionSource<T> {
    left: Option<Input<T>>,
    right: Option<Input<T>>,
    comparator: Comparator<T>,
    materializer: Arc<dyn Materializer<T>>,
    sorted_left: Option<Materialized<T>>,
    sorted_right: Option<Materialized<T>>,
    li: usize,
    ri: usize,
    /// Last emitted value, for duplicate suppression across batches.
    last: Option<T>,
}

impl<T: Clone + Send + Sync + 'static> UnionSource<T> {
    pub fn new(
        left: Input<T>,
        right: Input<T>,
        comparator: Comparator<T>,
        materializer: Arc<dyn Materializer<T>>,
    ) -> Self {
        UnionSource {
            left: Some(left),
            right: Some(right),
            comparator,
            materializer,
            sorted_left: None,
            sorted_right: None,
            li: 0,
            ri: 0,
            last: None,
        }
    }

    fn emit(&mut self, item: &T, out: &mut Vec<T>) {
        let duplicate = match &self.last {
            Some(last) => (self.comparator)(item, last) == Ordering::Equal,
            None => false,
        };
        if !duplicate {
            out.push(item.clone());
            self.last = Some(item.clone());
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Source<T> for UnionSource<T> {
    fn is_synchronous(&self) -> bool {
        false
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move {
            if self.sorted_left.is_none() {
                let left = self.left.take().required("union left input")?;
                let right = self.right.take().required("union right input")?;
                let (sorted_left, sorted_right) = try_join!(
                    left.into_sorted(self.materializer.clone(), self.comparator.clone()),
                    right.into_sorted(self.materializer.clone(), self.comparator.clone()),
                )?;
                self.sorted_left = Some(sorted_left);
                self.sorted_right = Some(sorted_right);
            }
            let left = self.sorted_left.clone().required("union left collection")?;
            let right = self.sorted_right.clone().required("union right collection")?;
            let (lhs, rhs) = (left.as_slice(), right.as_slice());

            if self.li >= lhs.len() && self.ri >= rhs.len() {
                return Ok(None);
            }

            let batch_size = self.materializer.batch_size();
            let mut out = Vec::new();
            while out.len() < batch_size && (self.li < lhs.len() || self.ri < rhs.len()) {
                if self.li >= lhs.len() {
                    let item = rhs[self.ri].clone();
                    self.ri += 1;
                    self.emit(&item, &mut out);
                } else if self.ri >= rhs.len() {
                    let item = lhs[self.li].clone();
                    self.li += 1;
                    self.emit(&item, &mut out);
                } else {
                    match (self.comparator)(&lhs[self.li], &rhs[self.ri]) {
                        Ordering::Less => {
                            let item = lhs[self.li].clone();
                            self.li += 1;
                            self.emit(&item, &mut out);
                        }
                        Ordering::Greater => {
                            let item = rhs[self.ri].clone();
                            self.ri += 1;
                            self.emit(&item, &mut out);
                        }
                        Ordering::Equal => {
                            // Tie takes the left element, consumes both.
                            let item = lhs[self.li].clone();
                            self.li += 1;
                            self.ri += 1;
                            self.emit(&item, &mut out);
                        }
                    }
                }
            }

            // Duplicate suppression may leave the batch empty, the cursor
            // pulls again.
            Ok(Some(out))
        })
    }
}

//! Sort-merge key join supporting all six comparison operators.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::try_join;
use pullexec_error::{OptionExt, Result};

use crate::collection::Materialized;
use crate::cursor::Source;
use crate::materialize::{Comparator, Materializer};
use crate::operators::Input;

/// Compares a left-side key against a right-side key.
pub type KeyComparator<L, R> = Arc<dyn Fn(&L, &R) -> Ordering + Send + Sync>;

/// Post-match predicate applied to candidate pairs before emission.
pub type ResultFilter<L, R> = Arc<dyn Fn(&L, &R) -> bool + Send + Sync>;

/// Join comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCompare {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    /// Left elements without a match are emitted once with no right value.
    Left,
}

/// Key extraction for both sides of a join.
///
/// `compare` relates a left element to a right element through their keys.
/// `sort_left` and `sort_right` must order each side consistently with
/// `compare`.
pub struct JoinKeys<L, R> {
    pub compare: KeyComparator<L, R>,
    pub sort_left: Comparator<L>,
    pub sort_right: Comparator<R>,
}

impl<L, R> Clone for JoinKeys<L, R> {
    fn clone(&self) -> Self {
        JoinKeys {
            compare: self.compare.clone(),
            sort_left: self.sort_left.clone(),
            sort_right: self.sort_right.clone(),
        }
    }
}

impl<L: 'static, R: 'static> JoinKeys<L, R> {
    /// Keys with all three orderings flipped. Turns a greater-than join into
    /// a less-than join over descending collections.
    fn reversed(&self) -> Self {
        let compare = self.compare.clone();
        let sort_left = self.sort_left.clone();
        let sort_right = self.sort_right.clone();
        JoinKeys {
            compare: Arc::new(move |l: &L, r: &R| compare(l, r).reverse()),
            sort_left: Arc::new(move |a: &L, b: &L| sort_left(a, b).reverse()),
            sort_right: Arc::new(move |a: &R, b: &R| sort_right(a, b).reverse()),
        }
    }
}

/// Merge join over two sorted sides.
///
/// Both sides are sorted by their key comparators during initialization, the
/// two sorts running concurrently. Greater-than joins are normalized to
/// less-than joins by flipping every ordering, so the merge loop only ever
/// deals with `Equal`, `NotEqual`, `LessThan` and `LessThanOrEqual`.
pub struct KeyJoinSource<L, R, O> {
    left: Option<Input<L>>,
    right: Option<Input<R>>,
    keys: JoinKeys<L, R>,
    compare: KeyCompare,
    join_type: JoinType,
    filter: Option<ResultFilter<L, R>>,
    selector: Box<dyn Fn(&L, Option<&R>) -> O + Send>,
    left_materializer: Arc<dyn Materializer<L>>,
    right_materializer: Arc<dyn Materializer<R>>,
    /// True when both inputs arrive materialized in key order, skipping the
    /// sorts. Forced off for normalized greater-than joins.
    inputs_sorted: bool,
    left_collection: Option<Materialized<L>>,
    right_collection: Option<Materialized<R>>,
    left_pos: usize,
    /// Low-water mark into the right side. Right values below it can never
    /// match the current or any later left element.
    right_index: usize,
    /// Scan position in the right side for the current left element.
    scan_pos: usize,
    /// Pairs emitted for the current left element, after filtering.
    items_returned: usize,
    /// Whether the merge loop is mid-way through a left element.
    scanning: bool,
    done: bool,
}

impl<L, R, O> KeyJoinSource<L, R, O>
where
    L: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        left: Input<L>,
        right: Input<R>,
        keys: JoinKeys<L, R>,
        compare: KeyCompare,
        join_type: JoinType,
        filter: Option<ResultFilter<L, R>>,
        selector: impl Fn(&L, Option<&R>) -> O + Send + 'static,
        left_materializer: Arc<dyn Materializer<L>>,
        right_materializer: Arc<dyn Materializer<R>>,
        inputs_sorted: bool,
    ) -> Self {
        // Normalize the greater-than operators so the merge loop only walks
        // forward. Reversed orderings invalidate any pre-sorted claim.
        let (keys, compare, inputs_sorted) = match compare {
            KeyCompare::GreaterThan => (keys.reversed(), KeyCompare::LessThan, false),
            KeyCompare::GreaterThanOrEqual => {
                (keys.reversed(), KeyCompare::LessThanOrEqual, false)
            }
            other => (keys, other, inputs_sorted),
        };
        let inputs_sorted = inputs_sorted && left.is_materialized() && right.is_materialized();
        KeyJoinSource {
            left: Some(left),
            right: Some(right),
            keys,
            compare,
            join_type,
            filter,
            selector: Box::new(selector),
            left_materializer,
            right_materializer,
            inputs_sorted,
            left_collection: None,
            right_collection: None,
            left_pos: 0,
            right_index: 0,
            scan_pos: 0,
            items_returned: 0,
            scanning: false,
            done: false,
        }
    }

    async fn init(&mut self) -> Result<()> {
        let left = self.left.take().required("key join left input")?;
        let right = self.right.take().required("key join right input")?;

        let (left_collection, right_collection) = if self.inputs_sorted {
            (
                left.into_materialized(self.left_materializer.clone()).await?,
                right
                    .into_materialized(self.right_materializer.clone())
                    .await?,
            )
        } else {
            try_join!(
                left.into_sorted(self.left_materializer.clone(), self.keys.sort_left.clone()),
                right.into_sorted(
                    self.right_materializer.clone(),
                    self.keys.sort_right.clone()
                ),
            )?
        };

        self.left_collection = Some(left_collection);
        self.right_collection = Some(right_collection);
        Ok(())
    }

    fn passes_filter(&self, left: &L, right: &R) -> bool {
        match &self.filter {
            Some(filter) => filter(left, right),
            None => true,
        }
    }
}

impl<L, R, O> Source<O> for KeyJoinSource<L, R, O>
where
    L: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    fn is_synchronous(&self) -> bool {
        // Pre-sorted materialized inputs skip the sorts, so every pull
        // completes without suspending.
        self.inputs_sorted
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<O>>>> {
        Box::pin(async move {
            if self.done {
                return Ok(None);
            }
            if self.left_collection.is_none() {
                self.init().await?;
            }
            let left = self.left_collection.as_ref().required("left collection")?;
            let right = self
                .right_collection
                .as_ref()
                .required("right collection")?;
            let batch_size = self.left_materializer.batch_size();

            let mut out = Vec::new();
            'left: while self.left_pos < left.len() {
                let l = left.get(self.left_pos).required("left item")?;

                if !self.scanning {
                    self.scanning = true;
                    self.items_returned = 0;
                    match self.compare {
                        KeyCompare::NotEqual => self.scan_pos = 0,
                        KeyCompare::Equal => {
                            // Right values smaller than the current left key
                            // are dead for every remaining left element.
                            while self.right_index < right.len() {
                                let r = right.get(self.right_index).required("right item")?;
                                if (self.keys.compare)(l, r) == Ordering::Greater {
                                    self.right_index += 1;
                                } else {
                                    break;
                                }
                            }
                            self.scan_pos = self.right_index;
                        }
                        KeyCompare::LessThan | KeyCompare::LessThanOrEqual => {
                            let stop = if self.compare == KeyCompare::LessThan {
                                Ordering::Less
                            } else {
                                Ordering::Equal
                            };
                            while self.right_index < right.len() {
                                let r = right.get(self.right_index).required("right item")?;
                                if (self.keys.compare)(l, r) > stop {
                                    self.right_index += 1;
                                } else {
                                    break;
                                }
                            }
                            self.scan_pos = self.right_index;
                        }
                        KeyCompare::GreaterThan | KeyCompare::GreaterThanOrEqual => {
                            unreachable!("greater-than joins are normalized at construction")
                        }
                    }
                }

                while self.scan_pos < right.len() {
                    let r = right.get(self.scan_pos).required("right item")?;
                    let cmp = (self.keys.compare)(l, r);
                    let matched = match self.compare {
                        KeyCompare::Equal => {
                            if cmp != Ordering::Equal {
                                // Sorted right side, no further matches.
                                self.scan_pos = right.len();
                                continue;
                            }
                            true
                        }
                        KeyCompare::NotEqual => cmp != Ordering::Equal,
                        KeyCompare::LessThan => cmp == Ordering::Less,
                        KeyCompare::LessThanOrEqual => cmp != Ordering::Greater,
                        KeyCompare::GreaterThan | KeyCompare::GreaterThanOrEqual => {
                            unreachable!("greater-than joins are normalized at construction")
                        }
                    };
                    self.scan_pos += 1;

                    if matched && self.passes_filter(l, r) {
                        out.push((self.selector)(l, Some(r)));
                        self.items_returned += 1;
                        if out.len() >= batch_size {
                            return Ok(Some(out));
                        }
                    }
                }

                // Right side exhausted for this left element.
                if self.join_type == JoinType::Left && self.items_returned == 0 {
                    out.push((self.selector)(l, None));
                }
                self.scanning = false;
                self.left_pos += 1;
                if out.len() >= batch_size {
                    break 'left;
                }
            }

            if self.left_pos >= left.len() {
                self.done = true;
            }
            if out.is_empty() { Ok(None) } else { Ok(Some(out)) }
        })
    }
}

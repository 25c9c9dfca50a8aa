//! Adapter over a deferred, asynchronously produced sequence.

use futures::future::BoxFuture;
use pullexec_error::{Result, ResultExt};

use crate::cursor::{Cursor, Source};

/// Deferred production of a cursor, e.g. the result of a sub-query.
pub type CursorFactory<T> = BoxFuture<'static, Result<Cursor<T>>>;

enum FactoryState<T> {
    Deferred(CursorFactory<T>),
    Streaming(Cursor<T>),
    Done,
}

/// Source over a sequence that does not exist yet.
///
/// Never synchronous. The first pull awaits the factory to obtain the real
/// cursor, then batches pass through along the inner cursor's boundaries.
pub struct FactorySource<T> {
    state: FactoryState<T>,
}

impl<T> FactorySource<T> {
    pub fn new(factory: CursorFactory<T>) -> Self {
        FactorySource {
            state: FactoryState::Deferred(factory),
        }
    }
}

impl<T: Send + 'static> Source<T> for FactorySource<T> {
    fn is_synchronous(&self) -> bool {
        false
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move {
            loop {
                match &mut self.state {
                    FactoryState::Deferred(factory) => {
                        let cursor = factory.await.context("deferred cursor factory failed")?;
                        self.state = FactoryState::Streaming(cursor);
                    }
                    FactoryState::Streaming(cursor) => match cursor.pull_batch().await? {
                        Some(batch) => return Ok(Some(batch)),
                        None => {
                            self.state = FactoryState::Done;
                            return Ok(None);
                        }
                    },
                    FactoryState::Done => return Ok(None),
                }
            }
        })
    }
}

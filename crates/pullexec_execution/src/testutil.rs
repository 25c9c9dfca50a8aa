//! Test helpers for driving cursors without a runtime.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use pullexec_error::Result;

use crate::cursor::Source;

/// Polls a future to completion on the current thread.
///
/// Every future produced by this crate wakes immediately, so a noop waker
/// with a poll loop is enough.
pub(crate) fn block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = pin!(fut);
    let mut cx = Context::from_waker(noop_waker_ref());
    loop {
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(out) => return out,
            Poll::Pending => std::hint::spin_loop(),
        }
    }
}

/// Returns Pending on its first poll, Ready on the second.
struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Source producing a fixed list of batches, optionally pretending to be
/// asynchronous by yielding once per pull.
pub(crate) struct ChunkedSource<T> {
    batches: VecDeque<Vec<T>>,
    synchronous: bool,
}

impl<T> ChunkedSource<T> {
    pub fn synchronous(batches: Vec<Vec<T>>) -> Self {
        ChunkedSource {
            batches: batches.into(),
            synchronous: true,
        }
    }

    pub fn asynchronous(batches: Vec<Vec<T>>) -> Self {
        ChunkedSource {
            batches: batches.into(),
            synchronous: false,
        }
    }
}

impl<T: Send> Source<T> for ChunkedSource<T> {
    fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    fn pull(&mut self) -> BoxFuture<'_, Result<Option<Vec<T>>>> {
        Box::pin(async move {
            if !self.synchronous {
                YieldOnce { yielded: false }.await;
            }
            Ok(self.batches.pop_front())
        })
    }
}

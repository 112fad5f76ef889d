/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use futures_util::stream::Fuse;
use futures_util::stream::FuturesOrdered;
use futures_util::Future;
use futures_util::Stream;
use futures_util::StreamExt as _;
use pin_project::pin_project;

use crate::policy::ConcurrencyPolicy;

/// Stream for the [`bounded_ordered`](crate::StreamExt::bounded_ordered)
/// method.
#[must_use = "streams do nothing unless polled"]
#[pin_project]
pub struct BoundedOrdered<St>
where
    St: Stream,
    St::Item: Future,
{
    #[pin]
    stream: Fuse<St>,
    in_progress_queue: FuturesOrdered<St::Item>,
    policy: ConcurrencyPolicy,
}

impl<St> fmt::Debug for BoundedOrdered<St>
where
    St: Stream + fmt::Debug,
    St::Item: Future,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedOrdered")
            .field("stream", &self.stream)
            .field("in_progress_queue", &self.in_progress_queue)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<St> BoundedOrdered<St>
where
    St: Stream,
    St::Item: Future,
{
    pub(crate) fn new(stream: St, policy: ConcurrencyPolicy) -> Self {
        Self {
            stream: stream.fuse(),
            in_progress_queue: FuturesOrdered::new(),
            policy,
        }
    }

    /// Returns the concurrency policy this adaptor schedules with.
    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// Returns the number of futures currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_progress_queue.len()
    }

    /// Acquires a reference to the underlying stream that this combinator is
    /// pulling from.
    pub fn get_ref(&self) -> &St {
        self.stream.get_ref()
    }

    /// Acquires a mutable reference to the underlying stream that this
    /// combinator is pulling from.
    ///
    /// Note that care must be taken to avoid tampering with the state of the
    /// stream which may otherwise confuse this combinator.
    pub fn get_mut(&mut self) -> &mut St {
        self.stream.get_mut()
    }

    /// Acquires a pinned mutable reference to the underlying stream that
    /// this combinator is pulling from.
    ///
    /// Note that care must be taken to avoid tampering with the state of the
    /// stream which may otherwise confuse this combinator.
    pub fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut St> {
        self.project().stream.get_pin_mut()
    }

    /// Consumes this combinator, returning the underlying stream.
    ///
    /// Note that this may discard intermediate state of this combinator, so
    /// care should be taken to avoid losing resources when this is called.
    pub fn into_inner(self) -> St {
        self.stream.into_inner()
    }
}

impl<St> Stream for BoundedOrdered<St>
where
    St: Stream,
    St::Item: Future,
{
    type Item = <St::Item as Future>::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Refill only once the in-flight count has dropped below the
        // low-water mark, then fill the window all the way to the batch
        // ceiling. With min_active == batch_size this degenerates to the
        // plain `buffered` fill loop.
        if this.in_progress_queue.len() < this.policy.min_active() {
            while this.in_progress_queue.len() < this.policy.batch_size() {
                match this.stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(future)) => this.in_progress_queue.push_back(future),
                    Poll::Ready(None) | Poll::Pending => break,
                }
            }
        }

        // Attempt to pull the next value from the in_progress_queue.
        match this.in_progress_queue.poll_next_unpin(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Some(output)) => return Poll::Ready(Some(output)),
            Poll::Ready(None) => {}
        }

        // If more values are still coming from the stream, we're not done yet
        if this.stream.is_done() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let queue_len = self.in_progress_queue.len();
        let (lower, upper) = self.stream.size_hint();
        let lower = lower.saturating_add(queue_len);
        let upper = match upper {
            Some(x) => x.checked_add(queue_len),
            None => None,
        };
        (lower, upper)
    }
}

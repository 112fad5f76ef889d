/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

#![warn(missing_docs)]

//! `bounded_ordered` provides a way to run several futures:
//!
//! * concurrently, up to a batch ceiling
//! * in the order they're enqueued
//! * with a low-water mark controlling when the window refills
//!
//! It provides the buffered and ordered semantics of the standard
//! [`buffered`](https://docs.rs/futures/latest/futures/stream/trait.StreamExt.html#method.buffered)
//! combinator in the futures crate, but the concurrency limit is a two-part
//! [`ConcurrencyPolicy`] instead of a single count:
//!
//! * `batch_size` caps the number of simultaneously unresolved futures.
//! * `min_active` is the low-water mark: new futures are pulled from the
//!   stream only once the in-flight count has dropped below it, and the
//!   window then refills all the way to `batch_size`.
//!
//! With `min_active == batch_size` this is strict fixed-width batching, never
//! below capacity while work remains, exactly `buffered(batch_size)`. With
//! `min_active < batch_size` it is a sliding window that waits for the
//! in-flight count to drain below the mark before refilling in a burst,
//! smoothing bursty per-item latency.
//!
//! * Futures are started in the order the stream returns them in.
//! * Once started, futures are polled simultaneously, and completed future
//!   outputs are returned in the SAME enqueue order.
//!
//! # Examples
//!
//! ```rust
//! # futures::executor::block_on(async {
//! use bounded_ordered::ConcurrencyPolicy;
//! use bounded_ordered::StreamExt as _;
//! use futures::StreamExt as _;
//! use futures::channel::oneshot;
//! use futures::stream;
//!
//! let (send_one, recv_one) = oneshot::channel();
//! let (send_two, recv_two) = oneshot::channel();
//!
//! let stream_of_futures = stream::iter(vec![recv_one, recv_two]);
//! let mut bounded = stream_of_futures.bounded_ordered(ConcurrencyPolicy::new(5, 2)?);
//!
//! // Complete the second one before the first one. The results should still
//! // appear in the order they were enqueued in the stream.
//! send_two.send("hello")?;
//! send_one.send("world")?;
//! assert_eq!(bounded.next().await, Some(Ok("world")));
//!
//! assert_eq!(bounded.next().await, Some(Ok("hello")));
//!
//! assert_eq!(bounded.next().await, None);
//! # Ok::<(), Box<dyn std::error::Error>>(()) }).unwrap();
//! ```

mod bounded_ordered_stream;
mod policy;
#[cfg(test)]
mod tests;

pub use crate::bounded_ordered_stream::BoundedOrdered;
pub use crate::policy::ConcurrencyPolicy;
pub use crate::policy::PolicyError;

use futures_util::Future;
use futures_util::Stream;

impl<T: ?Sized> StreamExt for T where T: Stream {}

/// An extension trait for `Stream`s that provides
/// [`bounded_ordered`](StreamExt::bounded_ordered).
pub trait StreamExt: Stream {
    /// An adaptor for creating an ordered queue of pending futures, polled
    /// concurrently within the limits of a [`ConcurrencyPolicy`].
    ///
    /// This stream must return values that are themselves futures. The
    /// adaptor keeps at most `policy.batch_size()` of them unresolved at a
    /// time, pulls more from the stream only when the in-flight count drops
    /// below `policy.min_active()`, and returns outputs in enqueue order
    /// regardless of completion order.
    ///
    /// # Examples
    ///
    /// See [the crate documentation](crate#examples) for an example.
    fn bounded_ordered<Fut>(self, policy: ConcurrencyPolicy) -> BoundedOrdered<Self>
    where
        Self: Sized + Stream<Item = Fut>,
        Fut: Future,
    {
        assert_stream::<Fut::Output, _>(BoundedOrdered::new(self, policy))
    }
}

pub(crate) fn assert_stream<T, S>(stream: S) -> S
where
    S: Stream<Item = T>,
{
    stream
}

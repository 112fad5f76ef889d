/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

#![warn(missing_docs)]

//! Functional iteration over sequences, serially or with bounded
//! concurrency.
//!
//! Every operation in this crate takes a user-supplied callable (a mapper,
//! predicate or reducer) and runs it over a read-only slice. The callable
//! returns a [`Step`], so it may finish synchronously, return a future, or
//! suspend as a resumable routine; all three styles flow through the
//! [`step_runner`] trampoline and behave identically to the caller.
//!
//! The crate is split into two policy families plus the shared folds:
//!
//! * [`Concurrent`]: the parameterizable family, scheduling operations
//!   through [`bounded_ordered`] under a [`ConcurrencyPolicy`]. Results are
//!   always in input order; completion order is unconstrained.
//! * [`serial`]: the degenerate policy `(1, 1)`. Every item's operation is
//!   awaited before the next starts, so suspension points from different
//!   items never interleave.
//! * [`fold`]: `reduce`/`reduce_right` (always serial, shared by both
//!   families) and `pipe`/`compose` built on top of them.
//! * [`transducers`]: map/filter as reducer transformers, folded through
//!   `reduce` and materialized by `into`.
//!
//! # Examples
//!
//! ```rust
//! # futures::executor::block_on(async {
//! use seq_apply::Concurrent;
//! use seq_apply::Step;
//!
//! let ops = Concurrent::with_limits(3, 1)?;
//! let items = [1, 2, 3, 4];
//! let doubled = ops
//!     .map(
//!         |v, _idx, _seq| -> Step<'_, i32, &'static str> {
//!             let v = *v;
//!             Step::deferred(async move { Ok(v * 2) })
//!         },
//!         &items,
//!     )
//!     .await?;
//! assert_eq!(doubled, vec![2, 4, 6, 8]);
//! # Ok::<(), Box<dyn std::error::Error>>(()) }).unwrap();
//! ```

pub mod concurrent;
pub mod fold;
pub mod serial;
pub mod transducers;

pub use bounded_ordered::ConcurrencyPolicy;
pub use bounded_ordered::PolicyError;
pub use step_runner::Resumable;
pub use step_runner::Step;
pub use step_runner::Suspend;
pub use step_runner::drive;
pub use step_runner::run;

pub use crate::concurrent::Concurrent;
pub use crate::concurrent::ConcurrentCache;
pub use crate::concurrent::define;
pub use crate::fold::PipeFn;
pub use crate::fold::compose;
pub use crate::fold::pipe;
pub use crate::fold::reduce;
pub use crate::fold::reduce_right;

/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The serial operation family: the concurrent API with the policy bound to
//! `(1, 1)`.
//!
//! Every item's operation is awaited through the trampoline before the next
//! starts, so side effects and suspension points from different items never
//! interleave, observably unlike the concurrent family.

use step_runner::Step;

use crate::concurrent::Concurrent;

pub use crate::fold::compose;
pub use crate::fold::pipe;
pub use crate::fold::reduce;
pub use crate::fold::reduce_right;

/// Run `op` over every item, one at a time, yielding results in input
/// order.
pub async fn map<'s, T, U, E, I, F>(op: F, items: &'s [T]) -> Result<Vec<U>, E>
where
    F: FnMut(&'s T, usize, &'s [T]) -> Step<'s, U, E, I>,
    U: Send + 's,
    E: Send + 's,
    I: Send + 's,
{
    Concurrent::serial().map(op, items).await
}

/// Run `op` over every item, one at a time, for its side effects only.
pub async fn for_each<'s, T, U, E, I, F>(op: F, items: &'s [T]) -> Result<(), E>
where
    F: FnMut(&'s T, usize, &'s [T]) -> Step<'s, U, E, I>,
    U: Send + 's,
    E: Send + 's,
    I: Send + 's,
{
    Concurrent::serial().for_each(op, items).await
}

/// Serial [`flat_map`](Concurrent::flat_map).
pub async fn flat_map<'s, T, U, E, I, F>(op: F, items: &'s [T]) -> Result<Vec<U>, E>
where
    F: FnMut(&'s T, usize, &'s [T]) -> Step<'s, Vec<U>, E, I>,
    U: Send + 's,
    E: Send + 's,
    I: Send + 's,
{
    Concurrent::serial().flat_map(op, items).await
}

/// Serial [`filter_in`](Concurrent::filter_in).
pub async fn filter_in<'s, T, E, I, P>(predicate: P, items: &'s [T]) -> Result<Vec<&'s T>, E>
where
    T: Sync,
    P: FnMut(&'s T, usize, &'s [T]) -> Step<'s, bool, E, I>,
    E: Send + 's,
    I: Send + 's,
{
    Concurrent::serial().filter_in(predicate, items).await
}

/// Serial [`filter_out`](Concurrent::filter_out).
pub async fn filter_out<'s, T, E, I, P>(predicate: P, items: &'s [T]) -> Result<Vec<&'s T>, E>
where
    T: Sync,
    P: FnMut(&'s T, usize, &'s [T]) -> Step<'s, bool, E, I>,
    E: Send + 's,
    I: Send + 's,
{
    Concurrent::serial().filter_out(predicate, items).await
}

/// Alias of [`filter_in`].
pub async fn filter<'s, T, E, I, P>(predicate: P, items: &'s [T]) -> Result<Vec<&'s T>, E>
where
    T: Sync,
    P: FnMut(&'s T, usize, &'s [T]) -> Step<'s, bool, E, I>,
    E: Send + 's,
    I: Send + 's,
{
    filter_in(predicate, items).await
}

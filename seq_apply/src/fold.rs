/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Left and right folds, and the `pipe`/`compose` combinators built on them.
//!
//! Folds are serial by definition in both policy families: each reducer step
//! is awaited through the trampoline before the next begins.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::future::FutureExt;
use step_runner::Step;
use step_runner::run;

/// Left fold. Awaits `reducer` for each item, left to right, threading the
/// accumulator through. An empty slice resolves to `initial` without
/// invoking the reducer.
pub async fn reduce<'f, 's, A, T, E, I, F>(
    mut reducer: F,
    initial: A,
    items: &'s [T],
) -> Result<A, E>
where
    F: FnMut(A, &'s T, usize, &'s [T]) -> Step<'f, A, E, I>,
    A: Send + 'f,
    E: Send + 'f,
    I: Send + 'f,
{
    let mut acc = initial;
    for (idx, value) in items.iter().enumerate() {
        acc = run(reducer(acc, value, idx, items)).await?;
    }
    Ok(acc)
}

/// Right fold: identical to [`reduce`] but iterating from the last index to
/// the first.
pub async fn reduce_right<'f, 's, A, T, E, I, F>(
    mut reducer: F,
    initial: A,
    items: &'s [T],
) -> Result<A, E>
where
    F: FnMut(A, &'s T, usize, &'s [T]) -> Step<'f, A, E, I>,
    A: Send + 'f,
    E: Send + 'f,
    I: Send + 'f,
{
    let mut acc = initial;
    for (idx, value) in items.iter().enumerate().rev() {
        acc = run(reducer(acc, value, idx, items)).await?;
    }
    Ok(acc)
}

/// A unary stage in a [`pipe`] or [`compose`] chain.
pub type PipeFn<'a, T, E> = Box<dyn Fn(T) -> Step<'a, T, E> + Send + Sync + 'a>;

/// Build a single callable applying `fns` left to right, each stage awaited
/// through the trampoline, the result of one passed to the next. An empty
/// list defaults to the identity function.
pub fn pipe<'a, T, E>(fns: Vec<PipeFn<'a, T, E>>) -> impl Fn(T) -> BoxFuture<'a, Result<T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
{
    let fns = Arc::new(or_identity(fns));
    move |input: T| {
        let fns = Arc::clone(&fns);
        async move { reduce(|acc, f, _idx, _fns| f(acc), input, &fns).await }.boxed()
    }
}

/// Build a single callable applying `fns` right to left; otherwise identical
/// to [`pipe`].
pub fn compose<'a, T, E>(fns: Vec<PipeFn<'a, T, E>>) -> impl Fn(T) -> BoxFuture<'a, Result<T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
{
    let fns = Arc::new(or_identity(fns));
    move |input: T| {
        let fns = Arc::clone(&fns);
        async move { reduce_right(|acc, f, _idx, _fns| f(acc), input, &fns).await }.boxed()
    }
}

/// At a minimum, ensure the chain holds the identity function.
fn or_identity<'a, T, E>(fns: Vec<PipeFn<'a, T, E>>) -> Vec<PipeFn<'a, T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
{
    if fns.is_empty() {
        vec![Box::new(Step::ready)]
    } else {
        fns
    }
}

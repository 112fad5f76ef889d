/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Map and filter expressed as reducer transformers, composed without
//! intermediate collection allocation.
//!
//! A [`Transform`] takes the downstream reducer and returns a new reducer
//! compatible with the fold contract `(accumulator, value, index, sequence)`.
//! [`chain`] composes transforms right to left (compose order), so the
//! first-declared transform touches each value first. [`transduce`] resolves
//! a transform against a terminal combination function and folds the
//! sequence through [`fold::reduce`]; [`into`] picks the terminal combinator
//! from the accumulator type via [`Materialize`].
//!
//! # Examples
//!
//! ```rust
//! # futures::executor::block_on(async {
//! use seq_apply::Step;
//! use seq_apply::transducers;
//!
//! let chain = transducers::chain(vec![
//!     transducers::map(|v: i32, _idx, _seq| Step::ready(v + 1)),
//!     transducers::filter(|v: &i32, _idx, _seq| Step::ready(v % 2 == 0)),
//! ]);
//! let total: Result<i32, &'static str> = transducers::into(chain, 0, &[9, 10, 31]).await;
//! assert_eq!(total, Ok(42));
//! # });
//! ```

use std::ops::Add;
use std::sync::Arc;

use futures::future;
use futures::future::BoxFuture;
use futures::future::FutureExt;
use step_runner::Step;
use step_runner::run;

use crate::fold;

/// A reducer compatible with the fold contract, async-capable.
pub type Reducer<'a, A, V, E> =
    Arc<dyn Fn(A, V, usize, &'a [V]) -> BoxFuture<'a, Result<A, E>> + Send + Sync + 'a>;

/// A reducer transformer: given the downstream reducer, produce a new one.
pub type Transform<'a, A, V, E> =
    Box<dyn Fn(Reducer<'a, A, V, E>) -> Reducer<'a, A, V, E> + Send + Sync + 'a>;

/// A transform applying `mapper` to each value before forwarding it to the
/// downstream reducer.
pub fn map<'a, A, V, E, F>(mapper: F) -> Transform<'a, A, V, E>
where
    F: Fn(V, usize, &'a [V]) -> Step<'a, V, E> + Send + Sync + 'a,
    A: Send + 'a,
    V: Send + Sync + 'a,
    E: Send + 'a,
{
    let mapper = Arc::new(mapper);
    Box::new(move |next: Reducer<'a, A, V, E>| {
        let mapper = Arc::clone(&mapper);
        Arc::new(move |acc, value, idx, seq| {
            let mapper = Arc::clone(&mapper);
            let next = Arc::clone(&next);
            async move {
                let mapped = run(mapper(value, idx, seq)).await?;
                next(acc, mapped, idx, seq).await
            }
            .boxed()
        })
    })
}

/// A transform forwarding a value to the downstream reducer only when
/// `predicate` holds, passing the accumulator through unchanged otherwise.
pub fn filter<'a, A, V, E, P>(predicate: P) -> Transform<'a, A, V, E>
where
    P: Fn(&V, usize, &'a [V]) -> Step<'a, bool, E> + Send + Sync + 'a,
    A: Send + 'a,
    V: Send + Sync + 'a,
    E: Send + 'a,
{
    let predicate = Arc::new(predicate);
    Box::new(move |next: Reducer<'a, A, V, E>| {
        let predicate = Arc::clone(&predicate);
        Arc::new(move |acc, value, idx, seq| {
            let predicate = Arc::clone(&predicate);
            let next = Arc::clone(&next);
            async move {
                if run(predicate(&value, idx, seq)).await? {
                    next(acc, value, idx, seq).await
                } else {
                    Ok(acc)
                }
            }
            .boxed()
        })
    })
}

/// Compose transforms right to left, so the first-declared transform runs
/// first against each value.
pub fn chain<'a, A, V, E>(transforms: Vec<Transform<'a, A, V, E>>) -> Transform<'a, A, V, E>
where
    A: 'a,
    V: 'a,
    E: 'a,
{
    Box::new(move |terminal| {
        transforms
            .iter()
            .rev()
            .fold(terminal, |reducer, transform| transform(reducer))
    })
}

/// Resolve `transform` against the terminal combination function and
/// serially fold the sequence through the resulting reducer, starting from
/// `initial`.
pub async fn transduce<'a, A, V, E, C>(
    transform: Transform<'a, A, V, E>,
    combine: C,
    initial: A,
    items: &'a [V],
) -> Result<A, E>
where
    C: Fn(A, V) -> A + Send + Sync + 'a,
    A: Send + 'a,
    V: Clone + Send + Sync + 'a,
    E: Send + 'a,
{
    let terminal: Reducer<'a, A, V, E> =
        Arc::new(move |acc, value, _idx, _seq| future::ready(Ok(combine(acc, value))).boxed());
    let reducer = transform(terminal);
    fold::reduce(
        move |acc, value: &'a V, idx, seq| -> Step<'a, A, E> {
            Step::Deferred(reducer(acc, value.clone(), idx, seq))
        },
        initial,
        items,
    )
    .await
}

/// Fold the sequence through `transform` into the shape of `initial`,
/// inferring the terminal combination function from the accumulator type.
pub async fn into<'a, A, V, E>(
    transform: Transform<'a, A, V, E>,
    initial: A,
    items: &'a [V],
) -> Result<A, E>
where
    A: Materialize<V> + Send + 'a,
    V: Clone + Send + Sync + 'a,
    E: Send + 'a,
{
    transduce(transform, A::combine, initial, items).await
}

/// The terminal combination step [`into`] uses for an accumulator type:
/// string concatenation for `String`, addition for numbers, logical AND for
/// `bool`, append for `Vec`. Other accumulator types implement this
/// themselves.
pub trait Materialize<V>: Sized {
    /// Combine one value into the accumulator.
    fn combine(self, value: V) -> Self;
}

impl Materialize<String> for String {
    fn combine(mut self, value: String) -> Self {
        self.push_str(&value);
        self
    }
}

impl<'v> Materialize<&'v str> for String {
    fn combine(mut self, value: &'v str) -> Self {
        self.push_str(value);
        self
    }
}

impl Materialize<bool> for bool {
    fn combine(self, value: bool) -> Self {
        self && value
    }
}

impl<T> Materialize<T> for Vec<T> {
    fn combine(mut self, value: T) -> Self {
        self.push(value);
        self
    }
}

macro_rules! impl_numeric_materialize {
    ($($t:ty)*) => {
        $(
            impl Materialize<$t> for $t {
                fn combine(self, value: $t) -> Self {
                    self + value
                }
            }
        )*
    };
}

impl_numeric_materialize!(i8 i16 i32 i64 i128 isize u8 u16 u32 u64 u128 usize f32 f64);

/// String concatenation.
pub fn string(acc: String, value: String) -> String {
    acc + &value
}

/// Numeric addition.
pub fn number<N>(acc: N, value: N) -> N
where
    N: Add<Output = N>,
{
    acc + value
}

/// Logical AND.
pub fn boolean_and(acc: bool, value: bool) -> bool {
    acc && value
}

/// Logical OR.
pub fn boolean_or(acc: bool, value: bool) -> bool {
    acc || value
}

/// List append.
pub fn array<T>(mut acc: Vec<T>, value: T) -> Vec<T> {
    acc.push(value);
    acc
}

/// The accumulator-preserving no-op combinator.
pub fn identity<A, V>(acc: A, _value: V) -> A {
    acc
}

/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

#![warn(missing_docs)]

//! `step_runner` normalizes the three styles a user-supplied operation may be
//! written in, so every caller receives a single future-returning contract:
//!
//! * a plain synchronous return (or synchronous failure),
//! * a deferred value (a future),
//! * a multi-step resumable routine that suspends on intermediate awaitables
//!   and resumes with their resolutions.
//!
//! An operation's outcome is expressed as a [`Step`], a tagged union over the
//! three styles. [`run`] is the trampoline: it matches on the tag and returns
//! exactly one deferred outcome per invocation, value or failure, regardless
//! of which style was used.
//!
//! Resumable routines implement [`Resumable`]. The driver resumes the routine
//! with the resolution of each awaitable it yields; if a yielded awaitable
//! fails, the failure is *injected* back into the routine at its suspension
//! point, so the routine can recover (yield again or complete) or propagate
//! the error. See [`drive`].
//!
//! # Examples
//!
//! ```rust
//! # futures::executor::block_on(async {
//! use step_runner::Step;
//! use step_runner::run;
//!
//! let step: Step<'_, u32, &'static str> = Step::ready(7);
//! assert_eq!(run(step).await, Ok(7));
//!
//! let step: Step<'_, u32, &'static str> = Step::deferred(async { Ok(42) });
//! assert_eq!(run(step).await, Ok(42));
//! # });
//! ```

use std::future::Future;

use futures::future;
use futures::future::BoxFuture;
use futures::future::FutureExt;

/// The outcome of invoking an operation once, tagged by invocation style.
///
/// `T` is the final value type, `E` the failure type, and `I` the type of the
/// intermediate values a resumable routine's yielded awaitables resolve to
/// (defaulted to `T`, since routines commonly await values of their own
/// result type).
pub enum Step<'a, T, E, I = T> {
    /// The operation finished synchronously, with a value or a failure.
    Ready(Result<T, E>),
    /// The operation returned a deferred value.
    Deferred(BoxFuture<'a, Result<T, E>>),
    /// The operation returned a multi-step resumable routine.
    Sequence(Box<dyn Resumable<'a, Item = I, Output = T, Error = E> + Send + 'a>),
}

impl<'a, T, E, I> Step<'a, T, E, I> {
    /// A step that completed synchronously with `value`.
    pub fn ready(value: T) -> Self {
        Step::Ready(Ok(value))
    }

    /// A step that failed synchronously with `error`.
    pub fn fail(error: E) -> Self {
        Step::Ready(Err(error))
    }

    /// A step that resolves to the output of `future`.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'a,
    {
        Step::Deferred(future.boxed())
    }

    /// A step driven as a resumable routine. See [`drive`].
    pub fn sequence<R>(routine: R) -> Self
    where
        R: Resumable<'a, Item = I, Output = T, Error = E> + Send + 'a,
    {
        Step::Sequence(Box::new(routine))
    }
}

impl<'a, T, E, I> From<Result<T, E>> for Step<'a, T, E, I> {
    fn from(result: Result<T, E>) -> Self {
        Step::Ready(result)
    }
}

/// What a [`Resumable`] routine did when resumed: suspend on another
/// awaitable, or complete with its final value.
pub enum Suspend<'a, I, T, E> {
    /// The routine suspended, waiting on this awaitable. Its resolution is
    /// fed back in via [`Resumable::resume`]; its failure via
    /// [`Resumable::inject`].
    Yielded(BoxFuture<'a, Result<I, E>>),
    /// The routine ran to completion.
    Complete(T),
}

/// A suspendable routine with explicit resume-with-value and inject-error
/// entry points.
///
/// The contract mirrors generator-style control flow: [`drive`] first calls
/// `resume(None)`, then feeds each yielded awaitable's resolution back in
/// with `resume(Some(value))`. If a yielded awaitable fails, the failure is
/// delivered through `inject`, where the routine may run cleanup and either
/// recover (return another [`Suspend`]) or propagate (return `Err`). A
/// synchronous `Err` from either entry point fails the whole step.
pub trait Resumable<'a> {
    /// The type the routine's yielded awaitables resolve to.
    type Item;
    /// The routine's final value type.
    type Output;
    /// The routine's failure type.
    type Error;

    /// Advance the routine. `input` is `None` on the first resumption and
    /// `Some` thereafter, carrying the previous awaitable's resolution.
    fn resume(
        &mut self,
        input: Option<Self::Item>,
    ) -> Result<Suspend<'a, Self::Item, Self::Output, Self::Error>, Self::Error>;

    /// Deliver a yielded awaitable's failure into the routine at its current
    /// suspension point.
    fn inject(
        &mut self,
        error: Self::Error,
    ) -> Result<Suspend<'a, Self::Item, Self::Output, Self::Error>, Self::Error>;
}

impl<'a, R> Resumable<'a> for Box<R>
where
    R: Resumable<'a> + ?Sized,
{
    type Item = R::Item;
    type Output = R::Output;
    type Error = R::Error;

    fn resume(
        &mut self,
        input: Option<Self::Item>,
    ) -> Result<Suspend<'a, Self::Item, Self::Output, Self::Error>, Self::Error> {
        (**self).resume(input)
    }

    fn inject(
        &mut self,
        error: Self::Error,
    ) -> Result<Suspend<'a, Self::Item, Self::Output, Self::Error>, Self::Error> {
        (**self).inject(error)
    }
}

/// The trampoline: turn any [`Step`] into a single deferred outcome.
pub fn run<'a, T, E, I>(step: Step<'a, T, E, I>) -> BoxFuture<'a, Result<T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
    I: Send + 'a,
{
    match step {
        Step::Ready(result) => future::ready(result).boxed(),
        Step::Deferred(deferred) => deferred,
        // The resume loop is inlined rather than routed through `drive`:
        // the generic async fn does not instantiate with the boxed trait
        // object.
        Step::Sequence(mut routine) => async move {
            let mut state = routine.resume(None)?;
            loop {
                match state {
                    Suspend::Complete(value) => return Ok(value),
                    Suspend::Yielded(awaitable) => {
                        state = match awaitable.await {
                            Ok(value) => routine.resume(Some(value))?,
                            Err(error) => routine.inject(error)?,
                        };
                    }
                }
            }
        }
        .boxed(),
    }
}

/// Drive a [`Resumable`] routine to completion.
///
/// Resumes with no input first; thereafter each yielded awaitable is awaited
/// and its resolution fed back in, or its failure injected. The loop
/// continues from whatever the routine does next, so a routine may recover
/// from an injected failure any number of times.
pub async fn drive<'a, R>(mut routine: R) -> Result<R::Output, R::Error>
where
    R: Resumable<'a>,
{
    let mut state = routine.resume(None)?;
    loop {
        match state {
            Suspend::Complete(value) => return Ok(value),
            Suspend::Yielded(awaitable) => {
                state = match awaitable.await {
                    Ok(value) => routine.resume(Some(value))?,
                    Err(error) => routine.inject(error)?,
                };
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;

    use super::*;

    type TestStep<T> = Step<'static, T, &'static str>;
    type TestSuspend = Suspend<'static, u32, u32, &'static str>;

    /// Sums a fixed list of values, awaiting each through a yielded
    /// awaitable.
    struct SumSteps {
        inputs: Vec<u32>,
        cursor: usize,
        total: u32,
    }

    impl SumSteps {
        fn new(inputs: Vec<u32>) -> Self {
            Self {
                inputs,
                cursor: 0,
                total: 0,
            }
        }
    }

    impl Resumable<'static> for SumSteps {
        type Item = u32;
        type Output = u32;
        type Error = &'static str;

        fn resume(&mut self, input: Option<u32>) -> Result<TestSuspend, &'static str> {
            if let Some(value) = input {
                self.total += value;
            }
            match self.inputs.get(self.cursor) {
                Some(value) => {
                    self.cursor += 1;
                    Ok(Suspend::Yielded(future::ready(Ok(*value)).boxed()))
                }
                None => Ok(Suspend::Complete(self.total)),
            }
        }

        fn inject(&mut self, error: &'static str) -> Result<TestSuspend, &'static str> {
            Err(error)
        }
    }

    /// Sums a borrowed slice through yielded awaitables, so the routine and
    /// the step carrying it have a non-'static lifetime.
    struct SumBorrowed<'a> {
        inputs: &'a [u32],
        cursor: usize,
        total: u32,
    }

    impl<'a> Resumable<'a> for SumBorrowed<'a> {
        type Item = u32;
        type Output = u32;
        type Error = &'static str;

        fn resume(
            &mut self,
            input: Option<u32>,
        ) -> Result<Suspend<'a, u32, u32, &'static str>, &'static str> {
            if let Some(value) = input {
                self.total += value;
            }
            match self.inputs.get(self.cursor) {
                Some(value) => {
                    self.cursor += 1;
                    Ok(Suspend::Yielded(future::ready(Ok(*value)).boxed()))
                }
                None => Ok(Suspend::Complete(self.total)),
            }
        }

        fn inject(
            &mut self,
            error: &'static str,
        ) -> Result<Suspend<'a, u32, u32, &'static str>, &'static str> {
            Err(error)
        }
    }

    /// Yields a failing awaitable, then recovers from the injected failure
    /// with a fallback value.
    struct Recovering;

    impl Resumable<'static> for Recovering {
        type Item = u32;
        type Output = u32;
        type Error = &'static str;

        fn resume(&mut self, input: Option<u32>) -> Result<TestSuspend, &'static str> {
            match input {
                None => Ok(Suspend::Yielded(future::ready(Err("boom")).boxed())),
                Some(value) => Ok(Suspend::Complete(value)),
            }
        }

        fn inject(&mut self, _error: &'static str) -> Result<TestSuspend, &'static str> {
            Ok(Suspend::Complete(99))
        }
    }

    /// Runs cleanup on injection and still propagates the original failure,
    /// the "throw inside finally" shape.
    struct CleanupThenPropagate {
        cleaned: Arc<AtomicBool>,
    }

    impl Resumable<'static> for CleanupThenPropagate {
        type Item = u32;
        type Output = u32;
        type Error = &'static str;

        fn resume(&mut self, _input: Option<u32>) -> Result<TestSuspend, &'static str> {
            Ok(Suspend::Yielded(future::ready(Err("torn")).boxed()))
        }

        fn inject(&mut self, error: &'static str) -> Result<TestSuspend, &'static str> {
            self.cleaned.store(true, Ordering::SeqCst);
            Err(error)
        }
    }

    #[tokio::test]
    async fn run_ready_step() {
        let step: TestStep<u32> = Step::ready(7);
        assert_eq!(run(step).await, Ok(7));
    }

    #[tokio::test]
    async fn run_failed_step() {
        let step: TestStep<u32> = Step::fail("nope");
        assert_eq!(run(step).await, Err("nope"));
    }

    #[tokio::test]
    async fn run_deferred_step() {
        let step: TestStep<u32> = Step::deferred(async { Ok(42) });
        assert_eq!(run(step).await, Ok(42));

        let step: TestStep<u32> = Step::deferred(async { Err("later") });
        assert_eq!(run(step).await, Err("later"));
    }

    #[tokio::test]
    async fn from_result() {
        let step: TestStep<u32> = Ok(3).into();
        assert_eq!(run(step).await, Ok(3));
    }

    #[tokio::test]
    async fn drives_sequence_to_completion() {
        let step: TestStep<u32> = Step::sequence(SumSteps::new(vec![1, 2, 3]));
        assert_eq!(run(step).await, Ok(6));
    }

    #[tokio::test]
    async fn drive_runs_a_concrete_routine() {
        assert_eq!(drive(SumSteps::new(vec![2, 3])).await, Ok(5));
    }

    #[tokio::test]
    async fn drives_borrowed_sequence_to_completion() {
        let inputs = vec![4, 5, 6];
        let step: Step<'_, u32, &'static str> = Step::sequence(SumBorrowed {
            inputs: &inputs,
            cursor: 0,
            total: 0,
        });
        assert_eq!(run(step).await, Ok(15));
    }

    #[tokio::test]
    async fn empty_sequence_completes_immediately() {
        let step: TestStep<u32> = Step::sequence(SumSteps::new(vec![]));
        assert_eq!(run(step).await, Ok(0));
    }

    #[tokio::test]
    async fn injected_failure_can_be_recovered() {
        let step: TestStep<u32> = Step::sequence(Recovering);
        assert_eq!(run(step).await, Ok(99));
    }

    #[tokio::test]
    async fn injected_failure_survives_cleanup() {
        let cleaned = Arc::new(AtomicBool::new(false));
        let step: TestStep<u32> = Step::sequence(CleanupThenPropagate {
            cleaned: cleaned.clone(),
        });
        assert_eq!(run(step).await, Err("torn"));
        assert!(cleaned.load(Ordering::SeqCst));
    }
}

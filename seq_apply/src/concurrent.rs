/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The bounded-concurrency operation family.
//!
//! [`Concurrent`] binds a [`ConcurrencyPolicy`] to the full operation set:
//! `map`, `for_each`, `flat_map` and the filters. All of them schedule the
//! trampoline-wrapped operation through
//! [`bounded_ordered`](bounded_ordered::StreamExt::bounded_ordered), so
//! results come back in input order while completions interleave freely, and
//! the first observed failure fails the whole call.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use bounded_ordered::ConcurrencyPolicy;
use bounded_ordered::PolicyError;
use bounded_ordered::StreamExt as _;
use futures::StreamExt as _;
use futures::stream;
use once_cell::sync::Lazy;
use step_runner::Step;
use step_runner::run;

/// The bounded-concurrency operation set for one [`ConcurrencyPolicy`].
///
/// Cheap to construct and copy; [`ConcurrentCache`] exists for callers that
/// want the policy-keyed memoization of repeated lookups.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Concurrent {
    policy: ConcurrencyPolicy,
}

impl Concurrent {
    /// Build the operation set for an already-validated policy.
    pub fn new(policy: ConcurrencyPolicy) -> Self {
        Self { policy }
    }

    /// Validate `(batch_size, min_active)` and build the operation set.
    /// Fails before any item is processed if `batch_size < 1` or
    /// `min_active` is outside `[1, batch_size]`.
    pub fn with_limits(batch_size: usize, min_active: usize) -> Result<Self, PolicyError> {
        Ok(Self::new(ConcurrencyPolicy::new(batch_size, min_active)?))
    }

    /// The serial operation set: policy `(1, 1)`.
    pub const fn serial() -> Self {
        Self {
            policy: ConcurrencyPolicy::serial(),
        }
    }

    /// The operation set with no practical concurrency limit.
    pub const fn unbounded() -> Self {
        Self {
            policy: ConcurrencyPolicy::unbounded(),
        }
    }

    /// The policy this operation set schedules with.
    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// Run `op` over every item, yielding the results in input order.
    ///
    /// Operations are launched in sequence order, at most
    /// `policy.batch_size()` unresolved at once. An empty slice resolves to
    /// an empty vector without invoking `op`. The first observed failure is
    /// returned unchanged; operations still in flight are dropped, not
    /// awaited further.
    pub async fn map<'s, T, U, E, I, F>(&self, mut op: F, items: &'s [T]) -> Result<Vec<U>, E>
    where
        F: FnMut(&'s T, usize, &'s [T]) -> Step<'s, U, E, I>,
        U: Send + 's,
        E: Send + 's,
        I: Send + 's,
    {
        let steps = items
            .iter()
            .enumerate()
            .map(|(idx, value)| run(op(value, idx, items)));
        let mut scheduled = stream::iter(steps).bounded_ordered(self.policy);
        let mut results = Vec::with_capacity(items.len());
        while let Some(result) = scheduled.next().await {
            results.push(result?);
        }
        Ok(results)
    }

    /// Run `op` over every item for its side effects only.
    pub async fn for_each<'s, T, U, E, I, F>(&self, op: F, items: &'s [T]) -> Result<(), E>
    where
        F: FnMut(&'s T, usize, &'s [T]) -> Step<'s, U, E, I>,
        U: Send + 's,
        E: Send + 's,
        I: Send + 's,
    {
        self.map(op, items).await?;
        Ok(())
    }

    /// Run `op` over every item and concatenate the per-item lists into one
    /// flat list, preserving outer ordering and inner element order.
    pub async fn flat_map<'s, T, U, E, I, F>(&self, op: F, items: &'s [T]) -> Result<Vec<U>, E>
    where
        F: FnMut(&'s T, usize, &'s [T]) -> Step<'s, Vec<U>, E, I>,
        U: Send + 's,
        E: Send + 's,
        I: Send + 's,
    {
        let nested = self.map(op, items).await?;
        Ok(nested.into_iter().flatten().collect())
    }

    /// Keep the items whose predicate outcome is true, in input order.
    ///
    /// The predicate runs under this set's concurrency policy; pairing each
    /// item with its outcome first and reducing serially afterwards keeps
    /// the original order regardless of completion order.
    pub async fn filter_in<'s, T, E, I, P>(
        &self,
        mut predicate: P,
        items: &'s [T],
    ) -> Result<Vec<&'s T>, E>
    where
        T: Sync,
        P: FnMut(&'s T, usize, &'s [T]) -> Step<'s, bool, E, I>,
        E: Send + 's,
        I: Send + 's,
    {
        let paired = self
            .map(
                |value, idx, seq| -> Step<'s, (&'s T, bool), E> {
                    let step = predicate(value, idx, seq);
                    Step::deferred(async move { Ok((value, run(step).await?)) })
                },
                items,
            )
            .await?;
        Ok(paired
            .into_iter()
            .filter_map(|(value, keep)| keep.then_some(value))
            .collect())
    }

    /// Keep the items whose predicate outcome is false, in input order.
    pub async fn filter_out<'s, T, E, I, P>(
        &self,
        mut predicate: P,
        items: &'s [T],
    ) -> Result<Vec<&'s T>, E>
    where
        T: Sync,
        P: FnMut(&'s T, usize, &'s [T]) -> Step<'s, bool, E, I>,
        E: Send + 's,
        I: Send + 's,
    {
        self.filter_in(
            move |value, idx, seq| -> Step<'s, bool, E> {
                let step = predicate(value, idx, seq);
                Step::deferred(async move { Ok(!run(step).await?) })
            },
            items,
        )
        .await
    }

    /// Alias of [`filter_in`](Concurrent::filter_in).
    pub async fn filter<'s, T, E, I, P>(
        &self,
        predicate: P,
        items: &'s [T],
    ) -> Result<Vec<&'s T>, E>
    where
        T: Sync,
        P: FnMut(&'s T, usize, &'s [T]) -> Step<'s, bool, E, I>,
        E: Send + 's,
        I: Send + 's,
    {
        self.filter_in(predicate, items).await
    }
}

impl Default for Concurrent {
    /// The factory default: strict batching with a batch of five.
    fn default() -> Self {
        Self::new(ConcurrencyPolicy::default())
    }
}

/// A policy-keyed memoization cache of [`Concurrent`] operation sets.
///
/// Repeated requests for the same `(batch_size, min_active)` pair return the
/// same set. The cache grows with distinct pairs requested and is never
/// evicted; policies are typically few and stable. Independent instances can
/// be constructed so tests don't share state; [`define`] uses a process-wide
/// default.
#[derive(Debug, Default)]
pub struct ConcurrentCache {
    inner: Mutex<HashMap<(usize, usize), Arc<Concurrent>>>,
}

impl ConcurrentCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the operation set for `(batch_size, min_active)`, building
    /// and memoizing it on first request. Invalid limits fail without
    /// touching the cache.
    pub fn get_or_define(
        &self,
        batch_size: usize,
        min_active: usize,
    ) -> Result<Arc<Concurrent>, PolicyError> {
        let policy = ConcurrencyPolicy::new(batch_size, min_active)?;
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        Ok(Arc::clone(
            inner
                .entry((batch_size, min_active))
                .or_insert_with(|| Arc::new(Concurrent::new(policy))),
        ))
    }

    /// The number of distinct policies cached so far.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Look up `(batch_size, min_active)` in the process-wide cache.
pub fn define(batch_size: usize, min_active: usize) -> Result<Arc<Concurrent>, PolicyError> {
    static CACHE: Lazy<ConcurrentCache> = Lazy::new(ConcurrentCache::new);
    CACHE.get_or_define(batch_size, min_active)
}

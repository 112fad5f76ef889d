/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use thiserror::Error;

/// Error returned when a [`ConcurrencyPolicy`] is constructed with invalid
/// bounds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// `batch_size` was zero.
    #[error("batch size limit must be at least 1")]
    BatchSize,
    /// `min_active` was zero or exceeded the batch ceiling.
    #[error("minimum active threshold must be between 1 and {batch_size}")]
    MinActive {
        /// The batch ceiling the threshold was checked against.
        batch_size: usize,
    },
}

/// A validated `(batch_size, min_active)` pair controlling a
/// [`BoundedOrdered`](crate::BoundedOrdered) stream.
///
/// Invariants: `batch_size >= 1` and `1 <= min_active <= batch_size`.
/// Violating either bound is a construction-time failure, before any item is
/// processed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConcurrencyPolicy {
    batch_size: usize,
    min_active: usize,
}

impl ConcurrencyPolicy {
    /// Validate and build a policy from a batch ceiling and a low-water
    /// mark.
    pub fn new(batch_size: usize, min_active: usize) -> Result<Self, PolicyError> {
        if batch_size < 1 {
            return Err(PolicyError::BatchSize);
        }
        if min_active < 1 || min_active > batch_size {
            return Err(PolicyError::MinActive { batch_size });
        }
        Ok(Self {
            batch_size,
            min_active,
        })
    }

    /// Strict fixed-width batching: `min_active == batch_size`, so the
    /// window is never below capacity while work remains.
    pub fn strict(batch_size: usize) -> Result<Self, PolicyError> {
        Self::new(batch_size, batch_size)
    }

    /// The serial policy `(1, 1)`: at most one operation in flight.
    pub const fn serial() -> Self {
        Self {
            batch_size: 1,
            min_active: 1,
        }
    }

    /// A policy with no practical concurrency limit.
    pub const fn unbounded() -> Self {
        Self {
            batch_size: usize::MAX,
            min_active: usize::MAX,
        }
    }

    /// The maximum number of simultaneously unresolved futures.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The in-flight count below which the window refills.
    pub fn min_active(&self) -> usize {
        self.min_active
    }
}

impl Default for ConcurrencyPolicy {
    /// Strict batching with a batch of five.
    fn default() -> Self {
        Self {
            batch_size: 5,
            min_active: 5,
        }
    }
}

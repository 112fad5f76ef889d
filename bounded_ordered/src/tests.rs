/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::Stream as _;
use futures::StreamExt as _;
use futures::channel::oneshot;
use futures::stream;
use proptest::prelude::*;

use crate::ConcurrencyPolicy;
use crate::StreamExt as _;

/// Tracks how many futures are unresolved at once and the highest count
/// observed.
#[derive(Clone, Default)]
struct ActiveCounter {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ActiveCounter {
    fn start(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn counted_sleeps(
    counter: &ActiveCounter,
    delays: Vec<u64>,
) -> Vec<impl std::future::Future<Output = usize>> {
    delays
        .into_iter()
        .enumerate()
        .map(|(idx, delay)| {
            let counter = counter.clone();
            async move {
                counter.start();
                tokio::time::sleep(Duration::from_millis(delay)).await;
                counter.finish();
                idx
            }
        })
        .collect()
}

#[tokio::test]
async fn results_follow_enqueue_order() {
    let (send_one, recv_one) = oneshot::channel();
    let (send_two, recv_two) = oneshot::channel();
    let (send_three, recv_three) = oneshot::channel();

    let policy = ConcurrencyPolicy::strict(3).expect("valid policy");
    let mut bounded = stream::iter(vec![recv_one, recv_two, recv_three]).bounded_ordered(policy);

    // Completion order is 3, 2, 1; output order must still be 1, 2, 3.
    send_three.send(3u32).expect("receiver alive");
    send_two.send(2u32).expect("receiver alive");
    send_one.send(1u32).expect("receiver alive");

    assert_eq!(bounded.next().await, Some(Ok(1)));
    assert_eq!(bounded.next().await, Some(Ok(2)));
    assert_eq!(bounded.next().await, Some(Ok(3)));
    assert_eq!(bounded.next().await, None);
}

#[tokio::test]
async fn empty_stream_is_done_immediately() {
    let policy = ConcurrencyPolicy::serial();
    let futures: Vec<futures::future::Ready<u32>> = vec![];
    let mut bounded = stream::iter(futures).bounded_ordered(policy);
    assert_eq!(bounded.next().await, None);
}

#[tokio::test(start_paused = true)]
async fn strict_batching_holds_the_ceiling() {
    let counter = ActiveCounter::default();
    let futures = counted_sleeps(&counter, vec![10; 10]);

    let policy = ConcurrencyPolicy::strict(3).expect("valid policy");
    let results: Vec<usize> = stream::iter(futures).bounded_ordered(policy).collect().await;

    assert_eq!(results, (0..10).collect::<Vec<_>>());
    assert_eq!(counter.peak(), 3);
}

#[tokio::test(start_paused = true)]
async fn sliding_window_rises_above_the_mark_but_not_the_ceiling() {
    let counter = ActiveCounter::default();
    let futures = counted_sleeps(&counter, vec![10; 12]);

    let policy = ConcurrencyPolicy::new(4, 2).expect("valid policy");
    let results: Vec<usize> = stream::iter(futures).bounded_ordered(policy).collect().await;

    assert_eq!(results, (0..12).collect::<Vec<_>>());
    // The window fills to the ceiling, which is above the low-water mark.
    assert_eq!(counter.peak(), 4);
}

#[tokio::test(start_paused = true)]
async fn serial_policy_runs_one_at_a_time() {
    let counter = ActiveCounter::default();
    let futures = counted_sleeps(&counter, vec![5; 6]);

    let results: Vec<usize> = stream::iter(futures)
        .bounded_ordered(ConcurrencyPolicy::serial())
        .collect()
        .await;

    assert_eq!(results, (0..6).collect::<Vec<_>>());
    assert_eq!(counter.peak(), 1);
}

#[tokio::test]
async fn failures_pass_through_unchanged() {
    let policy = ConcurrencyPolicy::strict(2).expect("valid policy");
    let futures = vec![
        futures::future::ready(Ok::<u32, &'static str>(1)),
        futures::future::ready(Err("boom")),
        futures::future::ready(Ok(3)),
    ];
    let results: Vec<Result<u32, &'static str>> =
        stream::iter(futures).bounded_ordered(policy).collect().await;
    assert_eq!(results, vec![Ok(1), Err("boom"), Ok(3)]);
}

#[test]
fn size_hint_accounts_for_in_flight_futures() {
    let policy = ConcurrencyPolicy::strict(2).expect("valid policy");
    let futures = vec![
        futures::future::ready(1u32),
        futures::future::ready(2),
        futures::future::ready(3),
    ];
    let bounded = stream::iter(futures).bounded_ordered(policy);
    assert_eq!(bounded.size_hint(), (3, Some(3)));
    assert_eq!(bounded.in_flight(), 0);
}

proptest! {
    // Any valid policy must preserve enqueue order and never let the
    // in-flight count exceed the batch ceiling, whatever the per-item
    // latency.
    #[test]
    fn proptest_order_and_ceiling(
        (batch_size, min_active) in (1usize..6).prop_flat_map(|b| (Just(b), 1usize..=b)),
        delays in prop::collection::vec(0u64..20, 0..48),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .expect("tokio builder succeeded");
        runtime.block_on(async {
            let policy = ConcurrencyPolicy::new(batch_size, min_active).expect("valid policy");
            let counter = ActiveCounter::default();
            let count = delays.len();
            let futures = counted_sleeps(&counter, delays);

            let results: Vec<usize> = stream::iter(futures).bounded_ordered(policy).collect().await;

            assert_eq!(results, (0..count).collect::<Vec<_>>());
            assert!(counter.peak() <= batch_size);
        });
    }
}

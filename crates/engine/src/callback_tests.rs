// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use opq_core::testing::{GatedOperation, Tracker, ScriptedOperation};
use opq_core::{FnOperation, FutureError, OperationError, OwnedOperation, Step};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::thread;
use std::time::Duration;
use yare::parameterized;

fn executor_with(queue_size: usize, interval: u32) -> CallbackExecutor {
    let config = ExecutorConfig {
        queue_size,
        interval,
        ..ExecutorConfig::default()
    };
    CallbackExecutor::from_config(&config)
}

fn drain(executor: &CallbackExecutor) -> usize {
    let mut calls = 0;
    while !executor.is_empty() {
        executor.resume();
        calls += 1;
        assert!(calls < 10_000, "executor never drained");
    }
    calls
}

#[test]
fn new_entries_start_queued() {
    let executor = CallbackExecutor::new();
    let handle = executor.submit(ScriptedOperation::new(2).boxed()).unwrap();

    assert_eq!(handle.state(), EntryState::Queued);
    assert_eq!(handle.priority(), 0);
    assert!(!handle.future().is_done());
    assert_eq!(executor.len(), 1);
}

#[test]
fn steps_operation_to_completion() {
    let executor = CallbackExecutor::new();
    let op = ScriptedOperation::new(3);
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();

    assert!(executor.resume());
    assert_eq!(handle.state(), EntryState::Running);
    assert!(executor.resume());
    assert!(executor.resume());

    assert_eq!(handle.state(), EntryState::Completed);
    assert!(handle.future().is_success());
    assert!(handle.future().take_operation().is_some());
    assert_eq!(tracker.resumes(), 3);
    assert!(executor.is_empty());
    assert!(!executor.resume());
}

#[test]
fn resume_on_empty_queue_does_nothing() {
    let executor = CallbackExecutor::new();
    assert!(!executor.resume());
    assert!(executor.queue().is_empty());
}

#[test]
fn passes_configured_hint_to_each_step() {
    let executor = CallbackExecutor::new();
    let hint = ExecutionHint::new(64, false);
    executor.set_hint(hint);
    let op = ScriptedOperation::new(2);
    let tracker = op.tracker();
    executor.submit(op.boxed()).unwrap();

    executor.resume();
    assert_eq!(tracker.last_hint(), Some(hint));
    assert_eq!(executor.hint(), hint);
}

#[test]
fn failure_resolves_future_and_frees_slot() {
    let executor = CallbackExecutor::new();
    let failing = executor
        .submit(
            ScriptedOperation::new(5)
                .failing_at(2, OperationError::failed("disk full"))
                .boxed(),
        )
        .unwrap();
    let next = executor.submit(ScriptedOperation::new(1).boxed()).unwrap();

    executor.resume();
    executor.resume();
    assert_eq!(failing.state(), EntryState::Failed);
    assert_eq!(failing.future().error(), Some(OperationError::failed("disk full")));

    executor.resume();
    assert_eq!(next.state(), EntryState::Completed);
}

#[test]
fn successors_continue_in_the_current_slot() {
    let executor = CallbackExecutor::new();
    let second = ScriptedOperation::new(2);
    let second_tracker = second.tracker();
    let handle = executor
        .submit(ScriptedOperation::new(1).then(second).boxed())
        .unwrap();

    assert_eq!(drain(&executor), 3);
    assert_eq!(second_tracker.resumes(), 2);
    assert_eq!(handle.state(), EntryState::Completed);
}

#[parameterized(
    one = { 1 },
    three = { 3 },
    sixteen = { 16 },
)]
fn rejects_submission_past_queue_size(queue_size: usize) {
    let executor = executor_with(queue_size, 1);
    for _ in 0..queue_size {
        executor.submit(ScriptedOperation::new(1).boxed()).unwrap();
    }

    let err = executor.submit(ScriptedOperation::new(1).boxed()).unwrap_err();
    assert_eq!(err, ExecutorError::Rejected { capacity: queue_size });
    assert_eq!(executor.len(), queue_size);
}

#[test]
fn concurrent_submissions_never_overshoot_queue_size() {
    let executor = Arc::new(executor_with(10, 1));
    let threads: Vec<_> = (0..8)
        .map(|_| {
            let executor = Arc::clone(&executor);
            thread::spawn(move || {
                (0..5)
                    .filter(|_| executor.submit(ScriptedOperation::new(1).boxed()).is_ok())
                    .count()
            })
        })
        .collect();

    let accepted: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();
    assert_eq!(accepted, 10);
    assert_eq!(executor.len(), 10);
}

#[test]
fn current_entry_does_not_count_against_queue_size() {
    let executor = executor_with(1, 1);
    executor.submit(ScriptedOperation::new(3).boxed()).unwrap();
    executor.resume();

    assert!(executor.submit(ScriptedOperation::new(1).boxed()).is_ok());
    assert!(executor.submit(ScriptedOperation::new(1).boxed()).is_err());
}

#[parameterized(
    every_call = { 1 },
    every_second = { 2 },
    every_fifth = { 5 },
)]
fn interval_throttles_steps(interval: u32) {
    let executor = executor_with(usize::MAX, interval);
    let op = ScriptedOperation::new(1000);
    let tracker = op.tracker();
    executor.submit(op.boxed()).unwrap();

    let calls = interval as usize * 7;
    let stepped = (0..calls).filter(|_| executor.resume()).count();

    assert_eq!(stepped, 7);
    assert_eq!(tracker.resumes(), 7);
}

#[test]
fn first_call_after_interval_change_steps() {
    let executor = executor_with(usize::MAX, 3);
    executor.submit(ScriptedOperation::new(100).boxed()).unwrap();

    assert!(executor.resume());
    assert!(!executor.resume());
    executor.set_interval(2);
    assert_eq!(executor.interval(), 2);
    assert!(executor.resume());
    assert!(!executor.resume());
    assert!(executor.resume());
}

#[test]
fn highest_priority_becomes_current_first() {
    let executor = CallbackExecutor::new();
    let low = executor
        .submit_with_priority(ScriptedOperation::new(1).boxed(), 5)
        .unwrap();
    let lowest = executor
        .submit_with_priority(ScriptedOperation::new(1).boxed(), 1)
        .unwrap();
    let high = executor
        .submit_with_priority(ScriptedOperation::new(1).boxed(), 9)
        .unwrap();

    executor.resume();
    assert_eq!(high.state(), EntryState::Completed);
    assert_eq!(low.state(), EntryState::Queued);
    assert_eq!(lowest.state(), EntryState::Queued);

    executor.resume();
    assert_eq!(low.state(), EntryState::Completed);
    assert_eq!(lowest.state(), EntryState::Queued);
}

#[test]
fn equal_priorities_run_in_submission_order() {
    let executor = CallbackExecutor::new();
    let handles: Vec<_> = (0..5)
        .map(|_| executor.submit(ScriptedOperation::new(1).boxed()).unwrap())
        .collect();

    for (i, handle) in handles.iter().enumerate() {
        executor.resume();
        assert_eq!(handle.state(), EntryState::Completed, "entry {i}");
        for later in &handles[i + 1..] {
            assert_eq!(later.state(), EntryState::Queued);
        }
    }
}

#[test]
fn late_high_priority_does_not_preempt_current() {
    let executor = CallbackExecutor::new();
    let running = executor
        .submit_with_priority(ScriptedOperation::new(3).boxed(), 0)
        .unwrap();
    executor.resume();

    let urgent = executor
        .submit_with_priority(ScriptedOperation::new(1).boxed(), 100)
        .unwrap();
    executor.resume();
    executor.resume();

    assert_eq!(running.state(), EntryState::Completed);
    assert_eq!(urgent.state(), EntryState::Queued);
    executor.resume();
    assert_eq!(urgent.state(), EntryState::Completed);
}

#[test]
fn cancel_waiting_entry() {
    let executor = CallbackExecutor::new();
    let op = ScriptedOperation::new(3);
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();

    assert!(handle.cancel());
    assert_eq!(handle.state(), EntryState::Cancelled);
    assert!(matches!(
        handle.future().wait(),
        Err(FutureError::Cancelled { .. })
    ));
    assert_eq!(tracker.cancels(), 1);
    assert!(executor.is_empty());

    assert!(!handle.cancel());
    assert_eq!(tracker.cancels(), 1);
    assert!(!executor.resume());
    assert_eq!(tracker.resumes(), 0);
}

#[test]
fn cancel_current_entry_frees_slot() {
    let executor = CallbackExecutor::new();
    let op = ScriptedOperation::new(5);
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();
    let next = executor.submit(ScriptedOperation::new(1).boxed()).unwrap();

    executor.resume();
    assert!(handle.cancel());
    assert_eq!(tracker.cancels(), 1);

    executor.resume();
    assert_eq!(next.state(), EntryState::Completed);
    assert_eq!(tracker.resumes(), 1);
    assert!(!tracker.resumed_after_cancel());
}

#[test]
fn cancel_error_is_swallowed() {
    let executor = CallbackExecutor::new();
    let op = ScriptedOperation::new(3).with_cancel_error(OperationError::failed("stuck"));
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();

    assert!(handle.cancel());
    assert_eq!(handle.state(), EntryState::Cancelled);
    assert_eq!(tracker.cancels(), 1);
}

#[test]
fn cancel_after_completion_is_refused() {
    let executor = CallbackExecutor::new();
    let op = ScriptedOperation::new(1);
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();
    executor.resume();

    assert!(!handle.cancel());
    assert_eq!(handle.state(), EntryState::Completed);
    assert_eq!(tracker.cancels(), 0);
}

#[test]
fn cancel_during_in_flight_step() {
    let executor = Arc::new(CallbackExecutor::new());
    let inner = ScriptedOperation::new(5);
    let tracker = inner.tracker();
    let (gated, gate) = GatedOperation::new(inner);
    let handle = executor.submit(Box::new(gated)).unwrap();

    let driver = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || executor.resume())
    };
    assert!(gate.wait_entered(Duration::from_secs(5)));

    // Cancel lands while resume is running outside the queue lock
    assert!(handle.cancel());
    assert_eq!(tracker.cancels(), 0);
    gate.release();
    assert!(driver.join().unwrap());

    assert_eq!(handle.state(), EntryState::Cancelled);
    assert_eq!(tracker.cancels(), 1);
    assert_eq!(tracker.resumes(), 1);
    assert!(!executor.resume());
}

#[test]
fn submit_is_not_blocked_by_in_flight_step() {
    let executor = Arc::new(CallbackExecutor::new());
    let (gated, gate) = GatedOperation::new(ScriptedOperation::new(1));
    executor.submit(Box::new(gated)).unwrap();

    let driver = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || executor.resume())
    };
    assert!(gate.wait_entered(Duration::from_secs(5)));

    let other = executor.submit(ScriptedOperation::new(1).boxed()).unwrap();
    assert_eq!(executor.queue().len(), 2);
    gate.release();
    driver.join().unwrap();

    executor.resume();
    assert_eq!(other.state(), EntryState::Completed);
}

#[test]
fn concurrent_resume_does_not_orphan_current() {
    let executor = Arc::new(CallbackExecutor::new());
    let inner = ScriptedOperation::new(3);
    let tracker = inner.tracker();
    let (gated, gate) = GatedOperation::new(inner);
    let handle = executor.submit(Box::new(gated)).unwrap();

    let driver = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || executor.resume())
    };
    assert!(gate.wait_entered(Duration::from_secs(5)));

    // A second tick while the first is still stepping does nothing
    assert!(!executor.resume());
    assert_eq!(executor.queue().len(), 1);
    assert_eq!(handle.state(), EntryState::Running);

    gate.release();
    assert!(driver.join().unwrap());
    assert!(executor.resume());
    assert!(executor.resume());

    assert_eq!(handle.state(), EntryState::Completed);
    assert!(handle.future().is_success());
    assert_eq!(tracker.resumes(), 3);
    assert!(executor.is_empty());
}

#[test]
fn busy_resume_does_not_advance_interval() {
    let executor = Arc::new(executor_with(usize::MAX, 2));
    let (gated, gate) = GatedOperation::new(ScriptedOperation::new(3));
    executor.submit(Box::new(gated)).unwrap();

    let driver = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || executor.resume())
    };
    assert!(gate.wait_entered(Duration::from_secs(5)));
    assert!(!executor.resume());
    assert!(!executor.resume());
    gate.release();
    assert!(driver.join().unwrap());

    // Cycle is still 1 from the first call
    assert!(!executor.resume());
    assert!(executor.resume());
}

#[test]
fn panicked_step_does_not_wedge_the_queue() {
    let executor = CallbackExecutor::new();
    let mut calls = 0;
    let panicky = FnOperation::new("panicky", move |_hint| {
        calls += 1;
        if calls == 2 {
            panic!("boom");
        }
        Ok(Step::Yield)
    });
    let handle = executor.submit(Box::new(panicky)).unwrap();
    let next = executor.submit(ScriptedOperation::new(1).boxed()).unwrap();
    assert!(executor.resume());

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| executor.resume()));
    assert!(unwound.is_err());
    assert_eq!(handle.state(), EntryState::Running);

    // Operation went down with the panic: the entry is dropped, not retried
    assert!(!executor.resume());
    assert_eq!(handle.state(), EntryState::Cancelled);
    assert!(handle.future().is_cancelled());

    assert!(executor.resume());
    assert_eq!(next.state(), EntryState::Completed);
    assert!(executor.is_empty());
}

#[test]
fn cycle_wraps_at_max_interval() {
    let executor = executor_with(usize::MAX, u32::MAX);
    let op = ScriptedOperation::new(10);
    let tracker = op.tracker();
    executor.submit(op.boxed()).unwrap();
    executor.shared.lock().cycle = u32::MAX - 1;

    assert!(!executor.resume());
    assert_eq!(executor.shared.lock().cycle, u32::MAX);
    assert!(executor.resume());
    assert_eq!(executor.shared.lock().cycle, 1);
    assert_eq!(tracker.resumes(), 1);
}

#[test]
fn shutdown_now_cancels_pending_work() {
    let executor = CallbackExecutor::new();
    let first = ScriptedOperation::new(3);
    let first_tracker = first.tracker();
    let running = executor.submit(first.boxed()).unwrap();
    executor.resume();
    let low = executor.submit_with_priority(ScriptedOperation::new(1).boxed(), -1).unwrap();
    let high = executor.submit_with_priority(ScriptedOperation::new(1).boxed(), 5).unwrap();

    let cancelled = executor.shutdown_now();

    let ids: Vec<_> = cancelled.iter().map(|h| h.id()).collect();
    assert_eq!(ids, vec![running.id(), high.id(), low.id()]);
    for handle in [&running, &low, &high] {
        assert_eq!(handle.state(), EntryState::Cancelled);
        assert!(matches!(handle.future().wait(), Err(FutureError::Cancelled { .. })));
    }
    assert_eq!(first_tracker.cancels(), 1);
    assert!(executor.is_shutdown());
    assert!(executor.is_empty());
    assert!(matches!(
        executor.submit(ScriptedOperation::new(1).boxed()),
        Err(ExecutorError::ShutDown)
    ));
}

#[test]
fn await_termination_drains_regardless_of_interval() {
    let executor = executor_with(usize::MAX, 1_000);
    let handles: Vec<_> = (1..=3)
        .map(|steps| executor.submit(ScriptedOperation::new(steps).boxed()).unwrap())
        .collect();
    executor.shutdown();

    assert!(executor.await_termination(Duration::from_secs(5)));

    assert!(executor.is_empty());
    for handle in &handles {
        assert_eq!(handle.state(), EntryState::Completed);
    }
}

#[test]
fn await_termination_gives_up_at_deadline() {
    let executor = CallbackExecutor::new();
    let op = ScriptedOperation::new(usize::MAX);
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();

    assert!(!executor.await_termination(Duration::from_millis(20)));

    assert_eq!(handle.state(), EntryState::Running);
    assert!(tracker.resumes() > 0);
    assert_eq!(executor.len(), 1);
}

#[test]
fn await_termination_on_empty_queue_returns_immediately() {
    let executor = CallbackExecutor::new();
    assert!(executor.await_termination(Duration::ZERO));
}

#[parameterized(
    single_step = { 1, 0 },
    multi_step = { 4, 1 },
)]
fn first_continue_fires_on_long_operations(steps: usize, expected: usize) {
    let executor = CallbackExecutor::new();
    let handle = executor.submit(ScriptedOperation::new(steps).boxed()).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    handle.future().on_first_continue(move || {
        counter.fetch_add(1, AtomicOrdering::SeqCst);
    });

    drain(&executor);

    assert_eq!(fired.load(AtomicOrdering::SeqCst), expected);
    assert!(handle.future().is_success());
}

#[test]
fn cancel_all_returns_only_cancelled_entries() {
    let executor = CallbackExecutor::new();
    let trackers: Vec<Arc<Tracker>> = (0..3).map(|_| Arc::new(Tracker::default())).collect();
    let done = executor.submit(ScriptedOperation::new(1).boxed()).unwrap();
    executor.resume();

    let handles: Vec<_> = trackers
        .iter()
        .map(|tracker| {
            executor
                .submit(ScriptedOperation::new(4).with_tracker(Arc::clone(tracker)).boxed())
                .unwrap()
        })
        .collect();
    executor.resume();

    let cancelled = executor.cancel_all();
    assert_eq!(cancelled.len(), 3);
    assert!(cancelled[0].ptr_eq(&handles[0]));
    assert!(handles.iter().all(|h| h.state() == EntryState::Cancelled));
    assert!(trackers.iter().all(|p| p.cancels() == 1));
    assert_eq!(done.state(), EntryState::Completed);
    assert!(executor.is_empty());
    assert!(executor.cancel_all().is_empty());
}

#[test]
fn queue_lists_current_first_then_by_priority() {
    let executor = CallbackExecutor::new();
    let current = executor
        .submit_with_priority(ScriptedOperation::new(5).boxed(), 0)
        .unwrap();
    executor.resume();
    let low = executor
        .submit_with_priority(ScriptedOperation::new(1).boxed(), 1)
        .unwrap();
    let high = executor
        .submit_with_priority(ScriptedOperation::new(1).boxed(), 7)
        .unwrap();

    let queue = executor.queue();
    assert_eq!(queue.len(), 3);
    assert!(queue[0].ptr_eq(&current));
    assert!(queue[1].ptr_eq(&high));
    assert!(queue[2].ptr_eq(&low));
    assert_eq!(queue[0].state(), EntryState::Running);
}

#[test]
fn queue_handles_can_cancel() {
    let executor = CallbackExecutor::new();
    executor.submit(ScriptedOperation::new(1).boxed()).unwrap();

    let queue = executor.queue();
    assert!(queue[0].cancel());
    assert!(executor.is_empty());
}

#[test]
fn shutdown_rejects_new_work_but_keeps_pending() {
    let executor = CallbackExecutor::new();
    let pending = executor.submit(ScriptedOperation::new(1).boxed()).unwrap();
    executor.shutdown();

    assert!(executor.is_shutdown());
    assert_eq!(
        executor.submit(ScriptedOperation::new(1).boxed()).unwrap_err(),
        ExecutorError::ShutDown
    );
    executor.resume();
    assert_eq!(pending.state(), EntryState::Completed);
}

#[test]
fn complete_now_runs_waiting_entry_inline() {
    let executor = CallbackExecutor::new();
    executor.set_hint(ExecutionHint::new(1, false));
    let op = ScriptedOperation::new(4);
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();

    assert!(executor.complete_now(&handle));
    assert_eq!(handle.state(), EntryState::Completed);
    assert_eq!(tracker.resumes(), 4);
    assert_eq!(tracker.last_hint(), Some(ExecutionHint::UNBOUNDED));
    assert!(executor.is_empty());
    assert!(!executor.complete_now(&handle));
}

#[test]
fn complete_now_refuses_current_entry() {
    let executor = CallbackExecutor::new();
    let handle = executor.submit(ScriptedOperation::new(3).boxed()).unwrap();
    executor.resume();

    assert!(!executor.complete_now(&handle));
    assert_eq!(handle.state(), EntryState::Running);
}

#[test]
fn handles_expose_ownership() {
    let executor = CallbackExecutor::new();
    let op = OwnedOperation::new("alice", "//set stone", ScriptedOperation::new(1).boxed());
    let handle = executor.submit(Box::new(op)).unwrap();

    let ownership = handle.ownership().unwrap();
    assert_eq!(ownership.owner(), "alice");
    assert_eq!(ownership.label(), "//set stone");
}

#[test]
fn handle_survives_executor_drop() {
    let executor = CallbackExecutor::new();
    let op = ScriptedOperation::new(2);
    let tracker = op.tracker();
    let handle = executor.submit(op.boxed()).unwrap();
    drop(executor);

    assert!(handle.cancel());
    assert_eq!(tracker.cancels(), 1);
}

proptest! {
    #[test]
    fn selection_follows_priority_then_submission(priorities in prop::collection::vec(-5i32..5, 1..20)) {
        let executor = CallbackExecutor::new();
        let handles: Vec<_> = priorities
            .iter()
            .map(|&p| executor.submit_with_priority(ScriptedOperation::new(1).boxed(), p).unwrap())
            .collect();

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        expected.sort_by(|&a, &b| priorities[b].cmp(&priorities[a]).then(a.cmp(&b)));

        for index in expected {
            prop_assert!(executor.resume());
            prop_assert_eq!(handles[index].state(), EntryState::Completed);
        }
        prop_assert!(executor.is_empty());
    }

    #[test]
    fn one_step_per_interval(interval in 1u32..8, calls in 0usize..64) {
        let executor = executor_with(usize::MAX, interval);
        let op = ScriptedOperation::new(10_000);
        let tracker = op.tracker();
        executor.submit(op.boxed()).unwrap();

        for _ in 0..calls {
            executor.resume();
        }
        let expected = calls.div_ceil(interval as usize);
        prop_assert_eq!(tracker.resumes(), expected);
    }
}

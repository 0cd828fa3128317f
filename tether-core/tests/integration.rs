//! Integration Tests for Reactive System
//!
//! These tests verify that signals, memos, effects and owners work together.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use tether_core::reactive::{
    Effect, Memo, Owner, ReactiveContext, Runtime, Signal, SourceId, SubscriberId,
};

/// Test that a memo tracks signal dependencies.
#[test]
fn memo_tracks_signal_dependency() {
    let signal = Signal::new(10);

    let signal_clone = signal.clone();
    let memo = Memo::new(move || signal_clone.get() * 2);

    assert_eq!(memo.get(), 20);

    // No explicit invalidation needed
    signal.set(5);
    assert_eq!(memo.get(), 10);
}

/// Test that an effect tracks signal dependencies.
#[test]
fn effect_tracks_signal_dependency() {
    let signal = Signal::new(0);
    let observed_value = Arc::new(AtomicI32::new(-1));
    let observed_clone = observed_value.clone();

    let signal_clone = signal.clone();
    let _effect = Effect::new(move || {
        observed_clone.store(signal_clone.get(), Ordering::SeqCst);
    });

    // Effect runs on creation, captures initial value
    assert_eq!(observed_value.load(Ordering::SeqCst), 0);

    signal.set(42);
    assert_eq!(observed_value.load(Ordering::SeqCst), 42);
}

/// Test that memos cache values correctly.
#[test]
fn memo_caches_expensive_computation() {
    let compute_count = Arc::new(AtomicI32::new(0));
    let compute_clone = compute_count.clone();

    let memo = Memo::new(move || {
        compute_clone.fetch_add(1, Ordering::SeqCst);
        42
    });

    assert_eq!(memo.get(), 42);
    assert_eq!(memo.get(), 42);
    assert_eq!(memo.get(), 42);
    assert_eq!(compute_count.load(Ordering::SeqCst), 1);
}

/// Test that memos can depend on other memos.
#[test]
fn memo_depends_on_memo() {
    let base_signal = Signal::new(5);

    let signal_clone = base_signal.clone();
    let doubled = Memo::new(move || signal_clone.get() * 2);

    let doubled_clone = doubled.clone();
    let plus_ten = Memo::new(move || doubled_clone.get() + 10);

    assert_eq!(doubled.get(), 10);
    assert_eq!(plus_ten.get(), 20);

    base_signal.set(10);

    // `doubled` is observed by `plus_ten`, so the change propagates
    assert_eq!(plus_ten.get(), 30);
    assert_eq!(doubled.get(), 20);
}

/// Test that an effect at the end of a memo chain sees every change.
#[test]
fn effect_at_the_end_of_a_memo_chain() {
    let base = Signal::new(1);
    let seen = Arc::new(AtomicI32::new(0));

    let b = base.clone();
    let doubled = Memo::new(move || b.get() * 2);
    let d = doubled.clone();
    let plus_one = Memo::new(move || d.get() + 1);

    let (p, sink) = (plus_one.clone(), seen.clone());
    let effect = Effect::new(move || sink.store(p.get(), Ordering::SeqCst));
    assert_eq!(seen.load(Ordering::SeqCst), 3);

    base.set(4);
    assert_eq!(seen.load(Ordering::SeqCst), 9);
    assert_eq!(effect.run_count(), 2);
}

/// Test that batching coalesces several writes into one effect run.
#[test]
fn batched_writes_run_effects_once() {
    let a = Signal::new(1);
    let b = Signal::new(2);
    let sum = Arc::new(AtomicI32::new(0));

    let (ra, rb, sink) = (a.clone(), b.clone(), sum.clone());
    let effect = Effect::new(move || sink.store(ra.get() + rb.get(), Ordering::SeqCst));

    Runtime::batch(|| {
        a.set(10);
        b.set(20);
    });

    assert_eq!(sum.load(Ordering::SeqCst), 30);
    assert_eq!(effect.run_count(), 2);
}

/// Test effect disposal stops execution.
#[test]
fn disposed_effect_does_not_run() {
    let signal = Signal::new(0);
    let run_count = Arc::new(AtomicI32::new(0));
    let run_clone = run_count.clone();

    let reader = signal.clone();
    let effect = Effect::new(move || {
        reader.get();
        run_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(run_count.load(Ordering::SeqCst), 1);

    effect.dispose();

    signal.set(1);
    signal.set(2);
    effect.execute();

    assert_eq!(run_count.load(Ordering::SeqCst), 1);
}

/// Test that disposing an owner stops everything created inside it.
#[test]
fn owner_disposal_tears_down_effects_and_cleanups() {
    let owner = Owner::new();
    let signal = Signal::new(0);
    let runs = Arc::new(AtomicI32::new(0));
    let cleaned = Arc::new(AtomicI32::new(0));

    let (reader, counter, flag) = (signal.clone(), runs.clone(), cleaned.clone());
    owner
        .run(|| {
            Effect::new(move || {
                reader.get();
                counter.fetch_add(1, Ordering::SeqCst);
            });
            tether_core::reactive::on_cleanup(move || {
                flag.fetch_add(1, Ordering::SeqCst);
            })
        })
        .unwrap();

    owner.dispose();
    signal.set(1);

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
}

/// Test that ReactiveContext correctly tracks nested computations.
#[test]
fn nested_reactive_contexts() {
    let outer_id = SubscriberId::new();
    let inner_id = SubscriberId::new();
    let (s1, s2, s3, s4) = (SourceId::new(), SourceId::new(), SourceId::new(), SourceId::new());

    let _outer_ctx = ReactiveContext::enter(outer_id);
    ReactiveContext::track_dependency(s1);
    ReactiveContext::track_dependency(s2);

    {
        let _inner_ctx = ReactiveContext::enter(inner_id);
        ReactiveContext::track_dependency(s3);
        ReactiveContext::track_dependency(s4);

        // Inner context should see its own dependencies
        let inner_deps = ReactiveContext::get_dependencies();
        assert_eq!(inner_deps, vec![s3, s4]);
    }

    // Back to outer context, should see outer dependencies only
    let outer_deps = ReactiveContext::get_dependencies();
    assert_eq!(outer_deps, vec![s1, s2]);
}

/// Test the complete reactive chain: signal -> memo with auto-tracking.
#[test]
fn full_reactive_chain_with_runtime() {
    let signal = Signal::new(100);

    let signal_clone = signal.clone();
    let memo = Memo::new(move || signal_clone.get() * 3);

    assert_eq!(memo.get(), 300);
    assert_eq!(signal.subscriber_count(), 1);
    assert_eq!(Runtime::subscriber_count(signal.id()), 1);

    signal.set(50);
    assert_eq!(memo.get(), 150);

    // Dropping the memo removes its edge
    drop(memo);
    assert_eq!(signal.subscriber_count(), 0);
}

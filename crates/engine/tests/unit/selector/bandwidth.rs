//! Bandwidth-aware selector tests.
//!
//! Verifies the admission gate (bandwidth ceiling, accuracy floor), the
//! untouched-metadata path when throttled, and follower attribution by
//! policy.

use prefetch_core::config::{SelectorConfig, StreamConfig, TransformerConfig};
use prefetch_core::engine::enhanced::EnhancedStream;
use prefetch_core::engine::transformer::TransformerStream;
use prefetch_core::engine::{FillEvent, Prefetcher};
use prefetch_core::selector::{BandwidthAwareSelector, SetCategory};

use prefetch_core::common::Address;

use crate::common::mocks::RecordingHost;
use crate::common::{init_logging, miss};

fn selector() -> BandwidthAwareSelector {
    init_logging();
    BandwidthAwareSelector::new(
        &SelectorConfig::default(),
        Box::new(TransformerStream::new(&TransformerConfig::default())),
        Box::new(EnhancedStream::new(&StreamConfig::default())),
    )
}

fn set_with(selector: &BandwidthAwareSelector, category: SetCategory) -> usize {
    (0..2048)
        .find(|&s| selector.dueler().category(s) == category)
        .unwrap()
}

fn prefetch_fill(set: usize, metadata: u32) -> FillEvent {
    FillEvent {
        addr: Address::new((set as u64) << 6),
        set,
        way: 0,
        prefetch: true,
        evicted_addr: Address::new(0),
        metadata,
    }
}

// ══════════════════════════════════════════════════════════
// 1. Bandwidth ceiling
// ══════════════════════════════════════════════════════════

/// Saturated bandwidth suppresses dispatch entirely; metadata is untouched.
#[test]
fn high_bandwidth_throttles() {
    let mut sel = selector();
    let mut host = RecordingHost::new();
    host.bandwidth = 0.95;

    for block in [100, 101, 102, 103, 104, 105] {
        let mut access = miss(block);
        access.metadata = 7;
        let out = sel.on_access(&mut host, &access);
        assert_eq!(out, 7, "throttled accesses pass metadata through");
    }

    assert_eq!(host.attempts, 0, "no engine may issue under the gate");
    assert_eq!(sel.stats().gate_throttled, 6);
    assert_eq!(sel.stats().high_bw_events, 6);
    assert_eq!(sel.stats().gate_allowed, 0);
}

/// Light bandwidth admits everything.
#[test]
fn low_bandwidth_admits() {
    let mut sel = selector();
    let mut host = RecordingHost::new();
    host.bandwidth = 0.2;

    for block in 100..140 {
        sel.on_access(&mut host, &miss(block));
    }

    assert_eq!(sel.stats().gate_throttled, 0);
    assert!(!host.issued.is_empty(), "streams confirm and prefetch");
}

// ══════════════════════════════════════════════════════════
// 2. Accuracy floor
// ══════════════════════════════════════════════════════════

/// Measured junk prefetching trips the accuracy floor even at moderate
/// bandwidth.
#[test]
fn poor_accuracy_throttles() {
    let mut sel = selector();
    let mut host = RecordingHost::new();
    host.bandwidth = 0.5;

    // Plenty of issued prefetches, none of them useful.
    let first_set = set_with(&sel, SetCategory::FirstDedicated);
    let second_set = set_with(&sel, SetCategory::SecondDedicated);
    for _ in 0..150 {
        sel.on_fill(&mut host, &prefetch_fill(first_set, 0));
        sel.on_fill(&mut host, &prefetch_fill(second_set, 0));
    }

    let out = sel.on_access(&mut host, &miss(100));
    assert_eq!(out, 0, "metadata untouched while throttled");
    assert_eq!(sel.stats().gate_throttled, 1);
    assert!(sel.stats().low_accuracy_events >= 1);
}

/// A cold start is optimistic: no issued history means full accuracy.
#[test]
fn cold_start_is_not_throttled() {
    let mut sel = selector();
    let mut host = RecordingHost::new();
    host.bandwidth = 0.5;

    sel.on_access(&mut host, &miss(100));
    assert_eq!(sel.stats().gate_allowed, 1);
    assert_eq!(sel.stats().low_accuracy_events, 0);
}

// ══════════════════════════════════════════════════════════
// 3. Attribution
// ══════════════════════════════════════════════════════════

/// Sampler usefulness goes to the first core, which always operates there.
#[test]
fn sampler_usefulness_credits_first() {
    let mut sel = selector();
    let mut host = RecordingHost::new();
    let sampler_set = set_with(&sel, SetCategory::Sampler);

    let mut access = miss(sampler_set as u64);
    access.hit = true;
    access.useful_prefetch = true;
    sel.on_access(&mut host, &access);

    let totals = sel.dueler().totals();
    assert_eq!(totals.first_useful, 1);
    assert_eq!(totals.second_useful, 0);
}

/// Follower usefulness follows the policy sign.
#[test]
fn follower_usefulness_follows_policy() {
    let mut sel = selector();
    let mut host = RecordingHost::new();
    let follower_set = set_with(&sel, SetCategory::Follower);

    let mut access = miss(follower_set as u64);
    access.hit = true;
    access.useful_prefetch = true;
    sel.on_access(&mut host, &access);

    let totals = sel.dueler().totals();
    assert_eq!(totals.first_useful, 1, "ties credit the first core");
}

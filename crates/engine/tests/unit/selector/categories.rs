//! Set categorisation and policy counter tests.
//!
//! Verifies the sampling-rate table, the category hash distribution,
//! metadata tagging and the score-driven policy movement.

use prefetch_core::selector::{
    is_first_tagged, is_second_tagged, tag_first, tag_second, SetCategory, SetDueler,
    FIRST_SOURCE_BIT, SECOND_SOURCE_BIT,
};

// ══════════════════════════════════════════════════════════
// 1. Sampling rate
// ══════════════════════════════════════════════════════════

/// The rate follows the set count brackets.
#[test]
fn sample_rate_brackets() {
    assert_eq!(SetDueler::new(2048).sample_rate(), 8);
    assert_eq!(SetDueler::new(512).sample_rate(), 16);
    assert_eq!(SetDueler::new(128).sample_rate(), 8);
    assert_eq!(SetDueler::new(32).sample_rate(), 4);
    assert_eq!(SetDueler::new(4).sample_rate(), 32);
}

// ══════════════════════════════════════════════════════════
// 2. Category hash
// ══════════════════════════════════════════════════════════

/// Every category appears equally often across the sets.
#[test]
fn categories_are_evenly_spread() {
    let dueler = SetDueler::new(2048);
    let rate = dueler.sample_rate();

    let mut counts = vec![0usize; rate];
    for set in 0..2048 {
        counts[dueler.raw_category(set)] += 1;
    }
    assert!(counts.iter().all(|&c| c == 2048 / rate));
}

/// Raw categories map onto the four roles.
#[test]
fn category_roles() {
    let dueler = SetDueler::new(2048);
    assert_eq!(dueler.category(0), SetCategory::Sampler);
    assert_eq!(dueler.category(1), SetCategory::FirstDedicated);
    assert_eq!(dueler.category(2), SetCategory::SecondDedicated);
    assert_eq!(dueler.category(3), SetCategory::Follower);
}

/// Dedicated sets ignore the policy; followers obey it, ties to first.
#[test]
fn dispatch_rules() {
    let mut dueler = SetDueler::new(2048);
    assert!(dueler.use_first(0), "sampler runs the first core");
    assert!(dueler.use_first(1));
    assert!(!dueler.use_first(2));
    assert!(dueler.use_first(3), "tie goes to the first core");

    // Push the policy negative: followers flip, dedicated sets do not.
    for _ in 0..150 {
        dueler.credit_issued(1, true, false);
        dueler.credit_issued(2, false, true);
        dueler.credit_useful(2, false, true);
    }
    dueler.update_policy();
    assert!(dueler.policy() < 0);
    assert!(!dueler.use_first(3));
    assert!(dueler.use_first(1));
}

// ══════════════════════════════════════════════════════════
// 3. Metadata tagging
// ══════════════════════════════════════════════════════════

/// Tags set their source bit, clear the other, and preserve the low bits.
#[test]
fn tags_are_exclusive_and_preserving() {
    let payload = 0x1234_5678 & !(FIRST_SOURCE_BIT | SECOND_SOURCE_BIT);

    let first = tag_first(payload | SECOND_SOURCE_BIT);
    assert!(is_first_tagged(first));
    assert!(!is_second_tagged(first));
    assert_eq!(first & !(FIRST_SOURCE_BIT | SECOND_SOURCE_BIT), payload);

    let second = tag_second(payload | FIRST_SOURCE_BIT);
    assert!(is_second_tagged(second));
    assert!(!is_first_tagged(second));
    assert_eq!(second & !(FIRST_SOURCE_BIT | SECOND_SOURCE_BIT), payload);
}

// ══════════════════════════════════════════════════════════
// 4. Policy movement
// ══════════════════════════════════════════════════════════

/// The policy does not move until both cores have enough samples.
#[test]
fn policy_waits_for_samples() {
    let mut dueler = SetDueler::new(2048);
    for _ in 0..99 {
        dueler.credit_issued(1, true, false);
        dueler.credit_useful(1, true, false);
        dueler.credit_issued(2, false, true);
    }
    assert_eq!(dueler.update_policy(), None);
    assert_eq!(dueler.policy(), 0);
}

/// The winner must clear the score margin; ties leave the policy alone.
#[test]
fn policy_requires_a_margin() {
    let mut dueler = SetDueler::new(2048);
    for _ in 0..200 {
        dueler.credit_issued(1, true, false);
        dueler.credit_useful(1, true, false);
        dueler.credit_issued(2, false, true);
        dueler.credit_useful(2, false, true);
    }
    assert_eq!(dueler.update_policy(), None);
}

/// Repeated wins saturate the counter.
#[test]
fn policy_saturates() {
    let mut dueler = SetDueler::new(2048);
    for _ in 0..200 {
        dueler.credit_issued(1, true, false);
        dueler.credit_useful(1, true, false);
        dueler.credit_issued(2, false, true);
    }
    for _ in 0..1100 {
        dueler.update_policy();
    }
    assert_eq!(dueler.policy(), 1024);
}

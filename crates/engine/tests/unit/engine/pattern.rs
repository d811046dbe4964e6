//! Pattern history tests.
//!
//! Verifies fingerprint matching (geometry, recency, region radius), the
//! confidence ladder and ring-buffer overwrite.

use prefetch_core::common::BlockNumber;
use prefetch_core::engine::transformer::pattern::PatternHistory;
use prefetch_core::engine::transformer::StreamClass;
use prefetch_core::engine::Direction;

fn b(v: u64) -> BlockNumber {
    BlockNumber::new(v)
}

/// Default-shaped history: 16 slots, 4-block regions, 2000-tick reuse
/// window, confidence ceiling 8.
fn history() -> PatternHistory {
    PatternHistory::new(16, 4, 2000, 8)
}

// ══════════════════════════════════════════════════════════
// 1. Matching
// ══════════════════════════════════════════════════════════

/// A fingerprint matches identical geometry nearby within the window.
#[test]
fn matches_identical_geometry_nearby() {
    let mut h = history();
    h.record(Direction::Positive, 4, b(1000), 10, StreamClass::Medium, 100);

    assert!(h
        .find_matching(Direction::Positive, 4, b(1008), 200)
        .is_some());
    assert!(h
        .find_matching(Direction::Negative, 4, b(1008), 200)
        .is_none());
    assert!(h
        .find_matching(Direction::Positive, 2, b(1008), 200)
        .is_none());
}

/// Matching honors the region radius (four regions).
#[test]
fn region_radius_bounds_matching() {
    let mut h = history();
    h.record(Direction::Positive, 4, b(1000), 10, StreamClass::Medium, 100);

    assert!(h
        .find_matching(Direction::Positive, 4, b(1016), 200)
        .is_some());
    assert!(h
        .find_matching(Direction::Positive, 4, b(1020), 200)
        .is_none());
}

/// Fingerprints expire after the reuse window.
#[test]
fn reuse_window_bounds_matching() {
    let mut h = history();
    h.record(Direction::Positive, 4, b(1000), 10, StreamClass::Medium, 100);

    assert!(h
        .find_matching(Direction::Positive, 4, b(1000), 2100)
        .is_some());
    assert!(h
        .find_matching(Direction::Positive, 4, b(1000), 2101)
        .is_none());
}

// ══════════════════════════════════════════════════════════
// 2. Confidence ladder
// ══════════════════════════════════════════════════════════

/// A long, fresh pattern earns the cap (half the ceiling).
#[test]
fn long_fresh_pattern_caps_confidence() {
    let mut h = history();
    h.record(Direction::Positive, 2, b(500), 8, StreamClass::Dense, 1000);

    assert_eq!(h.confidence_for(Direction::Positive, 2, b(500), 1100), 4);
}

/// A short fresh pattern earns base plus the recency bonus.
#[test]
fn short_fresh_pattern() {
    let mut h = history();
    h.record(Direction::Positive, 2, b(500), 3, StreamClass::Sparse, 1000);

    assert_eq!(h.confidence_for(Direction::Positive, 2, b(500), 1100), 3);
}

/// Middle-aged patterns earn a smaller recency bonus; old ones none.
#[test]
fn confidence_decays_with_age() {
    let mut h = history();
    h.record(Direction::Positive, 2, b(500), 8, StreamClass::Dense, 1000);

    // Age 600: between a quarter and half of the window.
    assert_eq!(h.confidence_for(Direction::Positive, 2, b(500), 1600), 4);
    // Age 1500: beyond half the window.
    assert_eq!(h.confidence_for(Direction::Positive, 2, b(500), 2500), 3);
}

/// No match yields zero confidence.
#[test]
fn no_match_no_confidence() {
    let h = history();
    assert_eq!(h.confidence_for(Direction::Positive, 2, b(500), 100), 0);
}

// ══════════════════════════════════════════════════════════
// 3. Ring behavior
// ══════════════════════════════════════════════════════════

/// The oldest fingerprint is overwritten once the ring wraps.
#[test]
fn ring_overwrites_oldest() {
    let mut h = history();
    for i in 0..17u64 {
        h.record(
            Direction::Positive,
            1,
            b(100_000 * (i + 1)),
            4,
            StreamClass::Medium,
            i,
        );
    }

    assert_eq!(h.entries().iter().filter(|p| p.valid).count(), 16);
    assert!(
        h.find_matching(Direction::Positive, 1, b(100_000), 20).is_none(),
        "the first fingerprint must be gone"
    );
    assert!(h
        .find_matching(Direction::Positive, 1, b(200_000), 20)
        .is_some());
}

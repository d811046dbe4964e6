//! Block and region arithmetic tests.
//!
//! Verifies the address/block conversions, region alignment, signed gaps
//! and the direction-aware stream geometry helpers.

use prefetch_core::common::{Address, BlockNumber};
use prefetch_core::engine::Direction;

// ══════════════════════════════════════════════════════════
// 1. Address ↔ block conversion
// ══════════════════════════════════════════════════════════

/// A byte address maps to its 64-byte block.
#[test]
fn address_to_block() {
    assert_eq!(Address::new(0x1000).block(), BlockNumber::new(0x40));
    assert_eq!(Address::new(0x103F).block(), BlockNumber::new(0x40));
    assert_eq!(Address::new(0x1040).block(), BlockNumber::new(0x41));
}

/// A block maps back to its first byte address.
#[test]
fn block_to_address() {
    assert_eq!(BlockNumber::new(100).address(), Address::new(6400));
}

// ══════════════════════════════════════════════════════════
// 2. Regions and gaps
// ══════════════════════════════════════════════════════════

/// Region base clears the low bits to the region boundary.
#[test]
fn region_base_alignment() {
    assert_eq!(BlockNumber::new(103).region_base(4), BlockNumber::new(100));
    assert_eq!(BlockNumber::new(100).region_base(4), BlockNumber::new(100));
    assert_eq!(BlockNumber::new(209).region_base(4), BlockNumber::new(208));
}

/// Gaps are signed block distances.
#[test]
fn signed_gaps() {
    assert_eq!(BlockNumber::new(104).gap_from(BlockNumber::new(100)), 4);
    assert_eq!(BlockNumber::new(100).gap_from(BlockNumber::new(104)), -4);
    assert_eq!(BlockNumber::new(100).gap_from(BlockNumber::new(100)), 0);
}

/// Offsets move both ways.
#[test]
fn block_offsets() {
    assert_eq!(BlockNumber::new(100).offset(3), BlockNumber::new(103));
    assert_eq!(BlockNumber::new(100).offset(-3), BlockNumber::new(97));
}

// ══════════════════════════════════════════════════════════
// 3. Direction geometry
// ══════════════════════════════════════════════════════════

/// Advancing moves one stride in the direction of travel.
#[test]
fn direction_advance() {
    let b = BlockNumber::new(100);
    assert_eq!(Direction::Positive.advance(b, 4), BlockNumber::new(104));
    assert_eq!(Direction::Negative.advance(b, 4), BlockNumber::new(96));
}

/// `is_beyond` is strict and direction-oriented.
#[test]
fn direction_is_beyond() {
    let a = BlockNumber::new(104);
    let b = BlockNumber::new(100);
    assert!(Direction::Positive.is_beyond(a, b));
    assert!(!Direction::Positive.is_beyond(b, a));
    assert!(!Direction::Positive.is_beyond(a, a));
    assert!(Direction::Negative.is_beyond(b, a));
    assert!(!Direction::Negative.is_beyond(a, b));
}

/// End horizon extends in the direction of travel from the head.
#[test]
fn direction_end_for() {
    let head = BlockNumber::new(1000);
    assert_eq!(
        Direction::Positive.end_for(head, 4, 64),
        BlockNumber::new(1256)
    );
    assert_eq!(
        Direction::Negative.end_for(head, 4, 64),
        BlockNumber::new(744)
    );
}

/// Remaining distance shrinks toward the end and goes negative past it.
#[test]
fn direction_remaining() {
    let end = BlockNumber::new(110);
    assert_eq!(
        Direction::Positive.remaining(BlockNumber::new(100), end),
        10
    );
    assert_eq!(
        Direction::Positive.remaining(BlockNumber::new(112), end),
        -2
    );
    assert_eq!(
        Direction::Negative.remaining(BlockNumber::new(120), end),
        10
    );
}

/// Gap classification: positive, negative, zero.
#[test]
fn direction_of_gap() {
    assert_eq!(Direction::of_gap(3), Some(Direction::Positive));
    assert_eq!(Direction::of_gap(-3), Some(Direction::Negative));
    assert_eq!(Direction::of_gap(0), None);
}

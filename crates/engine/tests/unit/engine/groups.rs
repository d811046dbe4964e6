//! Stream group table tests.
//!
//! Verifies signature lookup, membership accounting, protection, overflow
//! eviction and the displaced-member report.

use prefetch_core::engine::transformer::group::GroupTable;
use prefetch_core::engine::transformer::StreamClass;
use prefetch_core::engine::Direction;

fn table() -> GroupTable {
    GroupTable::new(8, 8)
}

// ══════════════════════════════════════════════════════════
// 1. Signatures and membership
// ══════════════════════════════════════════════════════════

/// A signature creates one group and finds it again.
#[test]
fn find_or_create_is_idempotent() {
    let mut t = table();
    let a = t.find_or_create(Direction::Positive, 2, StreamClass::Dense, 1);
    let b = t.find_or_create(Direction::Positive, 2, StreamClass::Dense, 2);
    assert_eq!(a.index, b.index);
    assert!(a.displaced.is_empty());

    let c = t.find_or_create(Direction::Negative, 2, StreamClass::Dense, 3);
    assert_ne!(a.index, c.index, "direction is part of the signature");
}

/// Membership is counted and removal invalidates an empty group.
#[test]
fn membership_accounting() {
    let mut t = table();
    let g = t.find_or_create(Direction::Positive, 2, StreamClass::Dense, 1).index;

    assert!(t.add_member(g, 3));
    assert!(t.add_member(g, 7));
    assert_eq!(t.member_count(g), 2);
    assert!(t.is_protected(g));

    t.remove_member(g, 3);
    assert_eq!(t.member_count(g), 1);
    assert!(!t.is_protected(g));

    t.remove_member(g, 7);
    assert!(!t.group(g).valid, "empty groups are released");
}

/// A full group rejects further members.
#[test]
fn member_overflow_is_rejected() {
    let mut t = table();
    let g = t.find_or_create(Direction::Positive, 1, StreamClass::Dense, 1).index;

    for stream in 0..8 {
        assert!(t.add_member(g, stream));
    }
    assert!(!t.add_member(g, 8));
    assert_eq!(t.member_count(g), 8);
}

// ══════════════════════════════════════════════════════════
// 2. Overflow eviction
// ══════════════════════════════════════════════════════════

/// With all groups live, the smallest (then oldest) group is recycled and
/// its members are reported for back-reference cleanup.
#[test]
fn overflow_recycles_smallest_group() {
    let mut t = table();

    for stride in 1..=8u32 {
        let g = t
            .find_or_create(Direction::Positive, stride, StreamClass::Medium, u64::from(stride))
            .index;
        // Give every group two members except stride 5.
        t.add_member(g, stride as usize * 10);
        if stride != 5 {
            t.add_member(g, stride as usize * 10 + 1);
        }
    }

    let allocation = t.find_or_create(Direction::Negative, 3, StreamClass::Medium, 100);
    assert_eq!(allocation.displaced, vec![50]);

    assert!(t.find(Direction::Positive, 5).is_none(), "stride-5 group recycled");
    let group = t.group(allocation.index);
    assert_eq!(group.direction, Direction::Negative);
    assert_eq!(group.stride, 3);
    assert_eq!(group.member_count, 0);
}

/// Typical class follows the stride signature and member updates.
#[test]
fn typical_class_tracks_members() {
    let mut t = table();
    let g = t.find_or_create(Direction::Positive, 2, StreamClass::Dense, 1).index;
    assert_eq!(t.group(g).typical_class, StreamClass::Dense);

    t.set_typical_class(g, StreamClass::Medium);
    assert_eq!(t.group(g).typical_class, StreamClass::Medium);
}

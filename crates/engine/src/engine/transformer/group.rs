//! Stream groups.
//!
//! Concurrent similar streams (multi-head attention reads the same tensor
//! layout from several heads at once) share a (direction, stride) signature.
//! Grouping them protects the whole family from victim selection and from
//! the dead-stream sweep while siblings are alive.
//!
//! Cross-references are pointer-free: the group owns member indices into the
//! stream table; each stream carries only its `group_id` back-reference.

use crate::engine::Direction;

use super::StreamClass;

/// One equivalence class of streams keyed by (direction, stride).
#[derive(Clone, Debug)]
pub struct StreamGroup {
    /// A group is live while it has members.
    pub valid: bool,
    /// Shared travel direction.
    pub direction: Direction,
    /// Shared stride in blocks.
    pub stride: u32,
    /// Number of occupied member slots.
    pub member_count: u32,
    /// Reinforced whenever a member stream is re-triggered.
    pub group_confidence: u64,
    /// Logical time the signature was last seen.
    pub last_seen: u64,
    /// Representative classification of the members.
    pub typical_class: StreamClass,
    /// Member indices into the stream table.
    pub members: Vec<Option<usize>>,
}

impl StreamGroup {
    fn empty(members_per_group: usize) -> Self {
        Self {
            valid: false,
            direction: Direction::Positive,
            stride: 1,
            member_count: 0,
            group_confidence: 0,
            last_seen: 0,
            typical_class: StreamClass::Unknown,
            members: vec![None; members_per_group],
        }
    }
}

/// Result of a find-or-create: the group index plus any member streams
/// displaced by evicting an older group (their back-references must be
/// cleared by the caller).
pub struct GroupAllocation {
    /// Index of the (possibly recycled) group.
    pub index: usize,
    /// Stream indices orphaned by the eviction.
    pub displaced: Vec<usize>,
}

/// Fixed-capacity table of stream groups.
pub struct GroupTable {
    groups: Vec<StreamGroup>,
}

impl GroupTable {
    /// Creates an empty table.
    pub fn new(max_groups: usize, members_per_group: usize) -> Self {
        Self {
            groups: vec![StreamGroup::empty(members_per_group); max_groups],
        }
    }

    /// Returns all groups, for state inspection.
    pub fn groups(&self) -> &[StreamGroup] {
        &self.groups
    }

    /// Returns one group.
    pub fn group(&self, idx: usize) -> &StreamGroup {
        &self.groups[idx]
    }

    /// Finds the group with this signature.
    pub fn find(&self, direction: Direction, stride: u32) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.valid && g.direction == direction && g.stride == stride)
    }

    /// Finds or allocates the group for a signature.
    ///
    /// On overflow the group with the fewest members (oldest last-seen on
    /// ties) is recycled; its surviving members are reported back so the
    /// caller can clear their back-references.
    pub fn find_or_create(
        &mut self,
        direction: Direction,
        stride: u32,
        typical_class: StreamClass,
        now: u64,
    ) -> GroupAllocation {
        if let Some(idx) = self.find(direction, stride) {
            self.groups[idx].last_seen = now;
            return GroupAllocation {
                index: idx,
                displaced: Vec::new(),
            };
        }

        let idx = self
            .groups
            .iter()
            .position(|g| !g.valid)
            .unwrap_or_else(|| {
                self.groups
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, g)| (g.member_count, g.last_seen))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            });

        let displaced: Vec<usize> = self.groups[idx].members.iter().flatten().copied().collect();

        let members_per_group = self.groups[idx].members.len();
        self.groups[idx] = StreamGroup {
            valid: true,
            direction,
            stride,
            member_count: 0,
            group_confidence: 0,
            last_seen: now,
            typical_class,
            members: vec![None; members_per_group],
        };

        GroupAllocation {
            index: idx,
            displaced,
        }
    }

    /// Inserts a stream into a group's first free slot.
    ///
    /// Returns false when the group is already full; the stream may still
    /// keep the group as its back-reference.
    pub fn add_member(&mut self, group_idx: usize, stream_idx: usize) -> bool {
        let group = &mut self.groups[group_idx];
        for slot in group.members.iter_mut() {
            if slot.is_none() {
                *slot = Some(stream_idx);
                group.member_count += 1;
                return true;
            }
        }
        false
    }

    /// Removes a stream from its group, invalidating an emptied group.
    pub fn remove_member(&mut self, group_idx: usize, stream_idx: usize) {
        let group = &mut self.groups[group_idx];
        for slot in group.members.iter_mut() {
            if *slot == Some(stream_idx) {
                *slot = None;
                group.member_count = group.member_count.saturating_sub(1);
                break;
            }
        }
        if group.member_count == 0 {
            group.valid = false;
        }
    }

    /// Member count of a group, zero when invalid.
    pub fn member_count(&self, group_idx: usize) -> u32 {
        let group = &self.groups[group_idx];
        if group.valid { group.member_count } else { 0 }
    }

    /// Whether membership protects a stream (two or more live siblings).
    pub fn is_protected(&self, group_idx: usize) -> bool {
        self.member_count(group_idx) >= 2
    }

    /// Updates a group's representative class from a member.
    pub fn set_typical_class(&mut self, group_idx: usize, class: StreamClass) {
        self.groups[group_idx].typical_class = class;
    }

    /// Bumps a group's confidence on member reinforcement.
    pub fn bump_confidence(&mut self, group_idx: usize) {
        self.groups[group_idx].group_confidence += 1;
    }
}

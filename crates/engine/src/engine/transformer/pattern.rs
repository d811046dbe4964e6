//! Pattern history and repetition-aware reinforcement.
//!
//! Layered workloads replay the same access patterns: a stream that just
//! terminated is likely to reappear nearby soon. The history is a small ring
//! buffer of terminated-stream fingerprints; a match within the reuse window
//! yields a confidence value that fast-tracks training, seeds new streams
//! and shields grouped streams from the dead-stream sweep.

use crate::common::BlockNumber;
use crate::config::defaults;
use crate::engine::Direction;

use super::StreamClass;

/// Fingerprint of one terminated stream.
#[derive(Clone, Copy, Debug)]
pub struct PatternEntry {
    /// Whether this slot holds a fingerprint.
    pub valid: bool,
    /// Direction of the terminated stream.
    pub direction: Direction,
    /// Stride of the terminated stream, in blocks.
    pub stride: u32,
    /// Region-aligned base of the stream's start block.
    pub region_base: BlockNumber,
    /// Logical time of termination.
    pub termination_ts: u64,
    /// Prefetches the stream issued while alive.
    pub stream_length: u32,
    /// Classification at termination.
    pub class: StreamClass,
}

impl Default for PatternEntry {
    fn default() -> Self {
        Self {
            valid: false,
            direction: Direction::Positive,
            stride: 1,
            region_base: BlockNumber::default(),
            termination_ts: 0,
            stream_length: 0,
            class: StreamClass::Unknown,
        }
    }
}

/// Ring buffer of terminated-stream fingerprints.
pub struct PatternHistory {
    entries: Vec<PatternEntry>,
    head: usize,
    region_blocks: u64,
    reuse_window: u64,
    max_confidence: u32,
}

impl PatternHistory {
    /// Creates an empty history.
    pub fn new(size: usize, region_blocks: u64, reuse_window: u64, max_confidence: u32) -> Self {
        Self {
            entries: vec![PatternEntry::default(); size],
            head: 0,
            region_blocks,
            reuse_window,
            max_confidence,
        }
    }

    /// Returns all fingerprints, for state inspection.
    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    /// Records a terminated stream, overwriting the oldest slot.
    pub fn record(
        &mut self,
        direction: Direction,
        stride: u32,
        start_block: BlockNumber,
        stream_length: u32,
        class: StreamClass,
        now: u64,
    ) {
        self.entries[self.head] = PatternEntry {
            valid: true,
            direction,
            stride,
            region_base: start_block.region_base(self.region_blocks),
            termination_ts: now,
            stream_length,
            class,
        };
        self.head = (self.head + 1) % self.entries.len();
    }

    /// Finds a recent fingerprint with this geometry near `block`.
    ///
    /// Matches require identical direction and stride, termination within
    /// the reuse window, and a region within the pattern radius.
    pub fn find_matching(
        &self,
        direction: Direction,
        stride: u32,
        block: BlockNumber,
        now: u64,
    ) -> Option<&PatternEntry> {
        let region = block.region_base(self.region_blocks);
        let radius = self.region_blocks * defaults::PATTERN_REGION_RADIUS;

        self.entries.iter().find(|p| {
            p.valid
                && now - p.termination_ts <= self.reuse_window
                && p.direction == direction
                && p.stride == stride
                && region.gap_from(p.region_base).unsigned_abs() <= radius
        })
    }

    /// Confidence contributed by a matching fingerprint, zero without one.
    ///
    /// Longer streams and fresher terminations earn more, capped at half the
    /// confidence ceiling so history alone never saturates a stream.
    pub fn confidence_for(
        &self,
        direction: Direction,
        stride: u32,
        block: BlockNumber,
        now: u64,
    ) -> u32 {
        let Some(pattern) = self.find_matching(direction, stride, block, now) else {
            return 0;
        };

        let mut confidence = 1;
        if pattern.stream_length >= defaults::DENSE_LENGTH_MIN {
            confidence += 2;
        }

        let age = now - pattern.termination_ts;
        if age < self.reuse_window / 4 {
            confidence += 2;
        } else if age < self.reuse_window / 2 {
            confidence += 1;
        }

        confidence.min(self.max_confidence / 2)
    }
}

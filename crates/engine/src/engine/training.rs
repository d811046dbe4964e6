//! Region-indexed training table.
//!
//! Detects potential streams from miss sequences before they are confirmed.
//! The table accumulates up to three recent misses per spatial region and
//! infers direction and stride from the gaps between them, with a noise
//! filter that tolerates a single ±1-block intruder without restarting
//! training.
//!
//! Lookup is proximity-based: a miss matches the entry whose region base is
//! closest within the match radius, and each accepted miss re-keys the entry
//! to its own region. This lets a stream whose stride exceeds the region
//! size keep training the same entry as it walks across region boundaries.
//!
//! Confirmation is two-staged: the third consistent miss marks the entry
//! *confirmed-ready*; the stream itself launches on the next miss that
//! re-validates the pattern, with that miss as the stream head.

use crate::common::BlockNumber;
use crate::config::defaults;
use crate::engine::Direction;

/// One region under observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrainingEntry {
    /// Whether this entry holds live training state.
    pub valid: bool,
    /// Region-aligned base block of the most recent accepted miss.
    pub region_base: BlockNumber,
    /// Recent miss blocks, index 0 newest.
    pub history: [BlockNumber; 3],
    /// Progress toward confirmation; the confirmation threshold means
    /// confirmed-ready.
    pub miss_count: u32,
    /// Inferred direction, `None` until two consistent gaps agree.
    pub direction: Option<Direction>,
    /// Inferred stride in blocks (≥ 1 once direction is known).
    pub stride: u32,
    /// Logical time of the last accepted miss, for LRU replacement.
    pub last_access: u64,
    /// Confidence inherited from pattern history (repetition-aware variant;
    /// zero elsewhere).
    pub pattern_confidence: u32,
}

impl TrainingEntry {
    /// Returns the single observed gap while exactly two misses are
    /// recorded.
    pub fn single_gap(&self) -> Option<i64> {
        if self.miss_count == 2 {
            Some(self.history[0].gap_from(self.history[1]))
        } else {
            None
        }
    }
}

/// Result of feeding one miss into the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainOutcome {
    /// History grew or the entry became confirmed-ready; keep training.
    Recorded,
    /// Spurious ±1-block miss absorbed; history unchanged.
    Noise,
    /// Inconsistent gap pair; entry reset to a single-miss state.
    Reset,
    /// A confirmed-ready pattern was re-validated: launch a stream headed at
    /// `head`. The entry has been consumed.
    Launch {
        /// Confirmed stream direction.
        direction: Direction,
        /// Confirmed stride in blocks.
        stride: u32,
        /// Miss block to start the stream at.
        head: BlockNumber,
        /// Pattern confidence carried into the new stream.
        confidence: u32,
        /// Whether readiness came through the fast-track path.
        fast_track: bool,
    },
}

/// How a noisy miss is absorbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseVerdict {
    /// The incoming miss is the intruder; it is not recorded.
    DropIncoming,
    /// The newest recorded miss was the intruder; the incoming miss takes
    /// its place.
    ReplaceNewest,
}

/// Checks whether a gap pair is training noise and how to absorb it.
///
/// A ±1-block gap next to a larger gap marks a single spurious access
/// adjacent to an otherwise regular stream, as does a pair of opposed
/// one-block gaps (a revisit of the previous block). When the incoming miss
/// is the intruder it is dropped; when the intruder is the newest recorded
/// miss — only detectable before any pattern is established — the incoming
/// miss replaces it. Equal-magnitude gaps of one block are a legitimate
/// stride-1 stream, never noise.
pub fn noise_verdict(gap1: i64, gap2: i64, miss_count: u32) -> Option<NoiseVerdict> {
    let opposed = gap1.signum() * gap2.signum() == -1;

    if gap2.abs() == 1 && (gap1.abs() > 1 || (gap1.abs() == 1 && opposed)) {
        return Some(NoiseVerdict::DropIncoming);
    }

    if gap1.abs() == 1 && gap2.abs() > 1 && miss_count == 2 {
        return Some(NoiseVerdict::ReplaceNewest);
    }

    None
}

/// Infers (direction, stride) from two consecutive gaps.
///
/// Both gaps must share a sign and magnitude of at least one block;
/// anything else is inconsistent.
pub fn infer_pattern(gap1: i64, gap2: i64) -> Option<(Direction, u32)> {
    let direction = if gap1 > 0 && gap2 > 0 {
        Direction::Positive
    } else if gap1 < 0 && gap2 < 0 {
        Direction::Negative
    } else {
        return None;
    };

    if gap1.abs() != gap2.abs() || gap1.abs() < 1 {
        return None;
    }

    Some((direction, gap1.unsigned_abs() as u32))
}

/// Fully-associative training table with LRU replacement.
pub struct TrainingTable {
    entries: Vec<TrainingEntry>,
    region_blocks: u64,
    confirmation_threshold: u32,
    match_radius_blocks: u64,
}

impl TrainingTable {
    /// Creates an empty table.
    ///
    /// `region_blocks` must be a power of two.
    pub fn new(size: usize, region_blocks: u64, confirmation_threshold: u32) -> Self {
        Self {
            entries: vec![TrainingEntry::default(); size],
            region_blocks,
            confirmation_threshold,
            match_radius_blocks: region_blocks * defaults::TRAINING_REGION_RADIUS,
        }
    }

    /// Returns all entries, for state inspection.
    pub fn entries(&self) -> &[TrainingEntry] {
        &self.entries
    }

    /// Returns one entry.
    pub fn entry(&self, idx: usize) -> &TrainingEntry {
        &self.entries[idx]
    }

    /// Returns one entry mutably.
    pub fn entry_mut(&mut self, idx: usize) -> &mut TrainingEntry {
        &mut self.entries[idx]
    }

    /// Releases an entry.
    pub fn invalidate(&mut self, idx: usize) {
        self.entries[idx].valid = false;
    }

    /// Finds the entry training the region around `block`.
    ///
    /// Linear scan over the whole table; the hardware analogue is a
    /// fully-associative CAM. The closest region base within the match
    /// radius wins, so a miss prefers its exact region over a neighbour.
    pub fn find(&self, block: BlockNumber) -> Option<usize> {
        let region = block.region_base(self.region_blocks);
        let mut best: Option<(u64, usize)> = None;

        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.valid {
                continue;
            }
            let distance = region.gap_from(entry.region_base).unsigned_abs();
            if distance > self.match_radius_blocks {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, i));
            }
        }

        best.map(|(_, i)| i)
    }

    /// Finds or allocates the entry for the region around `block`.
    ///
    /// Allocation prefers an invalid slot and falls back to evicting the
    /// entry with the oldest last-access time.
    pub fn find_or_allocate(&mut self, block: BlockNumber, now: u64) -> usize {
        if let Some(idx) = self.find(block) {
            return idx;
        }

        let region = block.region_base(self.region_blocks);
        let idx = self
            .entries
            .iter()
            .position(|e| !e.valid)
            .unwrap_or_else(|| {
                self.entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            });

        self.entries[idx] = TrainingEntry {
            valid: true,
            region_base: region,
            history: [BlockNumber::default(); 3],
            miss_count: 0,
            direction: None,
            stride: 1,
            last_access: now,
            pattern_confidence: 0,
        };
        idx
    }

    /// Feeds one miss into an entry.
    ///
    /// The first two misses only grow the history. From the third miss on,
    /// the gap pair is checked for noise (the intruding miss is kept out of
    /// the history), then direction and stride are inferred. A consistent pair
    /// marks the entry confirmed-ready; a further miss that re-validates an
    /// already-ready pattern consumes the entry and requests a stream
    /// launch. An inconsistent pair resets the entry to a single-miss state
    /// keeping the new miss.
    pub fn record_miss(
        &mut self,
        idx: usize,
        miss: BlockNumber,
        now: u64,
        fast_track_confidence: Option<u32>,
    ) -> TrainOutcome {
        let threshold = self.confirmation_threshold;
        let region = miss.region_base(self.region_blocks);

        let entry = &mut self.entries[idx];
        entry.last_access = now;

        match entry.miss_count {
            0 => {
                entry.history[0] = miss;
                entry.miss_count = 1;
                entry.region_base = region;
            }
            1 => {
                entry.history[1] = entry.history[0];
                entry.history[0] = miss;
                entry.miss_count = 2;
                entry.region_base = region;
            }
            _ => {
                let gap1 = entry.history[0].gap_from(entry.history[1]);
                let gap2 = miss.gap_from(entry.history[0]);

                match noise_verdict(gap1, gap2, entry.miss_count) {
                    Some(NoiseVerdict::DropIncoming) => return TrainOutcome::Noise,
                    Some(NoiseVerdict::ReplaceNewest) => {
                        entry.history[0] = miss;
                        entry.region_base = region;
                        self.drop_duplicate_region(idx);
                        return TrainOutcome::Noise;
                    }
                    None => {}
                }

                let ready = Self::ready_pattern(entry, threshold, fast_track_confidence);
                let ready_early = entry.miss_count < threshold;

                entry.history[2] = entry.history[1];
                entry.history[1] = entry.history[0];
                entry.history[0] = miss;
                entry.region_base = region;

                match infer_pattern(gap1, gap2) {
                    Some((direction, stride)) => {
                        entry.direction = Some(direction);
                        entry.stride = stride;
                        entry.miss_count = threshold;

                        if ready == Some((direction, stride)) {
                            let confidence = entry.pattern_confidence;
                            entry.valid = false;
                            self.drop_duplicate_region(idx);
                            return TrainOutcome::Launch {
                                direction,
                                stride,
                                head: miss,
                                confidence,
                                fast_track: ready_early,
                            };
                        }
                    }
                    None => {
                        entry.miss_count = 1;
                        entry.direction = None;
                        entry.stride = 1;
                        self.drop_duplicate_region(idx);
                        return TrainOutcome::Reset;
                    }
                }
            }
        }

        self.drop_duplicate_region(idx);
        TrainOutcome::Recorded
    }

    /// Returns the pattern this entry is ready to launch, if any.
    ///
    /// The normal path requires the confirmation threshold; the fast-track
    /// path accepts a two-miss entry whose single gap fixes direction and
    /// stride, when its pattern confidence clears the given bar.
    fn ready_pattern(
        entry: &TrainingEntry,
        threshold: u32,
        fast_track_confidence: Option<u32>,
    ) -> Option<(Direction, u32)> {
        if entry.miss_count >= threshold {
            return entry.direction.map(|d| (d, entry.stride));
        }

        let bar = fast_track_confidence?;
        if entry.miss_count == 2 && entry.pattern_confidence >= bar {
            let gap = entry.history[0].gap_from(entry.history[1]);
            return Direction::of_gap(gap).map(|d| (d, gap.unsigned_abs() as u32));
        }

        None
    }

    /// Keeps region bases unique after a re-key.
    ///
    /// Re-keying follows the newest miss, so a drifting entry can land on a
    /// region another entry already owns; the older claim is dropped.
    fn drop_duplicate_region(&mut self, keep: usize) {
        if !self.entries[keep].valid {
            return;
        }
        let region = self.entries[keep].region_base;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i != keep && entry.valid && entry.region_base == region {
                entry.valid = false;
            }
        }
    }
}

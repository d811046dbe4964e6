//! Transformer-aware stream prefetcher.
//!
//! Extends the enhanced stream prefetcher with five behaviors tuned for
//! workloads built from nested, repeating streams:
//! 1. **Stream grouping:** Concurrent streams sharing (direction, stride)
//!    protect each other under table pressure.
//! 2. **Classification:** Dense/medium/sparse streams earn different
//!    prefetch degrees.
//! 3. **Pattern-history reinforcement:** Recently terminated streams that
//!    reappear fast-track training and seed confidence.
//! 4. **Phase-aware throttling:** Heavy stream churn drops aggressiveness
//!    until behavior stabilizes.
//! 5. **Stride-boundary caution:** Volleys stop short of a stream's end so
//!    prefetches do not run across dimension boundaries.
//!
//! All inference is emergent from miss addresses; there are no program
//! counters or software hints.

/// Stream groups keyed by (direction, stride).
pub mod group;

/// Terminated-stream pattern history.
pub mod pattern;

/// Phase transition detection and throttling.
pub mod phase;

use log::debug;

use crate::common::BlockNumber;
use crate::config::{defaults, TransformerConfig};
use crate::engine::training::{TrainOutcome, TrainingEntry, TrainingTable};
use crate::engine::{CacheAccess, CacheHost, Direction, FillEvent, Prefetcher};
use crate::stats::StreamStats;

use self::group::{GroupTable, StreamGroup};
use self::pattern::PatternHistory;
use self::phase::{PhaseChange, PhaseMonitor};

/// Stream classification inferred from stride and observed length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamClass {
    /// Not yet classified.
    Unknown,
    /// Small stride, long run; innermost-dimension traversal.
    Dense,
    /// Moderate stride with regular gaps.
    Medium,
    /// Large stride or short run; long-reuse traversal.
    Sparse,
}

/// Classifies a stream from its stride and prefetched length.
pub fn classify(stride: u32, stream_length: u32) -> StreamClass {
    if stride <= defaults::DENSE_STRIDE_MAX {
        if stream_length >= defaults::DENSE_LENGTH_MIN {
            return StreamClass::Dense;
        }
        return StreamClass::Medium;
    }

    if stride <= defaults::MEDIUM_STRIDE_MAX {
        if stream_length >= defaults::MEDIUM_LENGTH_MIN {
            return StreamClass::Medium;
        }
        return StreamClass::Sparse;
    }

    StreamClass::Sparse
}

/// Classifies a signature by stride alone, for fresh groups.
pub fn classify_stride(stride: u32) -> StreamClass {
    if stride <= defaults::DENSE_STRIDE_MAX {
        StreamClass::Dense
    } else if stride <= defaults::MEDIUM_STRIDE_MAX {
        StreamClass::Medium
    } else {
        StreamClass::Sparse
    }
}

/// One confirmed stream with classification, grouping and confidence state.
#[derive(Clone, Copy, Debug)]
pub struct TransformerStreamEntry {
    /// Whether this slot holds a live stream.
    pub valid: bool,
    /// Active streams generate prefetches; valid inactive streams are
    /// dormant and available for re-launch.
    pub active: bool,
    /// Travel direction, fixed at creation.
    pub direction: Direction,
    /// Stride in blocks, fixed at creation.
    pub stride: u32,
    /// First block covered by the stream.
    pub start_block: BlockNumber,
    /// Boundary the prefetch frontier may not pass.
    pub end_block: BlockNumber,
    /// Current prefetch frontier.
    pub current_block: BlockNumber,
    /// Logical time of the last triggering miss.
    pub last_trigger: u64,
    /// Prefetches issued on behalf of this stream.
    pub stream_length: u32,
    /// Current classification.
    pub class: StreamClass,
    /// Times this stream came back from dormancy.
    pub reactivation_count: u32,
    /// Reinforced confidence, within `[1, MAX_CONFIDENCE]`.
    pub confidence: u32,
    /// Owning group, if any.
    pub group_id: Option<usize>,
    /// Consecutive same-stride prefetches; gates aggressive lookahead.
    pub consistent_stride_count: u32,
}

impl Default for TransformerStreamEntry {
    fn default() -> Self {
        Self {
            valid: false,
            active: false,
            direction: Direction::Positive,
            stride: 1,
            start_block: BlockNumber::default(),
            end_block: BlockNumber::default(),
            current_block: BlockNumber::default(),
            last_trigger: 0,
            stream_length: 0,
            class: StreamClass::Unknown,
            reactivation_count: 0,
            confidence: 1,
            group_id: None,
            consistent_stride_count: 0,
        }
    }
}

impl TransformerStreamEntry {
    /// Returns true when `block` lies within `[start, current]`, oriented by
    /// the stream direction.
    pub fn covers(&self, block: BlockNumber) -> bool {
        match self.direction {
            Direction::Positive => block >= self.start_block && block <= self.current_block,
            Direction::Negative => block <= self.start_block && block >= self.current_block,
        }
    }

    /// Whether the frontier sits within one stride of the stream end.
    pub fn at_stride_boundary(&self) -> bool {
        self.direction.remaining(self.current_block, self.end_block) <= i64::from(self.stride)
    }
}

/// Transformer-aware stream prefetcher state.
pub struct TransformerStream {
    config: TransformerConfig,
    training: TrainingTable,
    streams: Vec<TransformerStreamEntry>,
    groups: GroupTable,
    patterns: PatternHistory,
    phase: PhaseMonitor,
    timestamp: u64,
    cleanup_counter: u64,
    stats: StreamStats,
}

impl TransformerStream {
    /// Creates a prefetcher with empty tables and timestamp zero.
    pub fn new(config: &TransformerConfig) -> Self {
        Self {
            training: TrainingTable::new(
                config.training_table_size,
                config.region_size_blocks,
                config.confirmation_threshold,
            ),
            streams: vec![TransformerStreamEntry::default(); config.stream_table_size],
            groups: GroupTable::new(config.max_stream_groups, config.max_streams_per_group),
            patterns: PatternHistory::new(
                config.pattern_history_size,
                config.region_size_blocks,
                config.reuse_window,
                config.max_confidence,
            ),
            phase: PhaseMonitor::new(config),
            timestamp: 0,
            cleanup_counter: 0,
            stats: StreamStats::default(),
            config: config.clone(),
        }
    }

    /// Returns the stream table, for state inspection.
    pub fn streams(&self) -> &[TransformerStreamEntry] {
        &self.streams
    }

    /// Returns the training table entries, for state inspection.
    pub fn training_entries(&self) -> &[TrainingEntry] {
        self.training.entries()
    }

    /// Returns the group table, for state inspection.
    pub fn groups(&self) -> &[StreamGroup] {
        self.groups.groups()
    }

    /// Returns the pattern history.
    pub fn patterns(&self) -> &PatternHistory {
        &self.patterns
    }

    /// Returns the phase monitor.
    pub fn phase(&self) -> &PhaseMonitor {
        &self.phase
    }

    /// Returns the current logical timestamp.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the behavioral counters.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Finds the stream whose covered span contains `block`.
    fn find_stream_for_block(&self, block: BlockNumber) -> Option<usize> {
        self.streams
            .iter()
            .position(|e| e.valid && e.covers(block))
    }

    /// Finds a dormant stream with identical geometry near `region`.
    fn find_matching_inactive_stream(
        &self,
        direction: Direction,
        stride: u32,
        region: BlockNumber,
    ) -> Option<usize> {
        let radius = self.config.region_size_blocks * defaults::RELAUNCH_REGION_RADIUS;
        self.streams.iter().position(|e| {
            e.valid
                && !e.active
                && e.direction == direction
                && e.stride == stride
                && region
                    .gap_from(e.start_block.region_base(self.config.region_size_blocks))
                    .unsigned_abs()
                    <= radius
        })
    }

    /// Eviction priority of a stream; the minimum-priority entry is evicted.
    ///
    /// High-value streams score high: dense class, accumulated confidence,
    /// populous group, currently active. Staleness subtracts.
    fn eviction_priority(&self, idx: usize) -> i32 {
        let entry = &self.streams[idx];
        if !entry.valid {
            return i32::MAX;
        }

        let mut priority = match entry.class {
            StreamClass::Dense => 30,
            StreamClass::Medium => 20,
            StreamClass::Sparse => 10,
            StreamClass::Unknown => 15,
        };

        priority += entry.confidence as i32 * 2;

        if let Some(group_idx) = entry.group_id {
            priority += self.groups.member_count(group_idx) as i32 * 3;
        }

        if entry.active {
            priority += 10;
        }

        let age = self.timestamp - entry.last_trigger;
        if age > self.config.dead_stream_threshold / 2 {
            priority -= 5;
        }
        if age > self.config.dead_stream_threshold {
            priority -= 10;
        }

        priority
    }

    /// Selects the lowest-priority victim, preferring any invalid slot.
    fn select_victim_stream(&self) -> usize {
        if let Some(idx) = self.streams.iter().position(|e| !e.valid) {
            return idx;
        }

        (0..self.streams.len())
            .min_by_key(|&i| self.eviction_priority(i))
            .unwrap_or(0)
    }

    /// Allocates a stream slot.
    ///
    /// Prefers an invalid slot, then retries after a dead-stream sweep, then
    /// terminates the lowest-priority victim.
    fn allocate_stream_slot(&mut self) -> usize {
        if let Some(idx) = self.streams.iter().position(|e| !e.valid) {
            return idx;
        }

        self.remove_dead_streams();
        if let Some(idx) = self.streams.iter().position(|e| !e.valid) {
            return idx;
        }

        let victim = self.select_victim_stream();
        self.terminate_stream(victim);
        self.stats.streams_evicted += 1;
        victim
    }

    /// Attaches a stream to the group for its signature.
    ///
    /// A full group still lends the stream its back-reference; an inserted
    /// member inherits the group's representative class.
    fn attach_to_group(&mut self, stream_idx: usize) {
        let entry = self.streams[stream_idx];
        let allocation = self.groups.find_or_create(
            entry.direction,
            entry.stride,
            classify_stride(entry.stride),
            self.timestamp,
        );

        for orphan in allocation.displaced {
            self.streams[orphan].group_id = None;
        }

        self.streams[stream_idx].group_id = Some(allocation.index);
        if self.groups.add_member(allocation.index, stream_idx) {
            self.streams[stream_idx].class = self.groups.group(allocation.index).typical_class;
        }
    }

    /// Creates and immediately drives a stream headed at `head`.
    fn create_stream(
        &mut self,
        direction: Direction,
        stride: u32,
        head: BlockNumber,
        seed_confidence: u32,
        host: &mut dyn CacheHost,
    ) {
        let idx = self.allocate_stream_slot();

        let mut entry = TransformerStreamEntry {
            valid: true,
            active: true,
            direction,
            stride,
            start_block: head,
            end_block: direction.end_for(head, stride, self.config.end_horizon),
            current_block: head,
            last_trigger: self.timestamp,
            stream_length: 0,
            class: StreamClass::Unknown,
            reactivation_count: 0,
            confidence: seed_confidence.max(1),
            group_id: None,
            consistent_stride_count: 0,
        };
        entry.class = classify(stride, 0);
        self.streams[idx] = entry;

        self.attach_to_group(idx);
        self.stats.streams_created += 1;
        debug!(
            "stream created: head={} dir={:?} stride={} confidence={}",
            head.val(),
            direction,
            stride,
            self.streams[idx].confidence
        );
        self.generate_prefetches(idx, host);
    }

    /// Relaunches a dormant stream at `trigger`.
    ///
    /// The frontier restarts at the trigger block; the start is pulled back
    /// to it when the trigger lies outside the stored span, the end is
    /// extended only when the new horizon reaches strictly further in the
    /// direction of travel, and confidence is boosted for the reuse.
    fn reactivate_stream(&mut self, idx: usize, trigger: BlockNumber, host: &mut dyn CacheHost) {
        let now = self.timestamp;
        let max_confidence = self.config.max_confidence;
        let entry = &mut self.streams[idx];

        entry.active = true;
        entry.last_trigger = now;
        entry.reactivation_count += 1;
        entry.current_block = trigger;
        if entry.direction.is_beyond(entry.start_block, trigger) {
            entry.start_block = trigger;
        }
        entry.confidence =
            (entry.confidence + defaults::CONFIDENCE_BOOST_ON_REUSE).min(max_confidence);

        let new_end = entry
            .direction
            .end_for(trigger, entry.stride, self.config.end_horizon);
        if entry.direction.is_beyond(new_end, entry.end_block) {
            entry.end_block = new_end;
        }

        if self.streams[idx].group_id.is_none() {
            self.attach_to_group(idx);
        }

        self.stats.streams_relaunched += 1;
        debug!("stream relaunched: trigger={}", trigger.val());
        self.generate_prefetches(idx, host);
    }

    /// Relaunches a matching dormant stream, if one exists.
    fn try_relaunch_stream(
        &mut self,
        head: BlockNumber,
        direction: Direction,
        stride: u32,
        host: &mut dyn CacheHost,
    ) -> bool {
        let region = head.region_base(self.config.region_size_blocks);
        match self.find_matching_inactive_stream(direction, stride, region) {
            Some(idx) => {
                self.reactivate_stream(idx, head, host);
                true
            }
            None => false,
        }
    }

    /// Bumps a stream's confidence (and its group's) on a useful trigger.
    fn reinforce_stream_confidence(&mut self, idx: usize) {
        let max_confidence = self.config.max_confidence;
        let entry = &mut self.streams[idx];
        entry.confidence = (entry.confidence + 1).min(max_confidence);

        if let Some(group_idx) = entry.group_id {
            self.groups.bump_confidence(group_idx);
        }
    }

    /// Lookahead bound from stride stability.
    fn safe_lookahead(&self, entry: &TransformerStreamEntry) -> u32 {
        if entry.consistent_stride_count >= defaults::STRIDE_STABILITY_THRESHOLD {
            if entry.class == StreamClass::Dense {
                defaults::AGGRESSIVE_LOOKAHEAD
            } else {
                self.config.base_prefetch_degree
            }
        } else {
            defaults::CONSERVATIVE_LOOKAHEAD
        }
    }

    /// Degree granted by a stream's class.
    fn degree_for_class(&self, class: StreamClass) -> u32 {
        match class {
            StreamClass::Dense => defaults::DENSE_PREFETCH_DEGREE,
            StreamClass::Medium => defaults::MEDIUM_PREFETCH_DEGREE,
            StreamClass::Sparse => defaults::SPARSE_PREFETCH_DEGREE,
            StreamClass::Unknown => self.config.base_prefetch_degree,
        }
    }

    /// Re-derives a stream's class and propagates it to its group.
    fn update_stream_classification(&mut self, idx: usize) {
        let entry = &mut self.streams[idx];
        if !entry.valid {
            return;
        }
        entry.class = classify(entry.stride, entry.stream_length);
        if let Some(group_idx) = entry.group_id {
            self.groups.set_typical_class(group_idx, entry.class);
        }
    }

    /// Issues up to the granted degree of prefetches for one stream.
    ///
    /// The degree is the tightest of the phase limit, the class limit and
    /// the stability lookahead. The volley stops early when the frontier
    /// passes the stream end (the stream goes dormant), at a stride
    /// boundary after the first issue, under MSHR pressure, or when the
    /// host refuses a request.
    fn generate_prefetches(&mut self, idx: usize, host: &mut dyn CacheHost) {
        if !self.streams[idx].valid || !self.streams[idx].active {
            return;
        }

        let phase_degree = self.phase.degree();
        let class_degree = self.degree_for_class(self.streams[idx].class);
        let safe_lookahead = self.safe_lookahead(&self.streams[idx]);

        let mut degree = phase_degree.min(class_degree).min(safe_lookahead);
        if self.phase.in_transition() {
            degree = degree.min(self.config.min_prefetch_degree);
        }

        for i in 0..degree {
            let entry = &mut self.streams[idx];
            if !entry.valid || !entry.active {
                return;
            }

            let next = entry.direction.advance(entry.current_block, entry.stride);
            if entry.direction.is_beyond(next, entry.end_block) {
                entry.active = false;
                self.stats.streams_expired += 1;
                return;
            }

            if i > 0 && entry.at_stride_boundary() {
                break;
            }

            let mshr = host.mshr_occupancy_ratio();
            if mshr > defaults::MSHR_STOP_RATIO {
                self.stats.backpressure_stalls += 1;
                return;
            }

            let fill_this_level = mshr < defaults::MSHR_FILL_RATIO;
            if host.prefetch_line(next.address(), fill_this_level) {
                let entry = &mut self.streams[idx];
                entry.current_block = next;
                entry.stream_length += 1;
                entry.consistent_stride_count += 1;
                self.stats.prefetches_issued += 1;

                if self.streams[idx].stream_length % defaults::CLASSIFY_INTERVAL == 0 {
                    self.update_stream_classification(idx);
                }
            } else {
                self.stats.prefetches_refused += 1;
                return;
            }
        }

        self.streams[idx].last_trigger = self.timestamp;
    }

    /// Terminates a stream: its fingerprint is recorded, its group
    /// membership released, and the churn reported to the phase monitor.
    fn terminate_stream(&mut self, idx: usize) {
        let entry = self.streams[idx];
        if !entry.valid {
            return;
        }

        self.patterns.record(
            entry.direction,
            entry.stride,
            entry.start_block,
            entry.stream_length,
            entry.class,
            self.timestamp,
        );

        if let Some(group_idx) = entry.group_id {
            self.groups.remove_member(group_idx, idx);
        }

        self.phase.note_termination();

        let entry = &mut self.streams[idx];
        entry.group_id = None;
        entry.valid = false;
        entry.active = false;
        debug!("stream terminated: start={}", entry.start_block.val());
    }

    /// Whether group membership shields a stream from the dead sweep.
    fn is_group_protected(&self, idx: usize) -> bool {
        self.streams[idx]
            .group_id
            .map_or(false, |g| self.groups.is_protected(g))
    }

    /// Removes streams that aged past the dead threshold without growing.
    ///
    /// A dead candidate survives when its group still has live siblings and
    /// its own confidence is high; repeated patterns earn the benefit of the
    /// doubt.
    fn remove_dead_streams(&mut self) {
        let now = self.timestamp;

        for idx in 0..self.streams.len() {
            let entry = &self.streams[idx];
            if !entry.valid {
                continue;
            }

            let age = now - entry.last_trigger;
            let mut is_dead = age > self.config.dead_stream_threshold
                && entry.stream_length < self.config.short_stream_threshold;

            if is_dead
                && self.is_group_protected(idx)
                && entry.confidence >= self.config.fast_track_confidence
            {
                is_dead = false;
            }

            if is_dead {
                self.terminate_stream(idx);
                self.stats.dead_streams_removed += 1;
            }
        }
    }

    /// Refreshes a training entry's pattern confidence once a candidate
    /// (direction, stride) exists for it.
    fn refresh_pattern_confidence(&mut self, train_idx: usize, block: BlockNumber) {
        let entry = self.training.entry(train_idx);
        if !entry.valid {
            return;
        }

        let candidate = match entry.single_gap() {
            Some(gap) => Direction::of_gap(gap).map(|d| (d, gap.unsigned_abs() as u32)),
            None => entry.direction.map(|d| (d, entry.stride)),
        };

        if let Some((direction, stride)) = candidate {
            let confidence = self
                .patterns
                .confidence_for(direction, stride, block, self.timestamp);
            self.training.entry_mut(train_idx).pattern_confidence = confidence;
        }
    }
}

impl Prefetcher for TransformerStream {
    /// Observes a cache access; trains on misses only.
    ///
    /// A miss inside an existing stream reinforces and advances it. Any
    /// other miss feeds the training table with the fast-track bar enabled;
    /// a re-validated pattern launches a stream, preferring the re-launch of
    /// a matching dormant one.
    fn on_access(&mut self, host: &mut dyn CacheHost, access: &CacheAccess) -> u32 {
        if access.hit {
            return access.metadata;
        }

        self.timestamp += 1;
        self.stats.misses_observed += 1;

        match self.phase.note_miss() {
            Some(PhaseChange::TransitionEntered) => {
                self.stats.phase_transitions += 1;
                debug!("phase transition entered");
            }
            Some(PhaseChange::Recovered) => {
                self.stats.phase_recoveries += 1;
                debug!("phase transition recovered");
            }
            None => {}
        }

        self.cleanup_counter += 1;
        if self.cleanup_counter >= self.config.cleanup_interval {
            self.remove_dead_streams();
            self.cleanup_counter = 0;
        }

        let miss_block = access.addr.block();

        if let Some(idx) = self.find_stream_for_block(miss_block) {
            let entry = &mut self.streams[idx];
            entry.last_trigger = self.timestamp;
            if !entry.active {
                entry.active = true;
                entry.reactivation_count += 1;
                self.stats.streams_reactivated += 1;
            }
            self.reinforce_stream_confidence(idx);
            self.generate_prefetches(idx, host);
            return access.metadata;
        }

        let train_idx = self.training.find_or_allocate(miss_block, self.timestamp);
        match self.training.record_miss(
            train_idx,
            miss_block,
            self.timestamp,
            Some(self.config.fast_track_confidence),
        ) {
            TrainOutcome::Launch {
                direction,
                stride,
                head,
                confidence,
                fast_track,
            } => {
                if fast_track {
                    self.stats.fast_track_confirms += 1;
                }
                if !self.try_relaunch_stream(head, direction, stride, host) {
                    self.create_stream(direction, stride, head, confidence, host);
                }
            }
            TrainOutcome::Noise => self.stats.noise_filtered += 1,
            TrainOutcome::Reset => self.stats.training_resets += 1,
            TrainOutcome::Recorded => {
                self.refresh_pattern_confidence(train_idx, miss_block);
            }
        }

        access.metadata
    }

    /// Fills do not train the stream engine.
    fn on_fill(&mut self, _host: &mut dyn CacheHost, fill: &FillEvent) -> u32 {
        fill.metadata
    }

    /// Continues prefetching for all active streams in the background.
    fn on_cycle(&mut self, host: &mut dyn CacheHost) {
        for idx in 0..self.streams.len() {
            if self.streams[idx].valid && self.streams[idx].active {
                self.generate_prefetches(idx, host);
            }
        }
    }

    fn final_stats(&self) {
        self.stats.print("TRANSFORMER STREAM");
    }
}

//! Enhanced stream prefetcher.
//!
//! A region-trained stream prefetcher with four refinements over a plain
//! sequential-stream detector:
//! 1. **Constant-stride detection:** Streams may stride more than one block.
//! 2. **Noise-tolerant training:** A single ±1-block intruder does not
//!    restart training.
//! 3. **Early re-launch:** A new confirmation matching a dormant stream
//!    reactivates it instead of allocating a fresh slot.
//! 4. **Dead-stream removal:** Short streams that stop triggering are
//!    reclaimed.
//!
//! Training happens on cache misses only and is unidirectional per stream.
//! All aging uses a monotonic logical timestamp incremented once per miss.

use log::debug;

use crate::common::BlockNumber;
use crate::config::{defaults, StreamConfig};
use crate::engine::training::{TrainOutcome, TrainingEntry, TrainingTable};
use crate::engine::{CacheAccess, CacheHost, Direction, FillEvent, Prefetcher};
use crate::stats::StreamStats;

/// One confirmed stream.
#[derive(Clone, Copy, Debug)]
pub struct StreamEntry {
    /// Whether this slot holds a live stream.
    pub valid: bool,
    /// Active streams generate prefetches; a valid inactive stream is
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
}

impl Default for StreamEntry {
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
        }
    }
}

impl StreamEntry {
    /// Returns true when `block` lies within `[start, current]`, oriented by
    /// the stream direction.
    pub fn covers(&self, block: BlockNumber) -> bool {
        match self.direction {
            Direction::Positive => block >= self.start_block && block <= self.current_block,
            Direction::Negative => block <= self.start_block && block >= self.current_block,
        }
    }
}

/// Enhanced stream prefetcher state.
pub struct EnhancedStream {
    config: StreamConfig,
    training: TrainingTable,
    streams: Vec<StreamEntry>,
    timestamp: u64,
    cleanup_counter: u64,
    stats: StreamStats,
}

impl EnhancedStream {
    /// Creates a prefetcher with empty tables and timestamp zero.
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            training: TrainingTable::new(
                config.training_table_size,
                config.region_size_blocks,
                config.confirmation_threshold,
            ),
            streams: vec![StreamEntry::default(); config.stream_table_size],
            timestamp: 0,
            cleanup_counter: 0,
            stats: StreamStats::default(),
            config: config.clone(),
        }
    }

    /// Returns the stream table, for state inspection.
    pub fn streams(&self) -> &[StreamEntry] {
        &self.streams
    }

    /// Returns the training table entries, for state inspection.
    pub fn training_entries(&self) -> &[TrainingEntry] {
        self.training.entries()
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

    /// Allocates a stream slot.
    ///
    /// Prefers an invalid slot, then retries after a dead-stream sweep, then
    /// evicts the least recently triggered dormant stream, then the overall
    /// least recently triggered.
    fn allocate_stream_slot(&mut self) -> usize {
        if let Some(idx) = self.streams.iter().position(|e| !e.valid) {
            return idx;
        }

        self.remove_dead_streams();
        if let Some(idx) = self.streams.iter().position(|e| !e.valid) {
            return idx;
        }

        let victim = self
            .streams
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.active)
            .min_by_key(|(_, e)| e.last_trigger)
            .map(|(i, _)| i)
            .unwrap_or_else(|| {
                self.streams
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.last_trigger)
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            });

        self.streams[victim].valid = false;
        self.stats.streams_evicted += 1;
        victim
    }

    /// Creates and immediately drives a stream headed at `head`.
    fn create_stream(
        &mut self,
        direction: Direction,
        stride: u32,
        head: BlockNumber,
        host: &mut dyn CacheHost,
    ) {
        let idx = self.allocate_stream_slot();
        self.streams[idx] = StreamEntry {
            valid: true,
            active: true,
            direction,
            stride,
            start_block: head,
            end_block: direction.end_for(head, stride, self.config.end_horizon),
            current_block: head,
            last_trigger: self.timestamp,
            stream_length: 0,
        };
        self.stats.streams_created += 1;
        debug!(
            "stream created: head={} dir={:?} stride={}",
            head.val(),
            direction,
            stride
        );
        self.generate_prefetches(idx, host);
    }

    /// Relaunches a dormant stream at `trigger`.
    ///
    /// The frontier restarts at the trigger block; the start is pulled back
    /// to it when the trigger lies outside the stored span, and the end is
    /// extended only when the new horizon reaches strictly further in the
    /// direction of travel.
    fn reactivate_stream(&mut self, idx: usize, trigger: BlockNumber, host: &mut dyn CacheHost) {
        let now = self.timestamp;
        let entry = &mut self.streams[idx];

        entry.active = true;
        entry.last_trigger = now;
        entry.current_block = trigger;
        if entry.direction.is_beyond(entry.start_block, trigger) {
            entry.start_block = trigger;
        }

        let new_end = entry
            .direction
            .end_for(trigger, entry.stride, self.config.end_horizon);
        if entry.direction.is_beyond(new_end, entry.end_block) {
            entry.end_block = new_end;
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

    /// Issues up to the configured degree of prefetches for one stream.
    ///
    /// The volley stops early when the frontier passes the stream end (the
    /// stream goes dormant), when the MSHR is too busy (retried on a later
    /// trigger or cycle), or when the host refuses a request.
    fn generate_prefetches(&mut self, idx: usize, host: &mut dyn CacheHost) {
        for _ in 0..self.config.prefetch_degree {
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

            let mshr = host.mshr_occupancy_ratio();
            if mshr > defaults::MSHR_STOP_RATIO {
                self.stats.backpressure_stalls += 1;
                return;
            }

            let fill_this_level = mshr < defaults::MSHR_FILL_RATIO;
            if host.prefetch_line(next.address(), fill_this_level) {
                entry.current_block = next;
                entry.stream_length += 1;
                self.stats.prefetches_issued += 1;
            } else {
                self.stats.prefetches_refused += 1;
                return;
            }
        }

        self.streams[idx].last_trigger = self.timestamp;
    }

    /// Removes streams that aged past the dead threshold without growing.
    fn remove_dead_streams(&mut self) {
        let now = self.timestamp;
        for entry in &mut self.streams {
            if !entry.valid {
                continue;
            }
            let age = now - entry.last_trigger;
            if age > self.config.dead_stream_threshold
                && entry.stream_length < self.config.short_stream_threshold
            {
                entry.valid = false;
                entry.active = false;
                self.stats.dead_streams_removed += 1;
            }
        }
    }
}

impl Prefetcher for EnhancedStream {
    /// Observes a cache access; trains on misses only.
    ///
    /// A miss inside an existing stream advances its prefetch frontier
    /// (reactivating a dormant stream in place). Any other miss feeds the
    /// training table; a re-validated confirmed pattern launches a stream,
    /// preferring the re-launch of a matching dormant one.
    fn on_access(&mut self, host: &mut dyn CacheHost, access: &CacheAccess) -> u32 {
        if access.hit {
            return access.metadata;
        }

        self.timestamp += 1;
        self.stats.misses_observed += 1;

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
                self.stats.streams_reactivated += 1;
            }
            self.generate_prefetches(idx, host);
            return access.metadata;
        }

        let train_idx = self.training.find_or_allocate(miss_block, self.timestamp);
        match self
            .training
            .record_miss(train_idx, miss_block, self.timestamp, None)
        {
            TrainOutcome::Launch {
                direction,
                stride,
                head,
                ..
            } => {
                if !self.try_relaunch_stream(head, direction, stride, host) {
                    self.create_stream(direction, stride, head, host);
                }
            }
            TrainOutcome::Noise => self.stats.noise_filtered += 1,
            TrainOutcome::Reset => self.stats.training_resets += 1,
            TrainOutcome::Recorded => {}
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
        self.stats.print("ENHANCED STREAM");
    }
}

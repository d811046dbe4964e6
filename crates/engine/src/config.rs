//! Configuration system for the prefetcher family.
//!
//! This module defines all configuration structures and enums used to
//! parameterize the engines. It provides:
//! 1. **Defaults:** Baseline tuning constants for training, stream tracking,
//!    reinforcement, phase throttling and selection.
//! 2. **Structures:** Per-engine config for the baseline stream prefetcher,
//!    the transformer-aware variant, and the set-dueling selectors.
//! 3. **Enums:** Prefetcher kind selection for the factory.
//!
//! Configuration is supplied as JSON by the embedding simulator or built
//! with `PrefetcherConfig::default()`.

use serde::Deserialize;

/// Default tuning constants for the prefetcher family.
///
/// These values define the baseline behavior when not explicitly overridden
/// in the deserialized configuration. Secondary constants that are not
/// exposed as config fields (class degrees, lookahead limits, MSHR
/// thresholds, selector internals) also live here.
pub mod defaults {
    /// Number of entries in the region training table.
    pub const TRAINING_TABLE_SIZE: usize = 32;

    /// Number of stream table entries for the baseline prefetcher.
    pub const STREAM_TABLE_SIZE: usize = 16;

    /// Number of stream table entries for the transformer-aware variant.
    ///
    /// Larger than the baseline so concurrent similar streams (multi-head
    /// attention style workloads) can coexist.
    pub const TRANSFORMER_STREAM_TABLE_SIZE: usize = 32;

    /// Cache blocks per training region (power of two).
    pub const REGION_SIZE_BLOCKS: u64 = 4;

    /// Consistent misses required before a training entry is confirmed-ready.
    pub const CONFIRMATION_THRESHOLD: u32 = 3;

    /// Logical-time age beyond which an unproductive stream is dead.
    pub const DEAD_STREAM_THRESHOLD: u64 = 1000;

    /// Streams shorter than this many prefetches are eligible for removal.
    pub const SHORT_STREAM_THRESHOLD: u32 = 4;

    /// Lines prefetched ahead per trigger (baseline).
    pub const PREFETCH_DEGREE: u32 = 2;

    /// Misses between periodic dead-stream sweeps.
    pub const CLEANUP_INTERVAL: u64 = 256;

    /// Stream end horizon: strides ahead of the launch point at creation.
    pub const END_HORIZON_BLOCKS: u32 = 64;

    /// Baseline degree for the transformer variant outside phase transitions.
    pub const BASE_PREFETCH_DEGREE: u32 = 2;

    /// Floor degree enforced during phase transitions.
    pub const MIN_PREFETCH_DEGREE: u32 = 1;

    /// Logical-time window for pattern-history reuse matching.
    pub const REUSE_WINDOW_SIZE: u64 = 2000;

    /// Maximum stream/pattern confidence level.
    pub const MAX_CONFIDENCE: u32 = 8;

    /// Pattern confidence at which training is fast-tracked.
    pub const FAST_TRACK_CONFIDENCE: u32 = 4;

    /// Terminated-stream fingerprints remembered in the ring buffer.
    pub const PATTERN_HISTORY_SIZE: usize = 16;

    /// Misses per phase-detection window.
    pub const PHASE_WINDOW_SIZE: u32 = 64;

    /// Terminations within one window that signal a phase transition.
    pub const PHASE_TRANSITION_THRESHOLD: u32 = 4;

    /// Stable misses required to recover from a phase transition.
    pub const PHASE_RECOVERY_WINDOW: u32 = 32;

    /// Maximum distinct (direction, stride) stream groups.
    pub const MAX_STREAM_GROUPS: usize = 8;

    /// Maximum member streams per group.
    pub const MAX_STREAMS_PER_GROUP: usize = 8;

    /// Confidence increment when a dormant stream is relaunched.
    pub const CONFIDENCE_BOOST_ON_REUSE: u32 = 2;

    /// Strides at or below this classify a stream as dense.
    pub const DENSE_STRIDE_MAX: u32 = 2;

    /// Strides at or below this (and above the dense bound) are medium.
    pub const MEDIUM_STRIDE_MAX: u32 = 16;

    /// Minimum prefetched length for the dense class.
    pub const DENSE_LENGTH_MIN: u32 = 8;

    /// Minimum prefetched length for the medium class.
    pub const MEDIUM_LENGTH_MIN: u32 = 4;

    /// Prefetch degree for dense streams.
    pub const DENSE_PREFETCH_DEGREE: u32 = 4;

    /// Prefetch degree for medium streams.
    pub const MEDIUM_PREFETCH_DEGREE: u32 = 2;

    /// Prefetch degree for sparse streams.
    pub const SPARSE_PREFETCH_DEGREE: u32 = 1;

    /// Lookahead while a stream's stride is not yet stable.
    pub const CONSERVATIVE_LOOKAHEAD: u32 = 1;

    /// Lookahead for stable dense streams.
    pub const AGGRESSIVE_LOOKAHEAD: u32 = 4;

    /// Consecutive same-stride prefetches before a stream counts as stable.
    pub const STRIDE_STABILITY_THRESHOLD: u32 = 3;

    /// Successful prefetches between classification refreshes.
    pub const CLASSIFY_INTERVAL: u32 = 8;

    /// Training-table lookup radius around a miss, in regions.
    pub const TRAINING_REGION_RADIUS: u64 = 2;

    /// Dormant-stream relaunch matching radius, in regions.
    pub const RELAUNCH_REGION_RADIUS: u64 = 2;

    /// Pattern-history matching radius, in regions.
    pub const PATTERN_REGION_RADIUS: u64 = 4;

    /// MSHR occupancy above which a prefetch volley is aborted.
    pub const MSHR_STOP_RATIO: f64 = 0.75;

    /// MSHR occupancy below which prefetches fill this cache level.
    pub const MSHR_FILL_RATIO: f64 = 0.5;

    /// Saturation bound of the selector policy counter.
    pub const POLICY_SATURATION: i32 = 1024;

    /// Cycles between selector policy updates.
    pub const POLICY_UPDATE_INTERVAL: u64 = 5000;

    /// Minimum issued prefetches per core before the policy moves.
    pub const MIN_POLICY_SAMPLES: u64 = 100;

    /// Score ratio a core must exceed to win a policy step.
    pub const SCORE_MARGIN: f64 = 1.05;

    /// Default number of cache sets assumed by the selectors.
    pub const SELECTOR_NUM_SETS: usize = 2048;

    /// DRAM bandwidth utilization above which prefetching is gated.
    pub const BW_UTIL_THRESHOLD: f64 = 0.9;

    /// Accuracy floor that keeps prefetching alive under high bandwidth.
    pub const MIN_ACCURACY_THRESHOLD: f64 = 0.1;
}

/// Prefetcher engine kinds a selector can arbitrate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EngineKind {
    /// Baseline enhanced stream prefetcher.
    #[default]
    EnhancedStream,
    /// Transformer-aware stream prefetcher.
    TransformerStream,
}

/// Top-level prefetcher selection for the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PrefetcherKind {
    /// No prefetching.
    #[default]
    None,
    /// Baseline enhanced stream prefetcher.
    EnhancedStream,
    /// Transformer-aware stream prefetcher.
    TransformerStream,
    /// Set-dueling selector between two engine cores.
    Dueling,
    /// Set-dueling selector with a DRAM-bandwidth admission gate.
    BandwidthAware,
}

/// Root configuration for building a prefetcher instance.
///
/// # Examples
///
/// Deserializing from JSON (typical embedding-simulator usage):
///
/// ```
/// use prefetch_core::config::{PrefetcherConfig, PrefetcherKind};
///
/// let json = r#"{
///     "kind": "TransformerStream",
///     "transformer": {
///         "stream_table_size": 64,
///         "phase_window_size": 128
///     }
/// }"#;
///
/// let config: PrefetcherConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.kind, PrefetcherKind::TransformerStream);
/// assert_eq!(config.transformer.stream_table_size, 64);
/// assert_eq!(config.transformer.phase_window_size, 128);
/// assert_eq!(config.transformer.reuse_window, 2000);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefetcherConfig {
    /// Which prefetcher to build.
    #[serde(default)]
    pub kind: PrefetcherKind,

    /// Baseline stream prefetcher tuning.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Transformer-aware variant tuning.
    #[serde(default)]
    pub transformer: TransformerConfig,

    /// Set-dueling selector tuning.
    #[serde(default)]
    pub selector: SelectorConfig,
}

/// Tuning for the baseline enhanced stream prefetcher.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Training table entries.
    #[serde(default = "StreamConfig::default_training_table_size")]
    pub training_table_size: usize,

    /// Stream table entries.
    #[serde(default = "StreamConfig::default_stream_table_size")]
    pub stream_table_size: usize,

    /// Cache blocks per training region (power of two).
    #[serde(default = "StreamConfig::default_region_size_blocks")]
    pub region_size_blocks: u64,

    /// Consistent misses before a training entry is confirmed-ready.
    #[serde(default = "StreamConfig::default_confirmation_threshold")]
    pub confirmation_threshold: u32,

    /// Logical-time age beyond which an unproductive stream is dead.
    #[serde(default = "StreamConfig::default_dead_stream_threshold")]
    pub dead_stream_threshold: u64,

    /// Streams shorter than this many prefetches may be removed.
    #[serde(default = "StreamConfig::default_short_stream_threshold")]
    pub short_stream_threshold: u32,

    /// Lines prefetched ahead per trigger.
    #[serde(default = "StreamConfig::default_prefetch_degree")]
    pub prefetch_degree: u32,

    /// Misses between periodic dead-stream sweeps.
    #[serde(default = "StreamConfig::default_cleanup_interval")]
    pub cleanup_interval: u64,

    /// Stream end horizon in strides at creation.
    #[serde(default = "StreamConfig::default_end_horizon")]
    pub end_horizon: u32,
}

impl StreamConfig {
    /// Returns the default training table size.
    fn default_training_table_size() -> usize {
        defaults::TRAINING_TABLE_SIZE
    }

    /// Returns the default stream table size.
    fn default_stream_table_size() -> usize {
        defaults::STREAM_TABLE_SIZE
    }

    /// Returns the default region size in blocks.
    fn default_region_size_blocks() -> u64 {
        defaults::REGION_SIZE_BLOCKS
    }

    /// Returns the default confirmation threshold.
    fn default_confirmation_threshold() -> u32 {
        defaults::CONFIRMATION_THRESHOLD
    }

    /// Returns the default dead-stream age threshold.
    fn default_dead_stream_threshold() -> u64 {
        defaults::DEAD_STREAM_THRESHOLD
    }

    /// Returns the default short-stream length threshold.
    fn default_short_stream_threshold() -> u32 {
        defaults::SHORT_STREAM_THRESHOLD
    }

    /// Returns the default prefetch degree.
    fn default_prefetch_degree() -> u32 {
        defaults::PREFETCH_DEGREE
    }

    /// Returns the default cleanup interval.
    fn default_cleanup_interval() -> u64 {
        defaults::CLEANUP_INTERVAL
    }

    /// Returns the default end horizon.
    fn default_end_horizon() -> u32 {
        defaults::END_HORIZON_BLOCKS
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            training_table_size: defaults::TRAINING_TABLE_SIZE,
            stream_table_size: defaults::STREAM_TABLE_SIZE,
            region_size_blocks: defaults::REGION_SIZE_BLOCKS,
            confirmation_threshold: defaults::CONFIRMATION_THRESHOLD,
            dead_stream_threshold: defaults::DEAD_STREAM_THRESHOLD,
            short_stream_threshold: defaults::SHORT_STREAM_THRESHOLD,
            prefetch_degree: defaults::PREFETCH_DEGREE,
            cleanup_interval: defaults::CLEANUP_INTERVAL,
            end_horizon: defaults::END_HORIZON_BLOCKS,
        }
    }
}

/// Tuning for the transformer-aware stream prefetcher.
///
/// Carries its own copy of the base stream parameters (the stream table is
/// larger by default) plus grouping, reinforcement and phase-throttling
/// knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformerConfig {
    /// Training table entries.
    #[serde(default = "TransformerConfig::default_training_table_size")]
    pub training_table_size: usize,

    /// Stream table entries.
    #[serde(default = "TransformerConfig::default_stream_table_size")]
    pub stream_table_size: usize,

    /// Cache blocks per training region (power of two).
    #[serde(default = "TransformerConfig::default_region_size_blocks")]
    pub region_size_blocks: u64,

    /// Consistent misses before a training entry is confirmed-ready.
    #[serde(default = "TransformerConfig::default_confirmation_threshold")]
    pub confirmation_threshold: u32,

    /// Logical-time age beyond which an unproductive stream is dead.
    #[serde(default = "TransformerConfig::default_dead_stream_threshold")]
    pub dead_stream_threshold: u64,

    /// Streams shorter than this many prefetches may be removed.
    #[serde(default = "TransformerConfig::default_short_stream_threshold")]
    pub short_stream_threshold: u32,

    /// Misses between periodic dead-stream sweeps.
    #[serde(default = "TransformerConfig::default_cleanup_interval")]
    pub cleanup_interval: u64,

    /// Stream end horizon in strides at creation.
    #[serde(default = "TransformerConfig::default_end_horizon")]
    pub end_horizon: u32,

    /// Prefetch degree outside phase transitions.
    #[serde(default = "TransformerConfig::default_base_prefetch_degree")]
    pub base_prefetch_degree: u32,

    /// Prefetch degree floor during phase transitions.
    #[serde(default = "TransformerConfig::default_min_prefetch_degree")]
    pub min_prefetch_degree: u32,

    /// Logical-time window for pattern-history reuse matching.
    #[serde(default = "TransformerConfig::default_reuse_window")]
    pub reuse_window: u64,

    /// Maximum stream/pattern confidence.
    #[serde(default = "TransformerConfig::default_max_confidence")]
    pub max_confidence: u32,

    /// Pattern confidence at which training is fast-tracked.
    #[serde(default = "TransformerConfig::default_fast_track_confidence")]
    pub fast_track_confidence: u32,

    /// Terminated-stream fingerprints kept in the ring buffer.
    #[serde(default = "TransformerConfig::default_pattern_history_size")]
    pub pattern_history_size: usize,

    /// Misses per phase-detection window.
    #[serde(default = "TransformerConfig::default_phase_window_size")]
    pub phase_window_size: u32,

    /// Terminations per window that signal a phase transition.
    #[serde(default = "TransformerConfig::default_phase_transition_threshold")]
    pub phase_transition_threshold: u32,

    /// Stable misses required to recover from a transition.
    #[serde(default = "TransformerConfig::default_phase_recovery_window")]
    pub phase_recovery_window: u32,

    /// Maximum distinct (direction, stride) groups.
    #[serde(default = "TransformerConfig::default_max_stream_groups")]
    pub max_stream_groups: usize,

    /// Maximum member streams per group.
    #[serde(default = "TransformerConfig::default_max_streams_per_group")]
    pub max_streams_per_group: usize,
}

impl TransformerConfig {
    /// Returns the default training table size.
    fn default_training_table_size() -> usize {
        defaults::TRAINING_TABLE_SIZE
    }

    /// Returns the default stream table size (transformer variant).
    fn default_stream_table_size() -> usize {
        defaults::TRANSFORMER_STREAM_TABLE_SIZE
    }

    /// Returns the default region size in blocks.
    fn default_region_size_blocks() -> u64 {
        defaults::REGION_SIZE_BLOCKS
    }

    /// Returns the default confirmation threshold.
    fn default_confirmation_threshold() -> u32 {
        defaults::CONFIRMATION_THRESHOLD
    }

    /// Returns the default dead-stream age threshold.
    fn default_dead_stream_threshold() -> u64 {
        defaults::DEAD_STREAM_THRESHOLD
    }

    /// Returns the default short-stream length threshold.
    fn default_short_stream_threshold() -> u32 {
        defaults::SHORT_STREAM_THRESHOLD
    }

    /// Returns the default cleanup interval.
    fn default_cleanup_interval() -> u64 {
        defaults::CLEANUP_INTERVAL
    }

    /// Returns the default end horizon.
    fn default_end_horizon() -> u32 {
        defaults::END_HORIZON_BLOCKS
    }

    /// Returns the default base prefetch degree.
    fn default_base_prefetch_degree() -> u32 {
        defaults::BASE_PREFETCH_DEGREE
    }

    /// Returns the default minimum prefetch degree.
    fn default_min_prefetch_degree() -> u32 {
        defaults::MIN_PREFETCH_DEGREE
    }

    /// Returns the default reuse window.
    fn default_reuse_window() -> u64 {
        defaults::REUSE_WINDOW_SIZE
    }

    /// Returns the default confidence ceiling.
    fn default_max_confidence() -> u32 {
        defaults::MAX_CONFIDENCE
    }

    /// Returns the default fast-track confidence.
    fn default_fast_track_confidence() -> u32 {
        defaults::FAST_TRACK_CONFIDENCE
    }

    /// Returns the default pattern history size.
    fn default_pattern_history_size() -> usize {
        defaults::PATTERN_HISTORY_SIZE
    }

    /// Returns the default phase window size.
    fn default_phase_window_size() -> u32 {
        defaults::PHASE_WINDOW_SIZE
    }

    /// Returns the default phase transition threshold.
    fn default_phase_transition_threshold() -> u32 {
        defaults::PHASE_TRANSITION_THRESHOLD
    }

    /// Returns the default phase recovery window.
    fn default_phase_recovery_window() -> u32 {
        defaults::PHASE_RECOVERY_WINDOW
    }

    /// Returns the default maximum group count.
    fn default_max_stream_groups() -> usize {
        defaults::MAX_STREAM_GROUPS
    }

    /// Returns the default maximum members per group.
    fn default_max_streams_per_group() -> usize {
        defaults::MAX_STREAMS_PER_GROUP
    }
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            training_table_size: defaults::TRAINING_TABLE_SIZE,
            stream_table_size: defaults::TRANSFORMER_STREAM_TABLE_SIZE,
            region_size_blocks: defaults::REGION_SIZE_BLOCKS,
            confirmation_threshold: defaults::CONFIRMATION_THRESHOLD,
            dead_stream_threshold: defaults::DEAD_STREAM_THRESHOLD,
            short_stream_threshold: defaults::SHORT_STREAM_THRESHOLD,
            cleanup_interval: defaults::CLEANUP_INTERVAL,
            end_horizon: defaults::END_HORIZON_BLOCKS,
            base_prefetch_degree: defaults::BASE_PREFETCH_DEGREE,
            min_prefetch_degree: defaults::MIN_PREFETCH_DEGREE,
            reuse_window: defaults::REUSE_WINDOW_SIZE,
            max_confidence: defaults::MAX_CONFIDENCE,
            fast_track_confidence: defaults::FAST_TRACK_CONFIDENCE,
            pattern_history_size: defaults::PATTERN_HISTORY_SIZE,
            phase_window_size: defaults::PHASE_WINDOW_SIZE,
            phase_transition_threshold: defaults::PHASE_TRANSITION_THRESHOLD,
            phase_recovery_window: defaults::PHASE_RECOVERY_WINDOW,
            max_stream_groups: defaults::MAX_STREAM_GROUPS,
            max_streams_per_group: defaults::MAX_STREAMS_PER_GROUP,
        }
    }
}

/// Tuning for the set-dueling selector wrappers.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Number of cache sets in the level being prefetched.
    #[serde(default = "SelectorConfig::default_num_sets")]
    pub num_sets: usize,

    /// Core dispatched to sampler and category-1 sets (metadata bit 30).
    #[serde(default)]
    pub first: EngineKind,

    /// Core dispatched to category-2 sets (metadata bit 31).
    #[serde(default = "SelectorConfig::default_second")]
    pub second: EngineKind,
}

impl SelectorConfig {
    /// Returns the default cache set count.
    fn default_num_sets() -> usize {
        defaults::SELECTOR_NUM_SETS
    }

    /// Returns the default second core kind.
    fn default_second() -> EngineKind {
        EngineKind::TransformerStream
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            num_sets: defaults::SELECTOR_NUM_SETS,
            first: EngineKind::EnhancedStream,
            second: EngineKind::TransformerStream,
        }
    }
}

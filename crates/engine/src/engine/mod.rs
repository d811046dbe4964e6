//! Stream prefetcher engines.
//!
//! This module contains the interface and implementations of the
//! miss-driven stream prefetchers:
//! 1. **Interface:** The [`Prefetcher`] capability trait, the [`CacheHost`]
//!    port through which prefetches are issued, and the access/fill event
//!    types.
//! 2. **Training:** The shared region-indexed training table.
//! 3. **Engines:** The baseline enhanced stream prefetcher and the
//!    transformer-aware variant.

/// Region-indexed training table with noise-tolerant inference.
pub mod training;

/// Baseline enhanced stream prefetcher.
pub mod enhanced;

/// Transformer-aware stream prefetcher.
pub mod transformer;

pub use self::enhanced::EnhancedStream;
pub use self::transformer::TransformerStream;

use crate::common::{Address, BlockNumber};
use crate::config::{EngineKind, PrefetcherConfig, PrefetcherKind};
use crate::selector::{BandwidthAwareSelector, DuelingSelector};

/// Travel direction of a confirmed stream.
///
/// Training state uses `Option<Direction>` while the direction is still
/// unknown; confirmed streams always carry a concrete direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Stream progresses toward higher block numbers.
    Positive,
    /// Stream progresses toward lower block numbers.
    Negative,
}

impl Direction {
    /// Returns the signed unit step of this direction.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }

    /// Classifies a signed gap, `None` for a zero gap.
    #[inline]
    pub fn of_gap(gap: i64) -> Option<Direction> {
        match gap {
            g if g > 0 => Some(Direction::Positive),
            g if g < 0 => Some(Direction::Negative),
            _ => None,
        }
    }

    /// Returns the block one stride further in this direction.
    #[inline]
    pub fn advance(self, block: BlockNumber, stride: u32) -> BlockNumber {
        block.offset(self.sign() * i64::from(stride))
    }

    /// Returns true when `a` lies strictly further than `b` in this
    /// direction of travel.
    ///
    /// Used both for the passed-the-end test during prefetch generation and
    /// for the end-extension test on reactivation.
    #[inline]
    pub fn is_beyond(self, a: BlockNumber, b: BlockNumber) -> bool {
        match self {
            Direction::Positive => a > b,
            Direction::Negative => a < b,
        }
    }

    /// Returns the remaining travel distance from `from` to `end`, in
    /// blocks (negative once `end` has been passed).
    #[inline]
    pub fn remaining(self, from: BlockNumber, end: BlockNumber) -> i64 {
        match self {
            Direction::Positive => end.gap_from(from),
            Direction::Negative => from.gap_from(end),
        }
    }

    /// Computes the stream end boundary: `horizon` strides beyond `head` in
    /// this direction.
    #[inline]
    pub fn end_for(self, head: BlockNumber, stride: u32, horizon: u32) -> BlockNumber {
        head.offset(self.sign() * i64::from(stride) * i64::from(horizon))
    }
}

/// Cache access categories forwarded by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Demand load.
    Load,
    /// Read-for-ownership (store miss).
    Rfo,
    /// Access generated by a prefetcher.
    Prefetch,
    /// Writeback from an upper level.
    Writeback,
    /// Page-walk access.
    Translation,
}

/// One cache access as observed by a prefetcher.
#[derive(Clone, Copy, Debug)]
pub struct CacheAccess {
    /// Byte address of the access.
    pub addr: Address,
    /// Program counter of the triggering instruction (unused by the stream
    /// engines, which learn from addresses only).
    pub ip: Address,
    /// Whether the access hit in this cache level.
    pub hit: bool,
    /// Whether the access hit a line that a prefetcher brought in.
    pub useful_prefetch: bool,
    /// Access category.
    pub kind: AccessKind,
    /// Opaque metadata carried alongside the request.
    pub metadata: u32,
}

/// One cache-line install as observed by a prefetcher.
#[derive(Clone, Copy, Debug)]
pub struct FillEvent {
    /// Byte address of the installed line.
    pub addr: Address,
    /// Cache set the line was installed into.
    pub set: usize,
    /// Way within the set.
    pub way: usize,
    /// Whether the fill was caused by a prefetch.
    pub prefetch: bool,
    /// Byte address of the evicted line, if any.
    pub evicted_addr: Address,
    /// Opaque metadata carried alongside the fill.
    pub metadata: u32,
}

/// Host-side port a prefetcher issues requests through.
///
/// The embedding cache provides this synchronously; calls never suspend and
/// the host serialises them with its own accesses.
pub trait CacheHost {
    /// Issues a speculative fetch for `addr`.
    ///
    /// `fill_this_level` selects whether the line is installed into the
    /// cache invoking the prefetcher or bypassed to a lower level. Returns
    /// false when the request was dropped (prefetch queue full).
    fn prefetch_line(&mut self, addr: Address, fill_this_level: bool) -> bool;

    /// Current miss-status-holding-register occupancy, in `[0, 1]`.
    fn mshr_occupancy_ratio(&self) -> f64;

    /// Current DRAM bandwidth utilization, in `[0, 1]`.
    ///
    /// Hosts that do not model bandwidth can rely on the default, which
    /// never throttles the bandwidth-aware selector.
    fn bandwidth_utilization(&self) -> f64 {
        0.0
    }
}

/// Trait for cache prefetcher implementations.
///
/// Prefetchers observe the host's access stream, learn address patterns and
/// issue speculative fetches through the [`CacheHost`] port. All methods are
/// bounded-time table scans; failures are absorbed internally.
pub trait Prefetcher: Send + Sync {
    /// Observes a cache access. Returns the (possibly re-tagged) metadata to
    /// carry with the request.
    fn on_access(&mut self, host: &mut dyn CacheHost, access: &CacheAccess) -> u32;

    /// Observes a cache-line install. Stream engines ignore fills; selectors
    /// use them to attribute issued prefetches.
    fn on_fill(&mut self, host: &mut dyn CacheHost, fill: &FillEvent) -> u32;

    /// Advances one simulated cycle; drives background prefetching for
    /// active streams.
    fn on_cycle(&mut self, host: &mut dyn CacheHost);

    /// Prints final statistics at end of simulation.
    fn final_stats(&self);
}

/// Builds one engine core for a selector.
fn build_engine(kind: EngineKind, config: &PrefetcherConfig) -> Box<dyn Prefetcher> {
    match kind {
        EngineKind::EnhancedStream => Box::new(EnhancedStream::new(&config.stream)),
        EngineKind::TransformerStream => Box::new(TransformerStream::new(&config.transformer)),
    }
}

/// Builds the configured prefetcher, or `None` when prefetching is disabled.
pub fn build(config: &PrefetcherConfig) -> Option<Box<dyn Prefetcher>> {
    match config.kind {
        PrefetcherKind::None => None,
        PrefetcherKind::EnhancedStream => Some(Box::new(EnhancedStream::new(&config.stream))),
        PrefetcherKind::TransformerStream => {
            Some(Box::new(TransformerStream::new(&config.transformer)))
        }
        PrefetcherKind::Dueling => Some(Box::new(DuelingSelector::new(
            &config.selector,
            build_engine(config.selector.first, config),
            build_engine(config.selector.second, config),
        ))),
        PrefetcherKind::BandwidthAware => Some(Box::new(BandwidthAwareSelector::new(
            &config.selector,
            build_engine(config.selector.first, config),
            build_engine(config.selector.second, config),
        ))),
    }
}

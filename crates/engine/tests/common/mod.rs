//! Shared test infrastructure for the prefetcher suite.


use prefetch_core::common::{Address, BlockNumber};
use prefetch_core::engine::enhanced::EnhancedStream;
use prefetch_core::engine::transformer::TransformerStream;
use prefetch_core::engine::{AccessKind, CacheAccess, Direction, Prefetcher};

use self::mocks::RecordingHost;

/// Initializes logging for a test; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a demand-load miss at the given block number.
pub fn miss(block: u64) -> CacheAccess {
    CacheAccess {
        addr: BlockNumber::new(block).address(),
        ip: Address::new(0),
        hit: false,
        useful_prefetch: false,
        kind: AccessKind::Load,
        metadata: 0,
    }
}

/// Builds a demand-load hit at the given block number.
pub fn hit(block: u64) -> CacheAccess {
    CacheAccess {
        hit: true,
        ..miss(block)
    }
}

/// Feeds a sequence of block-number misses to a prefetcher.
pub fn drive_misses<P: Prefetcher + ?Sized>(
    prefetcher: &mut P,
    host: &mut RecordingHost,
    blocks: &[u64],
) {
    for &block in blocks {
        prefetcher.on_access(host, &miss(block));
    }
}

/// Feeds `count` misses to pairwise-distant blocks that never confirm a
/// pattern, advancing the logical clock without touching existing streams.
pub fn drive_scattered_misses<P: Prefetcher + ?Sized>(
    prefetcher: &mut P,
    host: &mut RecordingHost,
    base_block: u64,
    count: u64,
) {
    for i in 0..count {
        prefetcher.on_access(host, &miss(base_block + i * 4096));
    }
}

/// Checks the structural invariants of the baseline engine.
pub fn check_enhanced_invariants(engine: &EnhancedStream, host: &RecordingHost) {
    for entry in engine.streams().iter().filter(|e| e.valid) {
        assert!(entry.stride >= 1, "stream stride must be at least 1");
        match entry.direction {
            Direction::Positive => {
                assert!(entry.start_block <= entry.current_block);
                assert!(entry.current_block <= entry.end_block);
            }
            Direction::Negative => {
                assert!(entry.start_block >= entry.current_block);
                assert!(entry.current_block >= entry.end_block);
            }
        }
        assert!(
            u64::from(entry.stream_length) <= host.issued.len() as u64,
            "stream_length cannot exceed successful prefetches"
        );
    }

    let regions: Vec<u64> = engine
        .training_entries()
        .iter()
        .filter(|e| e.valid)
        .map(|e| e.region_base.val())
        .collect();
    let mut deduped = regions.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(regions.len(), deduped.len(), "training regions must be unique");
}

/// Checks the structural invariants of the transformer engine.
pub fn check_transformer_invariants(engine: &TransformerStream, host: &RecordingHost) {
    for entry in engine.streams().iter().filter(|e| e.valid) {
        assert!(entry.stride >= 1, "stream stride must be at least 1");
        match entry.direction {
            Direction::Positive => {
                assert!(entry.start_block <= entry.current_block);
                assert!(entry.current_block <= entry.end_block);
            }
            Direction::Negative => {
                assert!(entry.start_block >= entry.current_block);
                assert!(entry.current_block >= entry.end_block);
            }
        }
        assert!(
            u64::from(entry.stream_length) <= host.issued.len() as u64,
            "stream_length cannot exceed successful prefetches"
        );
    }

    let regions: Vec<u64> = engine
        .training_entries()
        .iter()
        .filter(|e| e.valid)
        .map(|e| e.region_base.val())
        .collect();
    let mut deduped = regions.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(regions.len(), deduped.len(), "training regions must be unique");

    for group in engine.groups().iter().filter(|g| g.valid) {
        let listed: Vec<usize> = group.members.iter().flatten().copied().collect();
        assert_eq!(
            listed.len(),
            group.member_count as usize,
            "member_count must match occupied slots"
        );
        for &member in &listed {
            let stream = &engine.streams()[member];
            assert!(stream.valid, "group member must reference a valid stream");
            assert_eq!(stream.direction, group.direction);
            assert_eq!(stream.stride, group.stride);
        }
    }
}

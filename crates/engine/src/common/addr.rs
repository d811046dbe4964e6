//! Byte address and block number types.
//!
//! This module defines strong types for the two address spaces the
//! prefetchers operate in, to prevent accidental mixing of units:
//! 1. **Byte Addresses:** What the host cache presents on every access.
//! 2. **Block Numbers:** Byte address divided by the cache-line size; all
//!    training, stream and region arithmetic happens in block units.
//! 3. **Region Arithmetic:** Power-of-two alignment and signed gaps used by
//!    the training table.

use super::constants::LOG2_BLOCK_SIZE;

/// A byte address as presented by the host cache.
///
/// Byte addresses appear only at the interface boundary: incoming access and
/// fill events carry them, and outgoing prefetch requests are expressed in
/// them. Everything in between works on [`BlockNumber`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address(pub u64);

/// A cache-block number: the byte address right-shifted by the line size.
///
/// Block numbers are the unit of all pattern learning. Gaps between block
/// numbers are signed block distances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockNumber(pub u64);

impl Address {
    /// Creates a new byte address from a raw 64-bit value.
    #[inline(always)]
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }

    /// Returns the cache-block number containing this address.
    #[inline(always)]
    pub fn block(&self) -> BlockNumber {
        BlockNumber(self.0 >> LOG2_BLOCK_SIZE)
    }
}

impl BlockNumber {
    /// Creates a new block number from a raw 64-bit value.
    #[inline(always)]
    pub fn new(block: u64) -> Self {
        Self(block)
    }

    /// Returns the raw 64-bit block value.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }

    /// Returns the first byte address of this block.
    #[inline(always)]
    pub fn address(&self) -> Address {
        Address(self.0 << LOG2_BLOCK_SIZE)
    }

    /// Returns the region base: this block with its low bits cleared to a
    /// `region_blocks` boundary.
    ///
    /// `region_blocks` must be a power of two.
    #[inline]
    pub fn region_base(&self, region_blocks: u64) -> BlockNumber {
        BlockNumber(self.0 & !(region_blocks - 1))
    }

    /// Returns the signed gap `self - earlier` in blocks.
    #[inline]
    pub fn gap_from(&self, earlier: BlockNumber) -> i64 {
        self.0.wrapping_sub(earlier.0) as i64
    }

    /// Returns the block `delta` blocks away (negative deltas move toward
    /// lower addresses).
    #[inline]
    pub fn offset(&self, delta: i64) -> BlockNumber {
        BlockNumber(self.0.wrapping_add(delta as u64))
    }
}

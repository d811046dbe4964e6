//! Cache-line geometry constants.
//!
//! All engines in this crate reason about memory in units of cache blocks.
//! These constants fix the block size for the whole family; the host cache
//! is expected to use the same line size.

/// Size of a cache line in bytes.
pub const BLOCK_SIZE: u64 = 64;

/// log2 of the cache-line size; shift amount between byte addresses and
/// block numbers.
pub const LOG2_BLOCK_SIZE: u32 = 6;

//! Common types and constants shared across the prefetcher family.
//!
//! This module provides the building blocks every engine relies on:
//! 1. **Address Types:** Strong newtypes for byte addresses and cache-block numbers.
//! 2. **Constants:** Cache-line geometry shared by all engines.

/// Byte address and cache-block number types with region arithmetic.
pub mod addr;

/// Cache-line geometry constants.
pub mod constants;

pub use addr::{Address, BlockNumber};

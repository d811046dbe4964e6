//! Hardware cache prefetcher library.
//!
//! This crate implements a family of miss-driven hardware prefetchers for
//! embedding in a cycle-driven cache simulator:
//! 1. **Engines:** Region-trained stream prefetchers — a baseline with
//!    constant-stride detection, noise-tolerant training, early re-launch
//!    and dead-stream removal, and a transformer-aware variant adding
//!    grouping, classification, pattern-history reinforcement and
//!    phase-aware throttling.
//! 2. **Selectors:** Set-dueling wrappers that arbitrate between two engine
//!    cores by measured usefulness, optionally gated by DRAM bandwidth.
//! 3. **Interface:** The [`Prefetcher`](engine::Prefetcher) capability trait
//!    driven by the host on every access, fill and cycle, and the
//!    [`CacheHost`](engine::CacheHost) port prefetches are issued through.
//! 4. **Configuration and statistics:** Serde-based config with defaults,
//!    and per-instance behavioral counters.

/// Common types and constants (addresses, block numbers, line geometry).
pub mod common;

/// Prefetcher configuration (defaults, enums, per-engine structures).
pub mod config;

/// Stream prefetcher engines (interface, training, baseline, transformer).
pub mod engine;

/// Set-dueling selector wrappers.
pub mod selector;

/// Behavioral statistics collection and reporting.
pub mod stats;

/// Root configuration type; deserialize from JSON or use the defaults.
pub use crate::config::PrefetcherConfig;
/// Capability trait the host drives; build instances with `engine::build`.
pub use crate::engine::{build, CacheHost, Prefetcher};

//! Configuration tests.
//!
//! Verifies the built-in defaults, partial JSON overrides, enum spellings
//! and the factory dispatch.

use prefetch_core::config::{
    EngineKind, PrefetcherConfig, PrefetcherKind, SelectorConfig, StreamConfig, TransformerConfig,
};

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

/// Baseline stream defaults match the documented tuning.
#[test]
fn stream_defaults() {
    let config = StreamConfig::default();
    assert_eq!(config.training_table_size, 32);
    assert_eq!(config.stream_table_size, 16);
    assert_eq!(config.region_size_blocks, 4);
    assert_eq!(config.confirmation_threshold, 3);
    assert_eq!(config.dead_stream_threshold, 1000);
    assert_eq!(config.short_stream_threshold, 4);
    assert_eq!(config.prefetch_degree, 2);
    assert_eq!(config.cleanup_interval, 256);
    assert_eq!(config.end_horizon, 64);
}

/// Transformer defaults extend the baseline with a larger stream table.
#[test]
fn transformer_defaults() {
    let config = TransformerConfig::default();
    assert_eq!(config.stream_table_size, 32);
    assert_eq!(config.base_prefetch_degree, 2);
    assert_eq!(config.min_prefetch_degree, 1);
    assert_eq!(config.reuse_window, 2000);
    assert_eq!(config.max_confidence, 8);
    assert_eq!(config.fast_track_confidence, 4);
    assert_eq!(config.pattern_history_size, 16);
    assert_eq!(config.phase_window_size, 64);
    assert_eq!(config.phase_transition_threshold, 4);
    assert_eq!(config.phase_recovery_window, 32);
    assert_eq!(config.max_stream_groups, 8);
    assert_eq!(config.max_streams_per_group, 8);
}

/// The selector defaults to dueling the two engine kinds.
#[test]
fn selector_defaults() {
    let config = SelectorConfig::default();
    assert_eq!(config.num_sets, 2048);
    assert_eq!(config.first, EngineKind::EnhancedStream);
    assert_eq!(config.second, EngineKind::TransformerStream);
}

/// The root config defaults to no prefetching.
#[test]
fn root_defaults_to_none() {
    let config = PrefetcherConfig::default();
    assert_eq!(config.kind, PrefetcherKind::None);
    assert!(prefetch_core::build(&config).is_none());
}

// ══════════════════════════════════════════════════════════
// 2. Deserialization
// ══════════════════════════════════════════════════════════

/// Partial JSON fills the remaining fields from the defaults.
#[test]
fn partial_json_keeps_defaults() {
    let json = r#"{
        "kind": "EnhancedStream",
        "stream": { "prefetch_degree": 4 }
    }"#;

    let config: PrefetcherConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.kind, PrefetcherKind::EnhancedStream);
    assert_eq!(config.stream.prefetch_degree, 4);
    assert_eq!(config.stream.training_table_size, 32);
    assert_eq!(config.transformer.reuse_window, 2000);
}

/// Kind spellings are PascalCase.
#[test]
fn kind_spellings() {
    for (text, kind) in [
        ("\"None\"", PrefetcherKind::None),
        ("\"EnhancedStream\"", PrefetcherKind::EnhancedStream),
        ("\"TransformerStream\"", PrefetcherKind::TransformerStream),
        ("\"Dueling\"", PrefetcherKind::Dueling),
        ("\"BandwidthAware\"", PrefetcherKind::BandwidthAware),
    ] {
        let parsed: PrefetcherKind = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, kind);
    }
}

/// Selector cores are configurable from JSON.
#[test]
fn selector_cores_from_json() {
    let json = r#"{
        "kind": "Dueling",
        "selector": {
            "num_sets": 1024,
            "first": "TransformerStream",
            "second": "EnhancedStream"
        }
    }"#;

    let config: PrefetcherConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.selector.num_sets, 1024);
    assert_eq!(config.selector.first, EngineKind::TransformerStream);
    assert_eq!(config.selector.second, EngineKind::EnhancedStream);
}

// ══════════════════════════════════════════════════════════
// 3. Factory
// ══════════════════════════════════════════════════════════

/// Every concrete kind builds an instance.
#[test]
fn factory_builds_every_kind() {
    for kind in [
        PrefetcherKind::EnhancedStream,
        PrefetcherKind::TransformerStream,
        PrefetcherKind::Dueling,
        PrefetcherKind::BandwidthAware,
    ] {
        let config = PrefetcherConfig {
            kind,
            ..PrefetcherConfig::default()
        };
        assert!(prefetch_core::build(&config).is_some());
    }
}

//! Prefetcher statistics collection and reporting.
//!
//! This module tracks behavioral counters for the engines and selectors. It
//! provides:
//! 1. **Stream engine counters:** misses observed, prefetches issued and
//!    refused, stream lifecycle events, training resets and noise hits.
//! 2. **Selector counters:** per-core dispatch counts, policy movements and
//!    bandwidth-gate decisions.
//! 3. **Reporting:** banner-style printing consumed by `final_stats()`.

/// Behavioral counters for one stream prefetcher instance.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Cache misses observed (training clock ticks).
    pub misses_observed: u64,
    /// Prefetch requests the host accepted.
    pub prefetches_issued: u64,
    /// Prefetch requests the host refused (queue full).
    pub prefetches_refused: u64,
    /// Volleys aborted because the MSHR was too busy.
    pub backpressure_stalls: u64,

    /// Streams created from confirmed training entries.
    pub streams_created: u64,
    /// Dormant streams relaunched by a matching confirmation.
    pub streams_relaunched: u64,
    /// Dormant streams reactivated in place by an in-range miss.
    pub streams_reactivated: u64,
    /// Streams that walked past their end boundary and went dormant.
    pub streams_expired: u64,
    /// Streams removed by the dead-stream sweep.
    pub dead_streams_removed: u64,
    /// Streams evicted to make room for a new confirmation.
    pub streams_evicted: u64,

    /// Training entries reset after an inconsistent gap pair.
    pub training_resets: u64,
    /// Spurious misses absorbed by the noise filter.
    pub noise_filtered: u64,
    /// Confirmations reached early through pattern-history confidence.
    pub fast_track_confirms: u64,

    /// Phase transitions entered.
    pub phase_transitions: u64,
    /// Phase transitions recovered from.
    pub phase_recoveries: u64,
}

impl StreamStats {
    /// Prints the counters under the given engine label.
    pub fn print(&self, label: &str) {
        println!("==========================================================");
        println!("{} PREFETCHER STATISTICS", label);
        println!("==========================================================");
        println!("misses_observed          {}", self.misses_observed);
        println!("prefetches.issued        {}", self.prefetches_issued);
        println!("prefetches.refused       {}", self.prefetches_refused);
        println!("prefetches.mshr_stalls   {}", self.backpressure_stalls);
        println!("streams.created          {}", self.streams_created);
        println!("streams.relaunched       {}", self.streams_relaunched);
        println!("streams.reactivated      {}", self.streams_reactivated);
        println!("streams.expired          {}", self.streams_expired);
        println!("streams.dead_removed     {}", self.dead_streams_removed);
        println!("streams.evicted          {}", self.streams_evicted);
        println!("training.resets          {}", self.training_resets);
        println!("training.noise_filtered  {}", self.noise_filtered);
        println!("training.fast_tracked    {}", self.fast_track_confirms);
        println!("phase.transitions        {}", self.phase_transitions);
        println!("phase.recoveries         {}", self.phase_recoveries);
        println!("==========================================================");
    }
}

/// Behavioral counters for a set-dueling selector.
#[derive(Debug, Clone, Default)]
pub struct SelectorStats {
    /// Accesses dispatched to the first core.
    pub first_selected: u64,
    /// Accesses dispatched to the second core.
    pub second_selected: u64,
    /// Policy steps won by the first core.
    pub first_wins: u64,
    /// Policy steps won by the second core.
    pub second_wins: u64,

    /// Useful prefetches observed for the first core.
    pub first_useful: u64,
    /// Prefetch fills attributed to the first core.
    pub first_issued: u64,
    /// Useful prefetches observed for the second core.
    pub second_useful: u64,
    /// Prefetch fills attributed to the second core.
    pub second_issued: u64,

    /// Accesses admitted by the bandwidth gate.
    pub gate_allowed: u64,
    /// Accesses suppressed by the bandwidth gate.
    pub gate_throttled: u64,
    /// Gate evaluations that saw high bandwidth utilization.
    pub high_bw_events: u64,
    /// Gate evaluations that saw accuracy below the floor.
    pub low_accuracy_events: u64,
}

impl SelectorStats {
    /// Prints the counters, including the final policy counter value.
    pub fn print(&self, label: &str, policy: i32) {
        let accuracy = |useful: u64, issued: u64| {
            if issued > 0 {
                100.0 * useful as f64 / issued as f64
            } else {
                0.0
            }
        };
        println!("==========================================================");
        println!("{} SELECTOR STATISTICS", label);
        println!("==========================================================");
        println!("selected.first           {}", self.first_selected);
        println!("selected.second          {}", self.second_selected);
        println!("policy.value             {}", policy);
        println!("policy.first_wins        {}", self.first_wins);
        println!("policy.second_wins       {}", self.second_wins);
        println!(
            "first   useful: {:<10} issued: {:<10} accuracy: {:.2}%",
            self.first_useful,
            self.first_issued,
            accuracy(self.first_useful, self.first_issued)
        );
        println!(
            "second  useful: {:<10} issued: {:<10} accuracy: {:.2}%",
            self.second_useful,
            self.second_issued,
            accuracy(self.second_useful, self.second_issued)
        );
        let gated = self.gate_allowed + self.gate_throttled;
        if gated > 0 {
            println!(
                "gate    allowed: {} throttled: {} ({:.2}%)",
                self.gate_allowed,
                self.gate_throttled,
                100.0 * self.gate_throttled as f64 / gated as f64
            );
            println!("gate.high_bw             {}", self.high_bw_events);
            println!("gate.low_accuracy        {}", self.low_accuracy_events);
        }
        println!("==========================================================");
    }
}

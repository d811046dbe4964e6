//! Bandwidth-aware set-dueling selector.
//!
//! The same dueling machinery as [`DuelingSelector`](super::DuelingSelector)
//! with an admission gate in front of it: when DRAM bandwidth is nearly
//! saturated, prefetching is suppressed unless the measured aggregate
//! accuracy justifies the traffic. Prefetches are hints; under bandwidth
//! pressure the cheapest prefetch is the one never issued.

use log::debug;

use crate::common::constants::LOG2_BLOCK_SIZE;
use crate::config::{defaults, SelectorConfig};
use crate::engine::{CacheAccess, CacheHost, FillEvent, Prefetcher};
use crate::stats::SelectorStats;

use super::{tag_first, tag_second, SetCategory, SetDueler};

/// Set-dueling selector with a DRAM-bandwidth admission gate.
pub struct BandwidthAwareSelector {
    dueler: SetDueler,
    first: Box<dyn Prefetcher>,
    second: Box<dyn Prefetcher>,
    cycle_count: u64,
    stats: SelectorStats,
}

impl BandwidthAwareSelector {
    /// Creates a selector owning the two cores.
    pub fn new(
        config: &SelectorConfig,
        first: Box<dyn Prefetcher>,
        second: Box<dyn Prefetcher>,
    ) -> Self {
        Self {
            dueler: SetDueler::new(config.num_sets),
            first,
            second,
            cycle_count: 0,
            stats: SelectorStats::default(),
        }
    }

    /// Returns the dueling state, for state inspection.
    pub fn dueler(&self) -> &SetDueler {
        &self.dueler
    }

    /// Returns the behavioral counters.
    pub fn stats(&self) -> &SelectorStats {
        &self.stats
    }

    /// Measured aggregate prefetch accuracy across both cores.
    ///
    /// Optimistic (1.0) until any prefetch has been issued, so the gate
    /// never starves a cold start.
    fn prefetch_accuracy(&self) -> f64 {
        let totals = self.dueler.totals();
        let useful = totals.first_useful + totals.second_useful;
        let issued = totals.first_issued + totals.second_issued;
        if issued > 0 {
            useful as f64 / issued as f64
        } else {
            1.0
        }
    }

    /// Evaluates the admission gate for one access.
    fn should_allow_prefetch(&mut self, host: &dyn CacheHost) -> bool {
        let bw = host.bandwidth_utilization();
        let accuracy = self.prefetch_accuracy();

        let bw_ok = bw < defaults::BW_UTIL_THRESHOLD;
        let accuracy_ok = accuracy > bw || accuracy > defaults::MIN_ACCURACY_THRESHOLD;

        if !bw_ok {
            self.stats.high_bw_events += 1;
        }
        if !accuracy_ok {
            self.stats.low_accuracy_events += 1;
        }

        let allow = bw_ok && accuracy_ok;
        if allow {
            self.stats.gate_allowed += 1;
        } else {
            self.stats.gate_throttled += 1;
        }
        allow
    }
}

impl Prefetcher for BandwidthAwareSelector {
    /// Credits usefulness, evaluates the gate, then dispatches by set
    /// category.
    ///
    /// Sampler sets always run the first core, so their usefulness is
    /// credited to it directly; follower sets credit whichever core the
    /// policy currently selects.
    fn on_access(&mut self, host: &mut dyn CacheHost, access: &CacheAccess) -> u32 {
        let set = self.dueler.set_of(access.addr.val(), LOG2_BLOCK_SIZE);

        if access.useful_prefetch && access.hit {
            match self.dueler.category(set) {
                SetCategory::Sampler | SetCategory::FirstDedicated => {
                    self.dueler.credit_useful(set, true, false)
                }
                SetCategory::SecondDedicated => self.dueler.credit_useful(set, false, true),
                SetCategory::Follower => {
                    let first = self.dueler.policy() >= 0;
                    self.dueler.credit_useful(set, first, !first);
                }
            }
        }

        if !self.should_allow_prefetch(host) {
            return access.metadata;
        }

        if matches!(self.dueler.category(set), SetCategory::Sampler) || self.dueler.use_first(set)
        {
            self.stats.first_selected += 1;
            tag_first(self.first.on_access(host, access))
        } else {
            self.stats.second_selected += 1;
            tag_second(self.second.on_access(host, access))
        }
    }

    /// Attributes prefetch fills by set category and forwards the fill to
    /// both cores.
    fn on_fill(&mut self, host: &mut dyn CacheHost, fill: &FillEvent) -> u32 {
        if fill.prefetch {
            match self.dueler.category(fill.set) {
                SetCategory::Sampler | SetCategory::FirstDedicated => {
                    self.dueler.credit_issued(fill.set, true, false)
                }
                SetCategory::SecondDedicated => self.dueler.credit_issued(fill.set, false, true),
                SetCategory::Follower => {
                    let first = self.dueler.policy() >= 0;
                    self.dueler.credit_issued(fill.set, first, !first);
                }
            }
        }

        self.first.on_fill(host, fill);
        self.second.on_fill(host, fill);
        fill.metadata
    }

    /// Re-evaluates the policy periodically and forwards the cycle to both
    /// cores.
    fn on_cycle(&mut self, host: &mut dyn CacheHost) {
        self.cycle_count += 1;
        if self.cycle_count % defaults::POLICY_UPDATE_INTERVAL == 0 {
            match self.dueler.update_policy() {
                Some(SetCategory::FirstDedicated) => self.stats.first_wins += 1,
                Some(SetCategory::SecondDedicated) => self.stats.second_wins += 1,
                _ => {}
            }
            debug!("policy counter: {}", self.dueler.policy());
        }

        self.first.on_cycle(host);
        self.second.on_cycle(host);
    }

    fn final_stats(&self) {
        let totals = self.dueler.totals();
        let mut stats = self.stats.clone();
        stats.first_useful = totals.first_useful;
        stats.first_issued = totals.first_issued;
        stats.second_useful = totals.second_useful;
        stats.second_issued = totals.second_issued;
        stats.print("BANDWIDTH-AWARE", self.dueler.policy());

        self.first.final_stats();
        self.second.final_stats();
    }
}

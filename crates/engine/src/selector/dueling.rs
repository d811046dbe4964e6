//! Plain set-dueling selector.
//!
//! Owns two prefetcher cores and dispatches each access to one of them by
//! cache-set category. Sampler sets operate the first core while tracking
//! both cores' prefetches through metadata tags; dedicated sets give each
//! core exclusive territory whose measured usefulness steers the policy
//! counter for the follower sets.

use log::debug;

use crate::common::constants::LOG2_BLOCK_SIZE;
use crate::config::{defaults, SelectorConfig};
use crate::engine::{CacheAccess, CacheHost, FillEvent, Prefetcher};
use crate::stats::SelectorStats;

use super::{is_first_tagged, is_second_tagged, tag_first, tag_second, SetCategory, SetDueler};

/// Set-dueling selector between two prefetcher cores.
pub struct DuelingSelector {
    dueler: SetDueler,
    first: Box<dyn Prefetcher>,
    second: Box<dyn Prefetcher>,
    cycle_count: u64,
    stats: SelectorStats,
}

impl DuelingSelector {
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
}

impl Prefetcher for DuelingSelector {
    /// Dispatches the access by set category and tags the metadata with the
    /// operating core's source bit.
    ///
    /// A hit on a prefetched line is credited to the issuing core first:
    /// sampler sets attribute by the metadata tags, dedicated sets by their
    /// category.
    fn on_access(&mut self, host: &mut dyn CacheHost, access: &CacheAccess) -> u32 {
        let set = self.dueler.set_of(access.addr.val(), LOG2_BLOCK_SIZE);

        if access.useful_prefetch && access.hit {
            match self.dueler.category(set) {
                SetCategory::Sampler => self.dueler.credit_useful(
                    set,
                    is_first_tagged(access.metadata),
                    is_second_tagged(access.metadata),
                ),
                SetCategory::FirstDedicated => self.dueler.credit_useful(set, true, false),
                SetCategory::SecondDedicated => self.dueler.credit_useful(set, false, true),
                SetCategory::Follower => {}
            }
        }

        if self.dueler.use_first(set) {
            self.stats.first_selected += 1;
            tag_first(self.first.on_access(host, access))
        } else {
            self.stats.second_selected += 1;
            tag_second(self.second.on_access(host, access))
        }
    }

    /// Attributes prefetch fills to their issuing core and forwards the fill
    /// to both cores so each keeps an accurate view of the cache.
    fn on_fill(&mut self, host: &mut dyn CacheHost, fill: &FillEvent) -> u32 {
        if fill.prefetch {
            match self.dueler.category(fill.set) {
                SetCategory::Sampler => self.dueler.credit_issued(
                    fill.set,
                    is_first_tagged(fill.metadata),
                    is_second_tagged(fill.metadata),
                ),
                SetCategory::FirstDedicated => self.dueler.credit_issued(fill.set, true, false),
                SetCategory::SecondDedicated => self.dueler.credit_issued(fill.set, false, true),
                SetCategory::Follower => {}
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
        stats.print("SET-DUELING", self.dueler.policy());

        self.first.final_stats();
        self.second.final_stats();
    }
}

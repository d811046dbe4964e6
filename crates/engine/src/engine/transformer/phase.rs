//! Phase-aware throttling.
//!
//! Workloads with distinct execution phases (attention, MLP, normalization)
//! kill many streams at once when a phase ends. The monitor watches stream
//! churn over a sliding miss window and drops the prefetch degree to a floor
//! while the access pattern is in flux, restoring it after a stretch of
//! stable behavior.

use crate::config::TransformerConfig;

/// Transition entered or recovered from, reported to the caller for
/// accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseChange {
    /// Stream churn crossed the threshold; degree dropped to the floor.
    TransitionEntered,
    /// Stability held long enough; degree restored.
    Recovered,
}

/// Sliding-window phase transition detector.
pub struct PhaseMonitor {
    window_size: u32,
    transition_threshold: u32,
    recovery_window: u32,
    base_degree: u32,
    min_degree: u32,

    misses_in_window: u32,
    streams_terminated_in_window: u32,
    current_degree: u32,
    in_transition: bool,
    recovery_counter: u32,
}

impl PhaseMonitor {
    /// Creates a monitor at the base degree with empty window counters.
    pub fn new(config: &TransformerConfig) -> Self {
        Self {
            window_size: config.phase_window_size,
            transition_threshold: config.phase_transition_threshold,
            recovery_window: config.phase_recovery_window,
            base_degree: config.base_prefetch_degree,
            min_degree: config.min_prefetch_degree,
            misses_in_window: 0,
            streams_terminated_in_window: 0,
            current_degree: config.base_prefetch_degree,
            in_transition: false,
            recovery_counter: 0,
        }
    }

    /// Counts one stream termination into the current window.
    pub fn note_termination(&mut self) {
        self.streams_terminated_in_window += 1;
    }

    /// Counts one miss; closes the window or advances recovery.
    ///
    /// When the window closes with enough terminations, a transition is
    /// entered and the degree drops to the floor; the window counters reset
    /// either way. While in transition, each further miss advances the
    /// recovery counter until the degree is restored.
    pub fn note_miss(&mut self) -> Option<PhaseChange> {
        self.misses_in_window += 1;

        if self.misses_in_window >= self.window_size {
            let entered = self.streams_terminated_in_window >= self.transition_threshold;
            self.misses_in_window = 0;
            self.streams_terminated_in_window = 0;

            if entered {
                self.in_transition = true;
                self.current_degree = self.min_degree;
                self.recovery_counter = 0;
                return Some(PhaseChange::TransitionEntered);
            }
        } else if self.in_transition {
            self.recovery_counter += 1;
            if self.recovery_counter >= self.recovery_window {
                self.in_transition = false;
                self.current_degree = self.base_degree;
                self.recovery_counter = 0;
                return Some(PhaseChange::Recovered);
            }
        }

        None
    }

    /// Current phase-limited prefetch degree.
    pub fn degree(&self) -> u32 {
        self.current_degree
    }

    /// Whether a transition is in progress.
    pub fn in_transition(&self) -> bool {
        self.in_transition
    }

    /// Misses counted into the current window.
    pub fn misses_in_window(&self) -> u32 {
        self.misses_in_window
    }

    /// Terminations counted into the current window.
    pub fn terminations_in_window(&self) -> u32 {
        self.streams_terminated_in_window
    }
}

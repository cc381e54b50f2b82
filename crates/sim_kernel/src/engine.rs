//! Time-advancement engine.
//!
//! Implements the lifecycle of one top-level advance request:
//!
//! 1. Round the request down to a multiple of the timestep; a request that
//!    rounds to zero (including zero and negative requests) becomes one
//!    timestep.
//! 2. Clear the interrupt flag.
//! 3. While not interrupted and time remains:
//!    a. subpulse length = min(outstanding limit, timestep, remaining);
//!    b. reset the limit to unbounded, so phases shorten the *next* subpulse;
//!    c. advance the clock;
//!    d. run the phase pipeline;
//!    e. book the subpulse against the request.
//! 4. Report the time actually advanced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::clock::SimClock;
use crate::config::KernelConfig;
use crate::context::PhaseContext;
use crate::phase::PhaseProcessor;
use crate::signal::SubpulseSignals;
use crate::store::Store;

/// Outcome of one top-level advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceReport {
    /// The raw request, before rounding.
    pub requested_secs: i64,
    /// The request after rounding to the timestep.
    pub target_secs: u64,
    /// Simulated seconds actually advanced.
    pub advanced_secs: u64,
    /// Subpulses run.
    pub subpulses: u64,
    /// `true` if a phase cut the request short.
    pub interrupted: bool,
    /// Clock reading once the advance finished.
    pub now: u64,
}

/// Drives the simulated clock and the phase pipeline.
#[derive(Debug)]
pub struct TimeEngine {
    timestep_secs: u64,
    clock: SimClock,
    signals: Arc<SubpulseSignals>,
    phases: PhaseProcessor,
}

impl TimeEngine {
    /// Build an engine around an already-populated phase pipeline. The
    /// pipeline is sealed here.
    #[must_use]
    pub fn new(config: &KernelConfig, mut phases: PhaseProcessor) -> Self {
        phases.initialize();
        Self {
            timestep_secs: config.timestep_secs.max(1),
            clock: SimClock::new(),
            signals: Arc::new(SubpulseSignals::new()),
            phases,
        }
    }

    /// The current simulated time.
    #[must_use]
    pub fn clock(&self) -> SimClock {
        self.clock
    }

    /// Set the clock to a loaded game's timestamp.
    pub fn restore_clock(&mut self, elapsed_secs: u64) {
        info!(elapsed_secs, "clock restored");
        self.clock.restore(elapsed_secs);
    }

    /// Rounding quantum and longest subpulse, in seconds.
    #[must_use]
    pub fn timestep_secs(&self) -> u64 {
        self.timestep_secs
    }

    /// Shared handle on the subpulse/interrupt signals.
    #[must_use]
    pub fn signals(&self) -> Arc<SubpulseSignals> {
        Arc::clone(&self.signals)
    }

    /// The sealed phase pipeline.
    #[must_use]
    pub fn phases(&self) -> &PhaseProcessor {
        &self.phases
    }

    /// Round a raw request to the number of seconds that will be attempted.
    #[must_use]
    pub fn round_request(&self, requested_secs: i64) -> u64 {
        let requested = u64::try_from(requested_secs).unwrap_or(0);
        let rounded = requested - requested % self.timestep_secs;
        if rounded == 0 {
            self.timestep_secs
        } else {
            rounded
        }
    }

    /// Advance the simulation, returning the seconds actually advanced.
    pub fn advance(&mut self, store: &mut Store, requested_secs: i64) -> u64 {
        self.advance_detailed(store, requested_secs).advanced_secs
    }

    /// Advance the simulation and report how it went.
    pub fn advance_detailed(&mut self, store: &mut Store, requested_secs: i64) -> AdvanceReport {
        let target = self.round_request(requested_secs);
        self.signals.clear_interrupt();

        debug!(
            requested_secs,
            target_secs = target,
            now = self.clock.now(),
            "advance start"
        );

        let mut remaining = target;
        let mut advanced = 0u64;
        let mut subpulses = 0u64;

        while !self.signals.is_interrupted() && remaining > 0 {
            let limit = self
                .signals
                .take_subpulse_limit()
                .unwrap_or(self.timestep_secs);
            let length = limit.min(self.timestep_secs).min(remaining);

            let now = self.clock.advance(length);
            let mut ctx = PhaseContext::new(store, &self.signals, now, subpulses);
            self.phases.process(&mut ctx, length);

            remaining -= length;
            advanced += length;
            subpulses += 1;
            trace!(subpulse = subpulses, length, now, remaining, "subpulse complete");
        }

        let report = AdvanceReport {
            requested_secs,
            target_secs: target,
            advanced_secs: advanced,
            subpulses,
            interrupted: remaining > 0,
            now: self.clock.now(),
        };
        if report.interrupted {
            info!(
                advanced_secs = advanced,
                target_secs = target,
                subpulses,
                "advance interrupted"
            );
        } else {
            debug!(advanced_secs = advanced, subpulses, now = report.now, "advance complete");
        }
        report
    }
}

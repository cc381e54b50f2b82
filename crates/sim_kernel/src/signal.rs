//! Interrupt and subpulse negotiation.
//!
//! Phases talk back to the time engine through [`SubpulseSignals`]: they may
//! ask for the *next* subpulse to be no longer than some duration, or flag
//! that the rest of the current advance request should be abandoned. Both
//! signals are atomics so phases may be run from worker threads without
//! changing this contract.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

/// Sentinel meaning "no phase has asked for a shorter subpulse".
const UNBOUNDED: u64 = u64::MAX;

/// Shared shorten-only subpulse limit plus the interrupt flag.
#[derive(Debug)]
pub struct SubpulseSignals {
    limit: AtomicU64,
    interrupt: AtomicBool,
}

impl SubpulseSignals {
    /// Signals with no limit and no interrupt.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: AtomicU64::new(UNBOUNDED),
            interrupt: AtomicBool::new(false),
        }
    }

    /// Ask for the next subpulse to last at most `max_secs` seconds.
    ///
    /// Only takes effect if strictly shorter than the outstanding request.
    /// A zero request is treated as one second, since a zero-length subpulse
    /// would never make progress. Returns `true` if the limit shrank.
    pub fn request_subpulse(&self, max_secs: u64) -> bool {
        let requested = max_secs.max(1);
        let previous = self.limit.fetch_min(requested, Ordering::AcqRel);
        let shortened = requested < previous;
        if shortened {
            debug!(requested_secs = requested, "subpulse limit shortened");
        }
        shortened
    }

    /// The outstanding limit, or `None` if no phase has asked for one.
    #[must_use]
    pub fn subpulse_limit(&self) -> Option<u64> {
        match self.limit.load(Ordering::Acquire) {
            UNBOUNDED => None,
            limit => Some(limit),
        }
    }

    /// Read the outstanding limit and reset it to unbounded in one step.
    pub fn take_subpulse_limit(&self) -> Option<u64> {
        match self.limit.swap(UNBOUNDED, Ordering::AcqRel) {
            UNBOUNDED => None,
            limit => Some(limit),
        }
    }

    /// Abandon the remaining subpulses of the current advance once the
    /// running subpulse completes.
    pub fn signal_interrupt(&self) {
        if !self.interrupt.swap(true, Ordering::AcqRel) {
            debug!("interrupt signalled");
        }
    }

    /// Reset the interrupt flag. Called by the time engine at the start of
    /// every top-level advance.
    pub fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::Release);
    }

    /// Returns `true` if a phase has interrupted the advance.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Acquire)
    }
}

impl Default for SubpulseSignals {
    fn default() -> Self {
        Self::new()
    }
}

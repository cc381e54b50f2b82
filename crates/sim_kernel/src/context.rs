//! Per-subpulse execution context handed to each phase.

use crate::signal::SubpulseSignals;
use crate::store::Store;

/// Everything a phase may touch while it runs.
///
/// Phases get exclusive access to the store for the duration of their call
/// and a shared handle on the subpulse signals.
pub struct PhaseContext<'a> {
    /// The world state.
    pub store: &'a mut Store,
    signals: &'a SubpulseSignals,
    /// Simulated time after this subpulse's advance, in seconds.
    pub now: u64,
    /// Zero-based index of this subpulse within the current advance.
    pub subpulse: u64,
}

impl<'a> PhaseContext<'a> {
    /// Context for one phase call.
    #[must_use]
    pub fn new(store: &'a mut Store, signals: &'a SubpulseSignals, now: u64, subpulse: u64) -> Self {
        Self {
            store,
            signals,
            now,
            subpulse,
        }
    }

    /// Ask for the next subpulse to last at most `max_secs` seconds.
    pub fn request_subpulse(&self, max_secs: u64) -> bool {
        self.signals.request_subpulse(max_secs)
    }

    /// Abandon the rest of the current advance after this subpulse.
    pub fn signal_interrupt(&self) {
        self.signals.signal_interrupt();
    }

    /// The signals shared by every phase in this subpulse.
    #[must_use]
    pub fn signals(&self) -> &SubpulseSignals {
        self.signals
    }
}

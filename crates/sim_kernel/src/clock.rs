//! Simulated clock.

use serde::{Deserialize, Serialize};

/// Monotonic simulated time, in whole seconds since the start of the game.
///
/// Only the time engine advances it. The one way back is [`SimClock::restore`],
/// used when a saved game is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    elapsed_secs: u64,
    subpulses: u64,
}

impl SimClock {
    /// A clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds of simulated time elapsed.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.elapsed_secs
    }

    /// Total subpulses run since start (or since the last restore).
    #[must_use]
    pub fn subpulses(&self) -> u64 {
        self.subpulses
    }

    /// Advance by one subpulse of `secs` seconds. Returns the new time.
    pub fn advance(&mut self, secs: u64) -> u64 {
        self.elapsed_secs = self.elapsed_secs.saturating_add(secs);
        self.subpulses += 1;
        self.elapsed_secs
    }

    /// Reset the clock to a loaded game's timestamp.
    pub fn restore(&mut self, elapsed_secs: u64) {
        self.elapsed_secs = elapsed_secs;
        self.subpulses = 0;
    }
}

//! Kernel configuration.

/// Default timestep, in seconds.
pub const DEFAULT_TIMESTEP_SECS: u64 = 5;

/// Configuration for the time-advancement engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// The minimum timestep. Advance requests are rounded down to a multiple
    /// of it, and it is the default (and longest) subpulse length. Phases can
    /// only ever shorten a subpulse below it.
    pub timestep_secs: u64,
}

impl KernelConfig {
    /// Default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timestep_secs: DEFAULT_TIMESTEP_SECS,
        }
    }

    /// Override the timestep. Zero is raised to one second.
    #[must_use]
    pub fn with_timestep(mut self, secs: u64) -> Self {
        self.timestep_secs = secs.max(1);
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

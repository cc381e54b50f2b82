//! Command-line arguments.

use std::time::Duration;

use clap::Parser;
use sim_kernel::KernelConfig;
use sim_kernel::config::DEFAULT_TIMESTEP_SECS;
use sim_net::connection::{DEFAULT_NATS_URL, NATS_URL_ENV};

use crate::dispatch::{DispatchConfig, UnrecognizedPolicy};
use crate::phases::DEFAULT_CONTACT_RANGE_M;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "sim_app=info,sim_kernel=info,sim_net=info";

#[derive(Debug, Clone, Parser)]
#[command(name = "sim_app", about = "Turn-based simulation kernel driven over NATS")]
pub struct Args {
    /// Minimum timestep in seconds; advances are rounded down to a multiple of it
    #[arg(long, default_value_t = DEFAULT_TIMESTEP_SECS)]
    pub timestep: u64,

    /// How long the idle dispatch loop blocks before re-polling, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub idle_wait_ms: u64,

    /// Stop on an unrecognized message type instead of rejecting it
    #[arg(long)]
    pub halt_on_unrecognized: bool,

    /// Number of factions in the generated world
    #[arg(long, default_value_t = 2)]
    pub factions: usize,

    /// Detection range between craft of different factions, in metres
    #[arg(long, default_value_t = DEFAULT_CONTACT_RANGE_M)]
    pub contact_range: f64,

    /// NATS server URL
    #[arg(long, env = NATS_URL_ENV, default_value = DEFAULT_NATS_URL)]
    pub nats_url: String,

    /// Advance this many seconds locally, print the report, and exit
    #[arg(long, allow_negative_numbers = true)]
    pub advance: Option<i64>,
}

impl Args {
    /// Kernel settings from the command line.
    #[must_use]
    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig::new().with_timestep(self.timestep)
    }

    /// Dispatch loop settings from the command line.
    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            idle_wait: Duration::from_millis(self.idle_wait_ms),
            unrecognized: if self.halt_on_unrecognized {
                UnrecognizedPolicy::Halt
            } else {
                UnrecognizedPolicy::Skip
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sim_app"]).unwrap();
        assert_eq!(args.kernel_config(), KernelConfig::default());
        assert_eq!(args.dispatch_config(), DispatchConfig::default());
        assert_eq!(args.factions, 2);
        assert_eq!(args.advance, None);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "sim_app",
            "--timestep",
            "60",
            "--idle-wait-ms",
            "5",
            "--halt-on-unrecognized",
            "--advance",
            "-10",
        ])
        .unwrap();
        assert_eq!(args.kernel_config().timestep_secs, 60);
        let dispatch = args.dispatch_config();
        assert_eq!(dispatch.idle_wait, Duration::from_millis(5));
        assert_eq!(dispatch.unrecognized, UnrecognizedPolicy::Halt);
        assert_eq!(args.advance, Some(-10));
    }
}

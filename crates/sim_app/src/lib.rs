//! # sim_app
//!
//! Drives the simulation kernel: demo world content, the standard phase
//! pipeline, and the command dispatch loop that consumes faction queues.

pub mod cli;
pub mod components;
pub mod dispatch;
pub mod phases;
pub mod session;
pub mod world;

use sim_component::Entity;
use sim_kernel::{Kernel, KernelConfig, Store};

pub use dispatch::{
    AcceptAll, DispatchConfig, DispatchError, DispatchLoop, DispatchSummary, MessageValidator,
    PollOutcome, StopHandle, UnrecognizedPolicy,
};
pub use session::{BridgeTask, supervise};

/// Build a kernel over a freshly seeded world with the standard pipeline.
/// Returns the kernel and its factions in ascending id order.
///
/// # Errors
///
/// Returns an error if the pipeline or the world cannot be built.
pub fn build_kernel(
    config: KernelConfig,
    factions: usize,
    contact_range_m: f64,
) -> anyhow::Result<(Kernel, Vec<Entity>)> {
    let phases = phases::standard_pipeline(contact_range_m)?;
    let mut store = Store::new();
    let factions = world::seed(&mut store, factions)?;
    Ok((Kernel::with_store(config, phases, store), factions))
}

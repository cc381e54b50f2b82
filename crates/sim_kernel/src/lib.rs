//! # sim_kernel
//!
//! The simulation kernel: it owns all mutable world state, advances simulated
//! time in bounded subpulses, and runs the registered phases once per
//! subpulse.
//!
//! This crate provides:
//!
//! - [`Store`]: entity/component database queried by type and by entity.
//! - [`SubpulseSignals`]: shorten-only subpulse limit and interrupt flag.
//! - [`Phase`] / [`PhaseProcessor`]: the fixed, ordered phase pipeline.
//! - [`TimeEngine`]: subpulse negotiation and the advance loop.
//! - [`Kernel`]: the context object bundling store, engine and config.
//!
//! ## Usage
//!
//! ```rust
//! use sim_kernel::{Kernel, KernelConfig, PhaseProcessor};
//!
//! let mut phases = PhaseProcessor::new();
//! phases
//!     .register_fn("movement", |ctx, elapsed| {
//!         let _ = (ctx.now, elapsed);
//!     })
//!     .unwrap();
//!
//! let mut kernel = Kernel::new(KernelConfig::new().with_timestep(5), phases);
//! let report = kernel.advance(60).unwrap();
//! assert_eq!(report.advanced_secs, 60);
//! ```

pub mod clock;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod phase;
pub mod signal;
pub mod store;

pub use clock::SimClock;
pub use config::KernelConfig;
pub use context::PhaseContext;
pub use engine::{AdvanceReport, TimeEngine};
pub use error::{PhaseError, StoreError};
pub use kernel::{Kernel, SharedStore, StoreObserver};
pub use phase::{FnPhase, Phase, PhaseProcessor};
pub use signal::SubpulseSignals;
pub use store::{ColumnMut, Store};

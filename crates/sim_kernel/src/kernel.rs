//! The kernel context object.
//!
//! [`Kernel`] is constructed once at startup and threaded through everything
//! that needs the world: it owns the store and the time engine. The store sits
//! behind a reader/writer lock so read-only observers (a UI, the bridge) can
//! inspect it between advances, while every advance holds the write lock from
//! its first subpulse to its last.

use std::sync::{Arc, RwLock};

use tracing::info;

use crate::clock::SimClock;
use crate::config::KernelConfig;
use crate::engine::{AdvanceReport, TimeEngine};
use crate::error::StoreError;
use crate::phase::PhaseProcessor;
use crate::signal::SubpulseSignals;
use crate::store::Store;

/// The store as shared between the kernel and its observers.
pub type SharedStore = Arc<RwLock<Store>>;

/// One running simulation.
#[derive(Debug)]
pub struct Kernel {
    store: SharedStore,
    engine: TimeEngine,
}

impl Kernel {
    /// Build a kernel with an empty store. The phase pipeline is sealed.
    #[must_use]
    pub fn new(config: KernelConfig, phases: PhaseProcessor) -> Self {
        Self::with_store(config, phases, Store::new())
    }

    /// Build a kernel around a pre-populated store.
    #[must_use]
    pub fn with_store(config: KernelConfig, phases: PhaseProcessor, store: Store) -> Self {
        let engine = TimeEngine::new(&config, phases);
        info!(
            timestep_secs = engine.timestep_secs(),
            phases = engine.phases().len(),
            entities = store.entity_count(),
            "kernel initialised"
        );
        Self {
            store: Arc::new(RwLock::new(store)),
            engine,
        }
    }

    /// The current simulated time.
    #[must_use]
    pub fn clock(&self) -> SimClock {
        self.engine.clock()
    }

    /// The subpulse signals phases use during an advance.
    #[must_use]
    pub fn signals(&self) -> Arc<SubpulseSignals> {
        self.engine.signals()
    }

    /// The time engine driving the phase pipeline.
    #[must_use]
    pub fn engine(&self) -> &TimeEngine {
        &self.engine
    }

    /// Reset the clock for a loaded game.
    pub fn restore_clock(&mut self, elapsed_secs: u64) {
        self.engine.restore_clock(elapsed_secs);
    }

    /// Advance the simulation with exclusive access to the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the store lock is poisoned.
    pub fn advance(&mut self, requested_secs: i64) -> Result<AdvanceReport, StoreError> {
        let mut store = self.store.write().map_err(|_| StoreError::Poisoned)?;
        Ok(self.engine.advance_detailed(&mut store, requested_secs))
    }

    /// Run `f` with read access to the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the store lock is poisoned.
    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> Result<R, StoreError> {
        let store = self.store.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&store))
    }

    /// Run `f` with write access to the store, outside of any advance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the store lock is poisoned.
    pub fn write<R>(&self, f: impl FnOnce(&mut Store) -> R) -> Result<R, StoreError> {
        let mut store = self.store.write().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut store))
    }

    /// A read-only handle on the store that may outlive this borrow.
    #[must_use]
    pub fn observer(&self) -> StoreObserver {
        StoreObserver {
            store: Arc::clone(&self.store),
        }
    }
}

/// Read-only access to the store from outside the simulation thread.
///
/// Reads block while an advance is in progress, so an observer never sees a
/// store mid-mutation.
#[derive(Debug, Clone)]
pub struct StoreObserver {
    store: SharedStore,
}

impl StoreObserver {
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the store lock is poisoned.
    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> Result<R, StoreError> {
        let store = self.store.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&store))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use sim_component::Component;

    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Counter(u64);

    impl Component for Counter {
        fn type_name() -> &'static str {
            "Counter"
        }
    }

    fn counting_kernel() -> (Kernel, sim_component::Entity) {
        let mut phases = PhaseProcessor::new();
        phases
            .register_fn("count", |ctx, elapsed| {
                if let Some(mut column) = ctx.store.column_mut::<Counter>() {
                    for (_, counter) in column.iter_mut() {
                        counter.0 += elapsed;
                    }
                }
            })
            .unwrap();
        let kernel = Kernel::new(KernelConfig::new().with_timestep(10), phases);
        let entity = kernel
            .write(|store| {
                let e = store.create_entity();
                store.set_component(e, Counter(0)).map(|()| e)
            })
            .unwrap()
            .unwrap();
        (kernel, entity)
    }

    #[test]
    fn test_advance_mutates_store() {
        let (mut kernel, entity) = counting_kernel();
        let report = kernel.advance(35).unwrap();
        assert_eq!(report.advanced_secs, 30);
        assert_eq!(report.subpulses, 3);
        assert_eq!(kernel.clock().now(), 30);

        let counter = kernel
            .read(|store| store.get_component::<Counter>(entity).cloned())
            .unwrap();
        assert_eq!(counter, Some(Counter(30)));
    }

    #[test]
    fn test_observer_reads_from_other_thread() {
        let (mut kernel, entity) = counting_kernel();
        kernel.advance(20).unwrap();

        let observer = kernel.observer();
        let seen = thread::spawn(move || {
            observer
                .read(|store| store.get_component::<Counter>(entity).cloned())
                .unwrap()
        })
        .join()
        .unwrap();
        assert_eq!(seen, Some(Counter(20)));
    }

    #[test]
    fn test_signals_shared_with_engine() {
        let (kernel, _) = counting_kernel();
        kernel.signals().request_subpulse(3);
        assert_eq!(kernel.engine().signals().subpulse_limit(), Some(3));
    }
}

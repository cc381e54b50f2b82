//! Phase trait and the ordered phase pipeline.
//!
//! A phase is one unit of per-subpulse simulation logic (movement,
//! production, combat resolution, ...). The [`PhaseProcessor`] runs every
//! registered phase once per subpulse, strictly in registration order. The
//! order is fixed when the pipeline is initialised and never changes based on
//! runtime state.

use tracing::{debug, info, warn};

use crate::context::PhaseContext;
use crate::error::PhaseError;

/// The contract every phase fulfils.
pub trait Phase: Send {
    /// Unique stable name, used for logging and duplicate detection.
    fn name(&self) -> &str;

    /// Run once per subpulse.
    ///
    /// `elapsed_secs` is the length of the subpulse that just elapsed. All
    /// effects go through the store and the context's signals. A phase must
    /// return within bounded time; the kernel cannot pre-empt it.
    fn process(&mut self, ctx: &mut PhaseContext<'_>, elapsed_secs: u64);
}

/// Adapts a closure into a [`Phase`].
pub struct FnPhase<F> {
    name: String,
    f: F,
}

impl<F> FnPhase<F>
where
    F: FnMut(&mut PhaseContext<'_>, u64) + Send,
{
    /// Wrap `f` as a phase called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Phase for FnPhase<F>
where
    F: FnMut(&mut PhaseContext<'_>, u64) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut PhaseContext<'_>, elapsed_secs: u64) {
        (self.f)(ctx, elapsed_secs);
    }
}

/// Ordered registry of phases.
#[derive(Default)]
pub struct PhaseProcessor {
    phases: Vec<Box<dyn Phase>>,
    initialized: bool,
}

impl PhaseProcessor {
    /// An empty, unsealed pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a phase to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::AlreadyInitialized`] once [`initialize`] has run,
    /// or [`PhaseError::DuplicatePhase`] if the name is taken.
    ///
    /// [`initialize`]: PhaseProcessor::initialize
    pub fn register(&mut self, phase: Box<dyn Phase>) -> Result<(), PhaseError> {
        let name = phase.name().to_string();
        if self.initialized {
            return Err(PhaseError::AlreadyInitialized { name });
        }
        if self.phases.iter().any(|p| p.name() == name) {
            return Err(PhaseError::DuplicatePhase(name));
        }
        debug!(phase = name, position = self.phases.len(), "phase registered");
        self.phases.push(phase);
        Ok(())
    }

    /// Register a closure as a phase.
    ///
    /// # Errors
    ///
    /// Same as [`PhaseProcessor::register`].
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> Result<(), PhaseError>
    where
        F: FnMut(&mut PhaseContext<'_>, u64) + Send + 'static,
    {
        self.register(Box::new(FnPhase::new(name, f)))
    }

    /// Seal the pipeline. Further registrations are rejected. Idempotent.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        info!(pipeline = ?self.names(), "phase pipeline initialised");
    }

    /// Returns `true` once the pipeline is sealed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run every phase, in order, for one subpulse of `elapsed_secs`.
    pub fn process(&mut self, ctx: &mut PhaseContext<'_>, elapsed_secs: u64) {
        if !self.initialized {
            warn!("phase pipeline processed before initialisation; sealing it now");
            self.initialize();
        }
        for phase in &mut self.phases {
            phase.process(ctx, elapsed_secs);
        }
    }

    /// Phase names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    /// Number of registered phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Returns `true` if no phase is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

impl std::fmt::Debug for PhaseProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseProcessor")
            .field("phases", &self.names())
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::signal::SubpulseSignals;
    use crate::store::Store;

    fn recording_phase(name: &'static str, log: Arc<Mutex<Vec<(String, u64)>>>) -> Box<dyn Phase> {
        Box::new(FnPhase::new(name, move |_ctx: &mut PhaseContext<'_>, elapsed| {
            log.lock().unwrap().push((name.to_string(), elapsed));
        }))
    }

    #[test]
    fn test_phases_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut processor = PhaseProcessor::new();
        for name in ["movement", "production", "combat"] {
            processor.register(recording_phase(name, Arc::clone(&log))).unwrap();
        }
        processor.initialize();

        let mut store = Store::new();
        let signals = SubpulseSignals::new();
        let mut ctx = PhaseContext::new(&mut store, &signals, 5, 0);
        processor.process(&mut ctx, 5);

        let log = log.lock().unwrap();
        let names: Vec<&str> = log.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["movement", "production", "combat"]);
        assert!(log.iter().all(|(_, elapsed)| *elapsed == 5));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut processor = PhaseProcessor::new();
        processor.register_fn("movement", |_, _| {}).unwrap();
        assert_eq!(
            processor.register_fn("movement", |_, _| {}),
            Err(PhaseError::DuplicatePhase("movement".into()))
        );
        assert_eq!(processor.len(), 1);
    }

    #[test]
    fn test_register_after_initialize_rejected() {
        let mut processor = PhaseProcessor::new();
        processor.register_fn("movement", |_, _| {}).unwrap();
        processor.initialize();
        assert!(processor.is_initialized());
        assert_eq!(
            processor.register_fn("late", |_, _| {}),
            Err(PhaseError::AlreadyInitialized {
                name: "late".into()
            })
        );
        assert_eq!(processor.names(), vec!["movement"]);
    }

    #[test]
    fn test_process_seals_uninitialised_pipeline() {
        let mut processor = PhaseProcessor::new();
        processor.register_fn("movement", |_, _| {}).unwrap();

        let mut store = Store::new();
        let signals = SubpulseSignals::new();
        let mut ctx = PhaseContext::new(&mut store, &signals, 1, 0);
        processor.process(&mut ctx, 1);
        assert!(processor.is_initialized());
    }

    #[test]
    fn test_phase_mutates_store() {
        let mut processor = PhaseProcessor::new();
        processor
            .register_fn("spawner", |ctx, _| {
                ctx.store.create_entity();
            })
            .unwrap();
        processor.initialize();

        let mut store = Store::new();
        let signals = SubpulseSignals::new();
        for subpulse in 0..3 {
            let mut ctx = PhaseContext::new(&mut store, &signals, subpulse, subpulse);
            processor.process(&mut ctx, 1);
        }
        assert_eq!(store.entity_count(), 3);
    }
}

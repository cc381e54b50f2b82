//! Kernel error types.

use sim_component::Entity;

/// Errors returned by the entity/component store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The entity was never issued, or has been removed.
    #[error("unknown entity: {0}")]
    UnknownEntity(Entity),

    /// Two distinct Rust types registered the same component name.
    #[error("component type mismatch for '{name}'")]
    ComponentTypeMismatch { name: &'static str },

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors raised while building the phase pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// The pipeline is sealed once initialised.
    #[error("cannot register phase '{name}': pipeline already initialised")]
    AlreadyInitialized { name: String },

    #[error("phase '{0}' is already registered")]
    DuplicatePhase(String),
}

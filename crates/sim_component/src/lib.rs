//! # sim_component
//!
//! The data vocabulary of the simulation kernel: what an entity is, what a
//! component is, and how instances of one component type are stored.
//!
//! This crate provides:
//!
//! - [`Component`] trait: the contract every world-state record satisfies.
//! - [`ComponentTypeId`]: FNV-1a 64-bit hash of the component name.
//! - [`Entity`] / [`EntityAllocator`]: monotonically issued identifiers.
//! - [`Column`] / [`ErasedColumn`]: dense per-type storage.
//! - [`BoxedComponent`] / [`ComponentRecord`]: erased and serialised values.

pub mod column;
pub mod component;
pub mod entity;

pub use column::{Column, ErasedColumn};
pub use component::{BoxedComponent, Component, ComponentRecord, ComponentTypeId, ErasedComponent};
pub use entity::{Entity, EntityAllocator};

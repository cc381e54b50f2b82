//! Core [`Component`] trait, type identity, and type-erased component values.
//!
//! Every record stored against an entity implements [`Component`]. The store
//! keys its columns by [`ComponentTypeId`], which is derived from the
//! component's string name with FNV-1a 64-bit, so the same id can be computed
//! by an external actor that only knows the name.
//!
//! [`BoxedComponent`] carries a component whose concrete type is not known
//! statically. It is what batch entity creation consumes and what
//! `components_of` style queries return.

use std::any::Any;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::column::{Column, ErasedColumn};
use crate::entity::Entity;

/// A unique identifier for a component type, derived from its name using the
/// FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Hash a component name into its type id.
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// The id of component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

/// A plain-data record attached to an entity.
///
/// Components carry no behaviour. Phases fetch them from the store, mutate
/// them (in place or by re-storing a new value) and move on. Each entity holds
/// at most one instance of a given component type.
///
/// # Examples
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use sim_component::Component;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Population {
///     count: u64,
/// }
///
/// impl Component for Population {
///     fn type_name() -> &'static str { "Population" }
/// }
/// ```
pub trait Component: Clone + Send + Sync + 'static + Serialize + DeserializeOwned {
    /// A stable, human-readable name. Two component types must never share one.
    fn type_name() -> &'static str;

    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}

/// Object-safe view of a [`Component`], implemented for every component type.
pub trait ErasedComponent: Any + Send + Sync {
    fn component_id(&self) -> ComponentTypeId;

    fn component_name(&self) -> &'static str;

    fn clone_boxed(&self) -> BoxedComponent;

    /// Serialise the value to MessagePack (named fields).
    fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error>;

    /// Create an empty column able to hold values of this component's type.
    fn new_column(&self) -> Box<dyn ErasedColumn>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Component> ErasedComponent for T {
    fn component_id(&self) -> ComponentTypeId {
        <T as Component>::component_type_id()
    }

    fn component_name(&self) -> &'static str {
        T::type_name()
    }

    fn clone_boxed(&self) -> BoxedComponent {
        BoxedComponent::new(self.clone())
    }

    fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    fn new_column(&self) -> Box<dyn ErasedColumn> {
        Box::new(Column::<T>::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An owned component value whose concrete type is erased.
pub struct BoxedComponent(Box<dyn ErasedComponent>);

impl BoxedComponent {
    /// Box a component value.
    #[must_use]
    pub fn new<T: Component>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// The id of the boxed component type.
    #[must_use]
    pub fn type_id(&self) -> ComponentTypeId {
        self.0.component_id()
    }

    /// The name of the boxed component type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.0.component_name()
    }

    /// Returns `true` if the boxed value is a `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    /// Borrow the boxed value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Unwrap into the concrete type, or `None` on a type mismatch.
    #[must_use]
    pub fn downcast<T: Component>(self) -> Option<T> {
        self.0.into_any().downcast::<T>().ok().map(|value| *value)
    }

    /// Create an empty column for this value's component type.
    #[must_use]
    pub fn new_column(&self) -> Box<dyn ErasedColumn> {
        self.0.new_column()
    }

    /// Serialise into a [`ComponentRecord`] for shipping to external actors.
    ///
    /// # Errors
    ///
    /// Returns an error if MessagePack encoding fails.
    pub fn to_record(&self, entity: Entity) -> Result<ComponentRecord, rmp_serde::encode::Error> {
        Ok(ComponentRecord {
            entity,
            type_id: self.type_id(),
            type_name: self.type_name().to_string(),
            data: self.0.encode()?,
        })
    }
}

impl Clone for BoxedComponent {
    fn clone(&self) -> Self {
        self.0.clone_boxed()
    }
}

impl std::fmt::Debug for BoxedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxedComponent")
            .field(&self.type_name())
            .finish()
    }
}

/// A component serialised for transport, tagged with its owner and type.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComponentRecord {
    pub entity: Entity,
    pub type_id: ComponentTypeId,
    pub type_name: String,
    /// MessagePack-encoded component value.
    pub data: Vec<u8>,
}

impl ComponentRecord {
    /// Decode the payload as `T`, if the record holds a `T`.
    #[must_use]
    pub fn decode<T: Component>(&self) -> Option<T> {
        if self.type_id != T::component_type_id() {
            return None;
        }
        rmp_serde::from_slice(&self.data).ok()
    }
}

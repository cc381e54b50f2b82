//! Entity identifiers and their allocator.
//!
//! An [`Entity`] is an opaque `u64` key into the store. It carries no data;
//! everything an entity "is" comes from the components attached to it.

use serde::{Deserialize, Serialize};

/// An opaque entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// The null entity. Never handed out by an [`EntityAllocator`].
    pub const INVALID: Entity = Entity(0);

    /// Wrap a raw id, as read from the wire.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is [`Entity::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Issues entity identifiers in strictly increasing order.
///
/// Identifiers are never recycled: once an entity is removed its id stays
/// retired, so a stale id held by a caller can only ever miss, never alias a
/// newer entity.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. The first id issued is 1.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Issue the next unused entity id.
    pub fn allocate(&mut self) -> Entity {
        let id = self.next_id;
        self.next_id += 1;
        Entity(id)
    }

    /// Number of identifiers issued so far, including retired ones.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next_id - 1
    }

    /// Returns `true` if `entity` was issued by this allocator at some point.
    #[must_use]
    pub fn was_issued(&self, entity: Entity) -> bool {
        entity.is_valid() && entity.0 < self.next_id
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

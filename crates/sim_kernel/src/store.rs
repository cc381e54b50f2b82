//! Entity/component store.
//!
//! The [`Store`] is the single source of truth for mutable world state. It
//! keeps two indices that must agree after every mutation:
//!
//! - the **type index**: one [`Column`] per [`ComponentTypeId`], answering
//!   "which entities hold a `T`";
//! - the **entity index**: the set of component types attached to each live
//!   entity, answering "what does entity `e` hold" and "is `e` alive".
//!
//! Every mutating method updates both indices before returning, so there is
//! no window in which one has diverged from the other. Query results are
//! owned snapshots: mutating the store afterwards never changes a set the
//! caller already holds. Only [`Store::get_component_mut`] and
//! [`Store::column_mut`] hand out references into live storage.

use std::collections::{BTreeSet, HashMap};

use sim_component::{
    BoxedComponent, Column, Component, ComponentTypeId, Entity, EntityAllocator, ErasedColumn,
};
use tracing::trace;

use crate::error::StoreError;

/// Generic world-state database keyed by entity and by component type.
pub struct Store {
    allocator: EntityAllocator,
    /// Type index.
    columns: HashMap<ComponentTypeId, Box<dyn ErasedColumn>>,
    /// Entity index. An entity is alive iff it has an entry here.
    entities: HashMap<Entity, BTreeSet<ComponentTypeId>>,
}

impl Store {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            columns: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    // -- Entity lifecycle --

    /// Allocate a fresh entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.entities.insert(entity, BTreeSet::new());
        trace!(%entity, "entity created");
        entity
    }

    /// Allocate an entity and attach every component in `components`.
    ///
    /// Nothing is attached unless everything can be: column compatibility is
    /// checked for the whole batch before the entity is made visible. If the
    /// batch holds the same component type twice, the later value wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ComponentTypeMismatch`] if a component's name is
    /// already bound to a different Rust type.
    pub fn create_entity_with(
        &mut self,
        components: Vec<BoxedComponent>,
    ) -> Result<Entity, StoreError> {
        for value in &components {
            let column = self
                .columns
                .entry(value.type_id())
                .or_insert_with(|| value.new_column());
            if !column.accepts(value) {
                return Err(StoreError::ComponentTypeMismatch {
                    name: value.type_name(),
                });
            }
        }

        let entity = self.allocator.allocate();
        let mut types = BTreeSet::new();
        for value in components {
            let type_id = value.type_id();
            if let Some(column) = self.columns.get_mut(&type_id)
                && column.insert_boxed(entity, value).is_ok()
            {
                types.insert(type_id);
            }
        }
        trace!(%entity, components = types.len(), "entity created with components");
        self.entities.insert(entity, types);
        Ok(entity)
    }

    /// Detach every component of `entity` and retire its identifier.
    ///
    /// Retired identifiers are never issued again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownEntity`] if `entity` is not alive.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<(), StoreError> {
        let types = self
            .entities
            .remove(&entity)
            .ok_or(StoreError::UnknownEntity(entity))?;
        for type_id in &types {
            if let Some(column) = self.columns.get_mut(type_id) {
                column.remove_entity(entity);
            }
        }
        trace!(%entity, components = types.len(), "entity removed");
        Ok(())
    }

    /// Returns `true` if `entity` exists.
    #[must_use]
    pub fn contains_entity(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// All live entities, in ascending id order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let mut all: Vec<Entity> = self.entities.keys().copied().collect();
        all.sort_unstable();
        all
    }

    // -- Component operations --

    /// Attach `value` to `entity`, overwriting any existing `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownEntity`] if `entity` is not alive, or
    /// [`StoreError::ComponentTypeMismatch`] on a component name collision.
    pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), StoreError> {
        let types = self
            .entities
            .get_mut(&entity)
            .ok_or(StoreError::UnknownEntity(entity))?;
        let type_id = T::component_type_id();
        let column = self
            .columns
            .entry(type_id)
            .or_insert_with(|| Box::new(Column::<T>::new()))
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .ok_or(StoreError::ComponentTypeMismatch {
                name: T::type_name(),
            })?;
        column.insert(entity, value);
        types.insert(type_id);
        Ok(())
    }

    /// Attach a type-erased component to `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`Store::set_component`].
    pub fn set_boxed(&mut self, entity: Entity, value: BoxedComponent) -> Result<(), StoreError> {
        let types = self
            .entities
            .get_mut(&entity)
            .ok_or(StoreError::UnknownEntity(entity))?;
        let type_id = value.type_id();
        let name = value.type_name();
        let column = self
            .columns
            .entry(type_id)
            .or_insert_with(|| value.new_column());
        column
            .insert_boxed(entity, value)
            .map_err(|_| StoreError::ComponentTypeMismatch { name })?;
        types.insert(type_id);
        Ok(())
    }

    /// The `T` attached to `entity`, or `None` if either is absent.
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.column::<T>()?.get(entity)
    }

    /// Mutable access to the live `T` on `entity`.
    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.columns
            .get_mut(&T::component_type_id())?
            .as_any_mut()
            .downcast_mut::<Column<T>>()?
            .get_mut(entity)
    }

    /// Returns `true` if `entity` holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|types| types.contains(&T::component_type_id()))
    }

    /// Detach and return the `T` on `entity`. A no-op if there is none.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let type_id = T::component_type_id();
        let types = self.entities.get_mut(&entity)?;
        if !types.remove(&type_id) {
            return None;
        }
        self.columns
            .get_mut(&type_id)?
            .as_any_mut()
            .downcast_mut::<Column<T>>()?
            .remove(entity)
    }

    // -- Queries --

    /// Every entity currently holding a `T`.
    #[must_use]
    pub fn entities_with<T: Component>(&self) -> BTreeSet<Entity> {
        self.columns
            .get(&T::component_type_id())
            .map(|column| column.entities().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every entity holding all of `required`. An empty filter matches every
    /// live entity.
    #[must_use]
    pub fn entities_with_all(&self, required: &[ComponentTypeId]) -> BTreeSet<Entity> {
        self.entities
            .iter()
            .filter(|(_, types)| required.iter().all(|ty| types.contains(ty)))
            .map(|(&entity, _)| entity)
            .collect()
    }

    /// Clones of every component on `entity`, ordered by type id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownEntity`] if `entity` is not alive.
    pub fn components_of(&self, entity: Entity) -> Result<Vec<BoxedComponent>, StoreError> {
        let types = self
            .entities
            .get(&entity)
            .ok_or(StoreError::UnknownEntity(entity))?;
        Ok(types
            .iter()
            .filter_map(|type_id| self.columns.get(type_id)?.get_boxed(entity))
            .collect())
    }

    /// The component types attached to `entity`.
    #[must_use]
    pub fn component_types_of(&self, entity: Entity) -> Option<&BTreeSet<ComponentTypeId>> {
        self.entities.get(&entity)
    }

    /// Typed read access to the whole `T` column.
    #[must_use]
    pub fn column<T: Component>(&self) -> Option<&Column<T>> {
        self.columns
            .get(&T::component_type_id())?
            .as_any()
            .downcast_ref::<Column<T>>()
    }

    /// Typed write access to the whole `T` column, for phases that update
    /// every instance in one pass. Values may be mutated in place; the set of
    /// entities in the column cannot be changed through this reference.
    #[must_use]
    pub fn column_mut<T: Component>(&mut self) -> Option<ColumnMut<'_, T>> {
        self.columns
            .get_mut(&T::component_type_id())?
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .map(ColumnMut)
    }

    /// Verify that the type index and the entity index agree.
    #[must_use]
    pub fn check_consistency(&self) -> bool {
        let columns_agree = self.columns.iter().all(|(type_id, column)| {
            column.entities().iter().all(|entity| {
                self.entities
                    .get(entity)
                    .is_some_and(|types| types.contains(type_id))
            })
        });
        let entities_agree = self.entities.iter().all(|(entity, types)| {
            types.iter().all(|type_id| {
                self.columns
                    .get(type_id)
                    .is_some_and(|column| column.contains(*entity))
            })
        });
        columns_agree && entities_agree
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("entities", &self.entities.len())
            .field("columns", &self.columns.len())
            .field("issued", &self.allocator.issued())
            .finish()
    }
}

/// Mutable view of a column that permits in-place value updates only.
pub struct ColumnMut<'a, T>(&'a mut Column<T>);

impl<T: Component> ColumnMut<'_, T> {
    /// Mutable access to the value stored for `entity`.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.0.get_mut(entity)
    }

    /// Iterate values mutably in row order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.0.iter_mut()
    }
}

impl<T> std::ops::Deref for ColumnMut<'_, T> {
    type Target = Column<T>;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

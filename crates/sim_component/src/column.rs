//! Per-type column storage.
//!
//! A [`Column`] stores every instance of one component type densely, with a
//! parallel entity vector and an entity-to-row map. Removal swap-removes the
//! row and patches the row of the entity that was moved into the hole, so
//! both vectors stay packed.
//!
//! The store holds columns behind [`ErasedColumn`] so it can keep one map of
//! columns regardless of their concrete component type.

use std::any::Any;
use std::collections::HashMap;

use crate::component::{BoxedComponent, Component, ComponentTypeId};
use crate::entity::Entity;

/// Dense storage for all instances of component type `T`.
#[derive(Debug, Clone)]
pub struct Column<T> {
    /// `entities[i]` owns `values[i]`.
    entities: Vec<Entity>,
    values: Vec<T>,
    rows: HashMap<Entity, usize>,
}

impl<T: Component> Column<T> {
    /// An empty column.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            values: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity has a value here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if `entity` has a value in this column.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Insert or overwrite the value for `entity`, returning the old value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(&row) = self.rows.get(&entity) {
            return Some(std::mem::replace(&mut self.values[row], value));
        }
        self.rows.insert(entity, self.entities.len());
        self.entities.push(entity);
        self.values.push(value);
        None
    }

    /// Remove the value for `entity`, if present.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let row = self.rows.remove(&entity)?;
        self.entities.swap_remove(row);
        let value = self.values.swap_remove(row);
        // The former last row now lives at `row`.
        if let Some(&moved) = self.entities.get(row) {
            self.rows.insert(moved, row);
        }
        Some(value)
    }

    /// The value stored for `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.rows.get(&entity).map(|&row| &self.values[row])
    }

    /// Mutable access to the value stored for `entity`.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let row = *self.rows.get(&entity)?;
        Some(&mut self.values[row])
    }

    /// Entities in row order. Row order is not stable across removals.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate values in row order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// Iterate values mutably in row order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T: Component> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased operations over a [`Column`].
pub trait ErasedColumn: Send + Sync {
    fn component_type(&self) -> ComponentTypeId;

    fn component_name(&self) -> &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, entity: Entity) -> bool;

    fn entities(&self) -> &[Entity];

    /// Drop the value for `entity`. Returns `true` if one was present.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Clone the value for `entity` into a [`BoxedComponent`].
    fn get_boxed(&self, entity: Entity) -> Option<BoxedComponent>;

    /// Returns `true` if `value` can be stored in this column.
    fn accepts(&self, value: &BoxedComponent) -> bool;

    /// Insert a boxed value. On a type mismatch the value is handed back.
    fn insert_boxed(&mut self, entity: Entity, value: BoxedComponent) -> Result<(), BoxedComponent>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedColumn for Column<T> {
    fn component_type(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn component_name(&self) -> &'static str {
        T::type_name()
    }

    fn len(&self) -> usize {
        Column::len(self)
    }

    fn contains(&self, entity: Entity) -> bool {
        Column::contains(self, entity)
    }

    fn entities(&self) -> &[Entity] {
        Column::entities(self)
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn get_boxed(&self, entity: Entity) -> Option<BoxedComponent> {
        self.get(entity).map(|value| BoxedComponent::new(value.clone()))
    }

    fn accepts(&self, value: &BoxedComponent) -> bool {
        value.is::<T>()
    }

    fn insert_boxed(&mut self, entity: Entity, value: BoxedComponent) -> Result<(), BoxedComponent> {
        if !value.is::<T>() {
            return Err(value);
        }
        if let Some(value) = value.downcast::<T>() {
            self.insert(entity, value);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Fuel(u32);

    impl Component for Fuel {
        fn type_name() -> &'static str {
            "Fuel"
        }
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Hull(u32);

    impl Component for Hull {
        fn type_name() -> &'static str {
            "Hull"
        }
    }

    fn e(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn test_insert_and_overwrite() {
        let mut col = Column::<Fuel>::new();
        assert_eq!(col.insert(e(1), Fuel(10)), None);
        assert_eq!(col.insert(e(1), Fuel(20)), Some(Fuel(10)));
        assert_eq!(col.len(), 1);
        assert_eq!(col.get(e(1)), Some(&Fuel(20)));
    }

    #[test]
    fn test_swap_remove_patches_moved_row() {
        let mut col = Column::<Fuel>::new();
        col.insert(e(1), Fuel(1));
        col.insert(e(2), Fuel(2));
        col.insert(e(3), Fuel(3));

        assert_eq!(col.remove(e(1)), Some(Fuel(1)));
        assert_eq!(col.len(), 2);
        // Entity 3 was swapped into row 0 and must still resolve.
        assert_eq!(col.get(e(3)), Some(&Fuel(3)));
        assert_eq!(col.get(e(2)), Some(&Fuel(2)));
        assert!(!col.contains(e(1)));
        assert_eq!(col.remove(e(1)), None);
    }

    #[test]
    fn test_remove_last_row() {
        let mut col = Column::<Fuel>::new();
        col.insert(e(5), Fuel(5));
        assert_eq!(col.remove(e(5)), Some(Fuel(5)));
        assert!(col.is_empty());
    }

    #[test]
    fn test_get_mut_aliases_storage() {
        let mut col = Column::<Fuel>::new();
        col.insert(e(1), Fuel(1));
        if let Some(fuel) = col.get_mut(e(1)) {
            fuel.0 = 99;
        }
        assert_eq!(col.get(e(1)), Some(&Fuel(99)));
    }

    #[test]
    fn test_erased_insert_rejects_wrong_type() {
        let mut col: Box<dyn ErasedColumn> = Box::new(Column::<Fuel>::new());
        let rejected = col.insert_boxed(e(1), BoxedComponent::new(Hull(4)));
        assert!(rejected.is_err());
        assert!(col.is_empty());
        assert!(!col.accepts(&BoxedComponent::new(Hull(4))));
        assert!(col.accepts(&BoxedComponent::new(Fuel(0))));

        assert!(col.insert_boxed(e(1), BoxedComponent::new(Fuel(4))).is_ok());
        assert_eq!(col.component_name(), "Fuel");
        let boxed = col.get_boxed(e(1)).unwrap();
        assert_eq!(boxed.downcast_ref::<Fuel>(), Some(&Fuel(4)));
        assert!(col.remove_entity(e(1)));
        assert!(!col.remove_entity(e(1)));
    }

    #[test]
    fn test_downcast_erased_column() {
        let col: Box<dyn ErasedColumn> = BoxedComponent::new(Hull(1)).new_column();
        assert_eq!(col.component_type(), Hull::component_type_id());
        assert!(col.as_any().downcast_ref::<Column<Hull>>().is_some());
    }
}

//! Storage of entities and their components.
//!
//! Each component kind lives in its own [`ComponentTable`], a slot vector indexed by the
//! entity's index. Access is statically typed through the [`Component`] trait; there is no
//! runtime type lookup, so reading or mutating a component is an array access plus a
//! generation check.

use core::fmt;

use crate::physics::{Body, Collider, Transform};

// -------------------------------------------------------------------------------------------------

/// Identifies an entity in an [`EntityStore`].
///
/// An id carries a generation counter, so an id of a destroyed entity is never mistaken for
/// an entity which later reuses the same slot.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Returns the slot index of this id. Indices are reused after an entity is destroyed.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error returned when an operation names an entity which does not exist (any more).
#[derive(Clone, Copy, Debug, Eq, PartialEq, displaydoc::Display)]
#[displaydoc("entity {0} does not exist")]
#[expect(clippy::exhaustive_structs)]
pub struct NoSuchEntity(pub EntityId);

impl std::error::Error for NoSuchEntity {}

// -------------------------------------------------------------------------------------------------

/// Storage for one kind of component, indexed by [`EntityId::index()`].
///
/// The table does not check generations; [`EntityStore`] does that before consulting it.
pub struct ComponentTable<T> {
    slots: Vec<Option<T>>,
    count: usize,
}

impl<T> ComponentTable<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            count: 0,
        }
    }

    fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize)?.as_ref()
    }

    fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    fn set(&mut self, index: u32, value: T) -> Option<T> {
        let index = index as usize;
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        let old = self.slots[index].replace(value);
        if old.is_none() {
            self.count += 1;
        }
        old
    }

    fn take(&mut self, index: u32) -> Option<T> {
        let old = self.slots.get_mut(index as usize)?.take();
        if old.is_some() {
            self.count -= 1;
        }
        old
    }

    /// Returns the number of components in the table.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns whether the table holds no components.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<T> fmt::Debug for ComponentTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTable")
            .field("type", &core::any::type_name::<T>())
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

/// A kind of data that may be attached to an entity in an [`EntityStore`].
///
/// Implemented for [`Body`], [`Transform`], and [`Collider`]; each implementation names the
/// table that stores it.
pub trait Component: Sized + sealed::Sealed + 'static {
    #[doc(hidden)]
    fn table(store: &EntityStore) -> &ComponentTable<Self>;
    #[doc(hidden)]
    fn table_mut(store: &mut EntityStore) -> &mut ComponentTable<Self>;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! component {
    ($ty:ty, $field:ident) => {
        impl sealed::Sealed for $ty {}
        impl Component for $ty {
            #[inline]
            fn table(store: &EntityStore) -> &ComponentTable<Self> {
                &store.$field
            }
            #[inline]
            fn table_mut(store: &mut EntityStore) -> &mut ComponentTable<Self> {
                &mut store.$field
            }
        }
    };
}

component!(Body, bodies);
component!(Transform, transforms);
component!(Collider, colliders);

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
struct Slot {
    generation: u32,
    live: bool,
}

/// Container of entities and their components.
///
/// The simulation never creates or destroys entities itself; it only reads components with
/// [`get()`](Self::get) and changes them with [`mutate()`](Self::mutate).
#[derive(Debug)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,

    bodies: ComponentTable<Body>,
    transforms: ComponentTable<Transform>,
    colliders: ComponentTable<Collider>,
}

impl EntityStore {
    /// Constructs an empty store.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            bodies: ComponentTable::new(),
            transforms: ComponentTable::new(),
            colliders: ComponentTable::new(),
        }
    }

    /// Creates a new entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.live = true;
            EntityId {
                index,
                generation: slot.generation,
            }
        } else {
            // Exceeding u32 indices would need more memory than component tables can hold.
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                live: true,
            });
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    /// Destroys an entity and all of its components.
    ///
    /// Returns false if the entity did not exist. Other entities whose
    /// [`Transform::parent`] refers to it are left dangling; the hierarchy walk reports them.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let slot = &mut self.slots[id.index as usize];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.bodies.take(id.index);
        self.transforms.take(id.index);
        self.colliders.take(id.index);
        self.free.push(id.index);
        self.live -= 1;
        true
    }

    /// Returns whether `id` refers to a live entity.
    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.live && slot.generation == id.generation)
    }

    /// Returns the number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns whether there are no live entities.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over the ids of all live entities, in index order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.live.then_some(EntityId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    /// Attaches a component to an entity, returning the component it replaced, if any.
    pub fn insert<T: Component>(&mut self, id: EntityId, value: T) -> Result<Option<T>, NoSuchEntity> {
        if !self.contains(id) {
            return Err(NoSuchEntity(id));
        }
        Ok(T::table_mut(self).set(id.index, value))
    }

    /// Detaches a component from an entity and returns it.
    pub fn remove<T: Component>(&mut self, id: EntityId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        T::table_mut(self).take(id.index)
    }

    /// Returns the component of type `T` of the entity, if both exist.
    #[inline]
    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        if !self.contains(id) {
            return None;
        }
        T::table(self).get(id.index)
    }

    /// Applies `f` to the component of type `T` of the entity, if both exist, and returns
    /// its result.
    ///
    /// This is the only way the simulation changes components.
    #[inline]
    pub fn mutate<T: Component, R>(&mut self, id: EntityId, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if !self.contains(id) {
            return None;
        }
        T::table_mut(self).get_mut(id.index).map(f)
    }

    /// Returns the table of all components of type `T`.
    pub fn table<T: Component>(&self) -> &ComponentTable<T> {
        T::table(self)
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FreePoint, ps64};
    use pretty_assertions::assert_eq;

    #[test]
    fn spawn_insert_get() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        assert_eq!(store.get::<Body>(id), None);
        store.insert(id, Body::new(ps64(2.0))).unwrap();
        assert_eq!(store.get::<Body>(id).map(|b| b.mass), Some(ps64(2.0)));
        assert_eq!(store.table::<Body>().len(), 1);
        assert_eq!(store.table::<Collider>().len(), 0);
    }

    #[test]
    fn mutate_returns_result() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.insert(id, Transform::at(FreePoint::new(1., 2., 3.))).unwrap();
        let y = store.mutate(id, |t: &mut Transform| {
            t.local_position.y += 1.0;
            t.local_position.y
        });
        assert_eq!(y, Some(3.0));
        assert_eq!(store.mutate(id, |_: &mut Body| ()), None);
    }

    #[test]
    fn stale_id_is_rejected() {
        let mut store = EntityStore::new();
        let old = store.spawn();
        store.insert(old, Collider::sphere(ps64(1.0))).unwrap();
        assert!(store.destroy_entity(old));
        assert!(!store.destroy_entity(old));

        let new = store.spawn();
        assert_eq!(new.index(), old.index(), "slot should be reused");
        assert_ne!(new, old);
        assert!(!store.contains(old));
        assert_eq!(store.get::<Collider>(old), None);
        assert_eq!(store.get::<Collider>(new), None, "components must not leak");
        assert_eq!(
            store.insert(old, Collider::sphere(ps64(1.0))),
            Err(NoSuchEntity(old))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ids_lists_live_entities() {
        let mut store = EntityStore::new();
        let a = store.spawn();
        let b = store.spawn();
        let c = store.spawn();
        store.destroy_entity(b);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn id_formatting() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        assert_eq!(format!("{id}"), "#0v0");
        assert_eq!(NoSuchEntity(id).to_string(), "entity #0v0 does not exist");
    }
}

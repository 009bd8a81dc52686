//! Registry of combat entities.
//!
//! The Registry is the canonical collection of every entity in a battle:
//! - Entity storage keyed by id (`BTreeMap`)
//! - Roster order, used for blast adjacency and scheduler tie-breaking
//! - Copy-on-write updates through `Arc<Entity>`
//! - Alive-ally and alive-enemy queries
//!
//! # Architecture
//!
//! Records are stored as `Arc<Entity>`. Cloning the registry clones the map of
//! pointers, not the entities, so every transition can take a cheap snapshot.
//! [`Registry::update`] replaces one record whole: readers holding the old
//! `Arc` keep seeing the old value.
//!
//! Dead entities stay in the registry so the log can still name them. They
//! are filtered out of the `alive_*` queries and out of the scheduler.
//!
//! # Example
//!
//! ```
//! use rotasim_core::entity::{Entity, EntityKind, Side};
//! use rotasim_core::registry::Registry;
//!
//! let mut registry = Registry::new();
//! let hero = registry.spawn(|id| {
//!     let mut e = Entity::new(id, EntityKind::Character, Side::Ally, "Hero");
//!     e.hp = 100.0;
//!     e
//! });
//!
//! registry.update(hero, |e| e.hp -= 40.0);
//! assert_eq!(registry.get(hero).unwrap().hp, 60.0);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, Side};

/// Canonical entity collection with stable roster order.
///
/// # Determinism
///
/// Lookups go through a `BTreeMap` and every iteration follows `order`, the
/// roster order in which entities were added (summons are placed after their
/// owner). No query depends on hash ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    /// Monotonically increasing id counter.
    next_id: u64,
    /// Entity records.
    entities: BTreeMap<EntityId, Arc<Entity>>,
    /// Roster order.
    order: Vec<EntityId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id, builds the entity with `build` and appends it to the
    /// roster.
    ///
    /// # Arguments
    ///
    /// * `build` - Receives the assigned id and returns the entity
    ///
    /// # Returns
    ///
    /// The id assigned to the new entity.
    pub fn spawn(&mut self, build: impl FnOnce(EntityId) -> Entity) -> EntityId {
        let id = self.allocate();
        let entity = build(id);
        debug_assert_eq!(entity.id(), id, "spawned entity must keep its id");
        self.entities.insert(id, Arc::new(entity));
        self.order.push(id);
        id
    }

    /// Allocates an id and inserts the built entity directly after `anchor` in
    /// roster order. Falls back to the end of the roster when `anchor` is
    /// unknown.
    pub fn spawn_after(
        &mut self,
        anchor: EntityId,
        build: impl FnOnce(EntityId) -> Entity,
    ) -> EntityId {
        let id = self.allocate();
        let entity = build(id);
        self.entities.insert(id, Arc::new(entity));
        match self.position(anchor) {
            Some(index) => self.order.insert(index + 1, id),
            None => self.order.push(id),
        }
        id
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Returns the entity with the given id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).map(Arc::as_ref)
    }

    /// Returns true if an entity with the given id exists, alive or not.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Returns true if the entity exists and has HP above zero.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Entity::is_alive)
    }

    /// Applies `edit` to a copy of the record and stores the copy.
    ///
    /// Snapshots taken before the call are unaffected. Returns false if no
    /// entity has the given id.
    pub fn update(&mut self, id: EntityId, edit: impl FnOnce(&mut Entity)) -> bool {
        let Some(record) = self.entities.get_mut(&id) else {
            return false;
        };
        let entity = Arc::make_mut(record);
        edit(entity);
        debug_assert!(entity.hp >= 0.0, "persisted HP must not be negative");
        true
    }

    /// Returns the index of `id` in roster order.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.order.iter().position(|other| *other == id)
    }

    /// Iterates entity ids in roster order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    /// Iterates entities in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(id).map(Arc::as_ref))
    }

    /// Iterates alive entities on `side` in roster order.
    pub fn alive_on(&self, side: Side) -> impl Iterator<Item = &Entity> + '_ {
        self.iter()
            .filter(move |e| e.side() == side && e.is_alive())
    }

    /// Alive party members and summons, in roster order.
    #[must_use]
    pub fn alive_allies(&self) -> Vec<&Entity> {
        self.alive_on(Side::Ally).collect()
    }

    /// Alive enemies, in roster order.
    #[must_use]
    pub fn alive_enemies(&self) -> Vec<&Entity> {
        self.alive_on(Side::Enemy).collect()
    }

    /// Alive entities opposing `side`, in roster order.
    #[must_use]
    pub fn opponents_of(&self, side: Side) -> Vec<&Entity> {
        self.alive_on(side.opponent()).collect()
    }

    /// Returns the alive neighbours of `id` among alive entities on the same
    /// side, in roster order: (left, right).
    #[must_use]
    pub fn neighbours(&self, id: EntityId) -> (Option<EntityId>, Option<EntityId>) {
        let Some(entity) = self.get(id) else {
            return (None, None);
        };
        let line: Vec<EntityId> = self.alive_on(entity.side()).map(Entity::id).collect();
        let Some(index) = line.iter().position(|other| *other == id) else {
            return (None, None);
        };
        let left = index.checked_sub(1).map(|i| line[i]);
        let right = line.get(index + 1).copied();
        (left, right)
    }

    /// Returns the number of entities, alive or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the registry holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

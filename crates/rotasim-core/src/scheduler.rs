//! Action-value scheduler.
//!
//! Every alive entity carries an action value (AV): the distance on the
//! global clock until its next turn. The entity with the lowest AV acts next;
//! ties go to the entity earlier in roster order.
//!
//! # Architecture
//!
//! The AV stored on each [`Entity`](crate::entity::Entity) is the source of
//! truth. [`ActionQueue`] is a sorted view rebuilt from those values by
//! [`resync`], which runs after any change to the roster or to an AV.
//!
//! # Example
//!
//! ```
//! use rotasim_core::scheduler::{action_value, BASE_ACTION_VALUE};
//!
//! assert_eq!(action_value(100.0), 100.0);
//! assert_eq!(action_value(0.0), BASE_ACTION_VALUE);
//! ```

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::state::GameState;

/// Action value numerator: `av = BASE / speed`.
pub const BASE_ACTION_VALUE: f64 = 10_000.0;

/// Full action value of an entity with the given speed.
///
/// Non-positive and NaN speeds count as 1, so this never divides by zero.
#[must_use]
pub fn action_value(speed: f64) -> f64 {
    let speed = if speed.is_nan() { 1.0 } else { speed.max(1.0) };
    BASE_ACTION_VALUE / speed
}

/// One scheduled entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Scheduled entity.
    pub entity: EntityId,
    /// Action value at the last resync.
    pub action_value: f64,
}

/// Turn order, ascending by action value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionQueue(Vec<QueueEntry>);

impl ActionQueue {
    /// Entries in turn order.
    #[must_use]
    pub fn entries(&self) -> &[QueueEntry] {
        &self.0
    }

    /// Next entity to act.
    #[must_use]
    pub fn head(&self) -> Option<QueueEntry> {
        self.0.first().copied()
    }

    /// Returns true if `id` is scheduled.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.0.iter().any(|e| e.entity == id)
    }

    /// Removes `id` from the queue.
    pub fn remove(&mut self, id: EntityId) {
        self.0.retain(|e| e.entity != id);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Gives every alive entity a full action value and builds the queue.
pub fn initialize(state: &mut GameState) {
    let ids: Vec<EntityId> = state.registry.ids().collect();
    for id in ids {
        state.registry.update(id, |e| {
            if e.is_alive() {
                e.action_value = action_value(e.speed());
            }
        });
    }
    resync(state);
}

/// Rebuilds the queue from the entities' current action values.
///
/// Dead and missing entities are dropped; newly alive entities are added.
/// The sort is stable over roster order, so ties keep roster order.
pub fn resync(state: &mut GameState) {
    let mut entries: Vec<QueueEntry> = state
        .registry
        .iter()
        .filter(|e| e.is_alive())
        .map(|e| QueueEntry {
            entity: e.id(),
            action_value: e.action_value,
        })
        .collect();
    entries.sort_by(|a, b| a.action_value.total_cmp(&b.action_value));
    state.queue = ActionQueue(entries);
}

/// Moves the clock forward by `delta`.
///
/// Every alive entity's action value drops by `delta`, floored at zero.
pub fn advance_timeline(state: &mut GameState, delta: f64) {
    let delta = delta.max(0.0);
    let ids: Vec<EntityId> = state.queue.entries().iter().map(|e| e.entity).collect();
    for id in ids {
        state.registry.update(id, |e| {
            e.action_value = (e.action_value - delta).max(0.0);
        });
    }
    state.time += delta;
    resync(state);
}

/// Resets `id` to a full action value computed from its current speed.
pub fn reset_action_value(state: &mut GameState, id: EntityId) {
    state.registry.update(id, |e| {
        e.action_value = action_value(e.speed());
    });
    resync(state);
}

/// Pulls `id`'s next turn forward by `fraction` of its full action value,
/// clamped at zero.
pub fn advance(state: &mut GameState, id: EntityId, fraction: f64) {
    if !state.registry.is_alive(id) {
        return;
    }
    state.registry.update(id, |e| {
        let amount = action_value(e.speed()) * fraction;
        e.action_value = (e.action_value - amount).max(0.0);
    });
    resync(state);
}

/// Pushes `id`'s next turn back by `fraction` of its full action value.
pub fn delay(state: &mut GameState, id: EntityId, fraction: f64) {
    if !state.registry.is_alive(id) {
        return;
    }
    state.registry.update(id, |e| {
        let amount = action_value(e.speed()) * fraction;
        e.action_value = (e.action_value + amount).max(0.0);
    });
    resync(state);
}

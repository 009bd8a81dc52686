//! Effect lifecycle: add, refresh, remove, cascade, tick, cleanse, dispel.
//!
//! These functions edit a [`GameState`] in place and never publish events.
//! The kernel's resolver wraps them and publishes `EffectApplied`,
//! `DebuffApplied` and `EffectRemoved` from the outcomes they return.
//!
//! # Attach and detach
//!
//! Attaching runs the data-driven behaviour of an effect:
//! - a shield adds its value to the host's shield pool
//! - an effect handler is registered on the handler table
//! - crowd control with an on-apply delay pushes the host's turn back
//!
//! Detaching reverses the first two against the latest host record.

use crate::effect::{DurationPolicy, Effect, EffectFlags, EffectId, EffectKind};
use crate::entity::EntityId;
use crate::handler::{HandlerId, HandlerRegistration};
use crate::scheduler;
use crate::state::GameState;
use crate::stats;

/// Result of [`add_effect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new effect was attached.
    Added,
    /// An effect with the same id was refreshed.
    Refreshed,
    /// Nothing changed: missing host or missing link parent.
    Rejected,
}

impl AddOutcome {
    /// Returns true if the effect is now on the host.
    #[must_use]
    pub const fn landed(self) -> bool {
        matches!(self, Self::Added | Self::Refreshed)
    }
}

/// An effect removed from a host.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    /// Former host.
    pub host: EntityId,
    /// The effect as it was when removed.
    pub effect: Effect,
}

/// Handler id of the handler bound to `effect` on `host`.
#[must_use]
pub fn effect_handler_id(host: EntityId, effect: &Effect) -> Option<HandlerId> {
    effect
        .handler
        .as_ref()
        .map(|handler| HandlerId::new(format!("{}#{}@{}", handler.kit, host, effect.id)))
}

/// Finds the entity carrying `parent` for an effect landing on `target`.
///
/// A fixed host must carry the parent itself. An open link prefers the
/// target, then the effect's source, then the first carrier in roster order.
fn resolve_parent_host(
    state: &GameState,
    target: EntityId,
    source: Option<EntityId>,
    parent: &EffectId,
    host: Option<EntityId>,
) -> Option<EntityId> {
    let carries = |id: EntityId| state.entity(id).is_some_and(|e| e.has_effect(parent));
    if let Some(host) = host {
        return carries(host).then_some(host);
    }
    std::iter::once(target)
        .chain(source)
        .find(|id| carries(*id))
        .or_else(|| {
            state
                .registry
                .iter()
                .find(|e| e.has_effect(parent))
                .map(|e| e.id())
        })
}

fn refresh_stats(state: &mut GameState, host: EntityId) {
    stats::rebuild(&mut state.registry, host);
    scheduler::resync(state);
}

/// Adds `effect` to `target`, or refreshes it when the id is already present.
///
/// A refresh resets the remaining duration and adds one stack, clamped at the
/// stack cap. A linked effect whose parent exists on no entity is rejected.
pub fn add_effect(state: &mut GameState, target: EntityId, mut effect: Effect) -> AddOutcome {
    let Some(host) = state.registry.get(target) else {
        return AddOutcome::Rejected;
    };
    if let DurationPolicy::Linked { parent, host: parent_host } = &effect.duration {
        let Some(resolved) =
            resolve_parent_host(state, target, effect.source, parent, *parent_host)
        else {
            tracing::debug!(effect = %effect.id, %parent, "linked effect rejected: parent missing");
            return AddOutcome::Rejected;
        };
        let parent = parent.clone();
        effect.duration = DurationPolicy::Linked {
            parent,
            host: Some(resolved),
        };
    }
    let own_turn =
        effect.flags.contains(EffectFlags::SKIP_FIRST_TICK) && state.current_turn == Some(target);

    if let Some(existing) = host.effect(&effect.id) {
        let pool_delta = match (&existing.kind, &effect.kind) {
            (EffectKind::Shield(old), EffectKind::Shield(new)) => new.value - old.value,
            _ => 0.0,
        };
        let id = effect.id.clone();
        state.registry.update(target, |host| {
            if let Some(current) = host.effects.iter_mut().find(|e| e.id == id) {
                current.remaining = effect.remaining;
                current.source = effect.source.or(current.source);
                if let Some(stacks) = current.stacks.as_mut() {
                    stacks.count = (stacks.count + 1).min(stacks.max);
                }
                if own_turn {
                    current.applied_during_turn_of = Some(target);
                }
                if current.is_shield() {
                    current.kind = effect.kind.clone();
                }
            }
            host.shield = (host.shield + pool_delta).max(0.0);
        });
        refresh_stats(state, target);
        return AddOutcome::Refreshed;
    }

    if own_turn {
        effect.applied_during_turn_of = Some(target);
    }

    // Attach.
    let shield = match effect.kind {
        EffectKind::Shield(spec) => spec.value,
        _ => 0.0,
    };
    let delay = match effect.kind {
        EffectKind::CrowdControl(spec) => spec.delay_on_apply,
        _ => 0.0,
    };
    if let (Some(handler), Some(handler_id)) = (&effect.handler, effect_handler_id(target, &effect)) {
        let owner = effect.source.unwrap_or(target);
        let registration =
            HandlerRegistration::new(handler.kit.clone(), owner, handler.subscribes_to.clone())
                .with_id(handler_id);
        state.handlers.register(registration);
    }
    state.registry.update(target, |host| {
        host.shield += shield;
        host.effects.push(effect);
    });
    if delay > 0.0 {
        scheduler::delay(state, target, delay);
    }
    refresh_stats(state, target);
    AddOutcome::Added
}

/// Removes an effect and, recursively, every effect linked to it on any
/// entity.
///
/// Returns the removed effects in removal order; empty if `target` does not
/// carry `effect_id`.
pub fn remove_effect(state: &mut GameState, target: EntityId, effect_id: &EffectId) -> Vec<Removed> {
    let mut removed = Vec::new();
    remove_recursive(state, target, effect_id, &mut removed);
    if !removed.is_empty() {
        scheduler::resync(state);
    }
    removed
}

fn remove_recursive(
    state: &mut GameState,
    target: EntityId,
    effect_id: &EffectId,
    removed: &mut Vec<Removed>,
) {
    let Some(effect) = state
        .registry
        .get(target)
        .and_then(|host| host.effect(effect_id))
        .cloned()
    else {
        return;
    };

    // Detach against the latest host record.
    if let Some(handler_id) = effect_handler_id(target, &effect) {
        state.handlers.unregister(&handler_id);
    }
    let shield = match effect.kind {
        EffectKind::Shield(spec) => spec.value,
        _ => 0.0,
    };
    state.registry.update(target, |host| {
        host.shield = (host.shield - shield).max(0.0);
        host.effects.retain(|e| &e.id != effect_id);
    });
    stats::rebuild(&mut state.registry, target);
    removed.push(Removed {
        host: target,
        effect,
    });

    let children: Vec<(EntityId, EffectId)> = state
        .registry
        .iter()
        .flat_map(|entity| {
            entity
                .effects
                .iter()
                .filter(|child| child.is_linked_to(target, effect_id))
                .map(move |child| (entity.id(), child.id.clone()))
        })
        .collect();
    for (host, child) in children {
        remove_recursive(state, host, &child, removed);
    }
}

/// Drains `amount` from the host's shield effects, oldest first.
///
/// Each shield keeps what is left of its value and the pool drops by the
/// same amount. Returns the ids of shields drained to zero; the caller
/// removes them.
pub fn drain_shields(state: &mut GameState, host: EntityId, amount: f64) -> Vec<EffectId> {
    let mut left = amount.max(0.0);
    let mut depleted = Vec::new();
    state.registry.update(host, |entity| {
        entity.shield = (entity.shield - left).max(0.0);
        for effect in &mut entity.effects {
            if left <= 0.0 {
                break;
            }
            if let EffectKind::Shield(spec) = &mut effect.kind {
                let taken = left.min(spec.value);
                spec.value -= taken;
                left -= taken;
                if spec.value <= 0.0 {
                    depleted.push(effect.id.clone());
                }
            }
        }
    });
    depleted
}

fn tick(state: &mut GameState, host: EntityId, scope: &DurationPolicy) -> Vec<Removed> {
    let mut expired = Vec::new();
    state.registry.update(host, |entity| {
        for effect in entity
            .effects
            .iter_mut()
            .filter(|e| &e.duration == scope && !e.is_crowd_control())
        {
            if effect.applied_during_turn_of == Some(host) {
                effect.applied_during_turn_of = None;
                continue;
            }
            effect.remaining -= 1;
            if effect.remaining <= 0 {
                expired.push(effect.id.clone());
            }
        }
    });
    expired
        .iter()
        .flat_map(|id| remove_effect(state, host, id))
        .collect()
}

/// Decrements the host's turn-start-scoped effects and removes expired ones.
///
/// Crowd control is excluded; it is decremented by crowd-control resolution.
pub fn tick_turn_start(state: &mut GameState, host: EntityId) -> Vec<Removed> {
    tick(state, host, &DurationPolicy::TurnStart)
}

/// Decrements the host's turn-end-scoped effects and removes expired ones.
pub fn tick_turn_end(state: &mut GameState, host: EntityId) -> Vec<Removed> {
    tick(state, host, &DurationPolicy::TurnEnd)
}

/// Decrements one effect's remaining duration.
///
/// Returns the new remaining duration, or `None` if the effect is missing.
pub fn decrement(state: &mut GameState, host: EntityId, effect_id: &EffectId) -> Option<i32> {
    let mut remaining = None;
    state.registry.update(host, |entity| {
        if let Some(effect) = entity.effects.iter_mut().find(|e| &e.id == effect_id) {
            effect.remaining -= 1;
            remaining = Some(effect.remaining);
        }
    });
    remaining
}

/// Removes up to `count` cleansable debuffs, newest first.
pub fn cleanse(state: &mut GameState, target: EntityId, count: usize) -> Vec<Removed> {
    strip(state, target, count, |effect| {
        effect.is_debuff() && effect.flags.contains(EffectFlags::CLEANSABLE)
    })
}

/// Removes up to `count` dispellable buffs, newest first.
///
/// Shields and linked effects are never dispelled.
pub fn dispel(state: &mut GameState, target: EntityId, count: usize) -> Vec<Removed> {
    strip(state, target, count, |effect| {
        effect.is_buff()
            && effect.flags.contains(EffectFlags::DISPELLABLE)
            && !effect.is_shield()
            && effect.parent().is_none()
    })
}

fn strip(
    state: &mut GameState,
    target: EntityId,
    count: usize,
    eligible: impl Fn(&Effect) -> bool,
) -> Vec<Removed> {
    let Some(host) = state.registry.get(target) else {
        return Vec::new();
    };
    let victims: Vec<EffectId> = host
        .effects
        .iter()
        .rev()
        .filter(|e| eligible(*e))
        .take(count)
        .map(|e| e.id.clone())
        .collect();
    victims
        .iter()
        .flat_map(|id| remove_effect(state, target, id))
        .collect()
}

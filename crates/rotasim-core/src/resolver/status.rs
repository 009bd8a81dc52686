//! Turn-start status resolution: toughness recovery, DoT ticks and crowd
//! control.

use crate::damage::{self, DamageKind};
use crate::effect::manager::decrement;
use crate::effect::{CrowdControlKind, DotDamage, EffectId, EffectKind, EffectTags};
use crate::entity::EntityId;
use crate::error::SimError;
use crate::event::{Event, EventKind};
use crate::kernel::Kernel;
use crate::log::{LogEntry, LogKind};
use crate::scheduler;
use crate::state::GameState;

/// Action advance granted when a freeze wears off.
pub const FREEZE_CATCH_UP: f64 = 0.5;

impl Kernel {
    /// Restores a broken entity's toughness at its turn start.
    ///
    /// `WeaknessBreakRecoveryAttempt` is published first so handlers can
    /// attach `SKIP_TOUGHNESS_RECOVERY` and keep the target broken.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn recover_toughness(&self, state: &mut GameState, id: EntityId) -> Result<(), SimError> {
        if !state
            .entity(id)
            .is_some_and(|e| e.is_alive() && e.is_broken())
        {
            return Ok(());
        }
        self.emit(
            state,
            &Event::new(EventKind::WeaknessBreakRecoveryAttempt).with_target(id),
        )?;
        let Some(entity) = state.entity(id) else {
            return Ok(());
        };
        if !entity.is_broken() || entity.has_tag(EffectTags::SKIP_TOUGHNESS_RECOVERY) {
            return Ok(());
        }

        state.registry.update(id, |e| e.toughness = e.max_toughness);
        if let Some(entity) = state.entity(id) {
            let mut entry = LogEntry::new(state.time, LogKind::Recovery).with_actor(entity);
            entry.snapshot(entity);
            entry.skill_points = state.skill_points;
            state.record(entry);
        }
        Ok(())
    }

    /// Ticks every DoT on `id`, in attachment order.
    ///
    /// Each tick publishes `DotDamage` and may defeat the host; remaining
    /// DoTs are skipped once it is down.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn resolve_dots(&self, state: &mut GameState, id: EntityId) -> Result<(), SimError> {
        let Some(host) = state.entity(id) else {
            return Ok(());
        };
        let dots: Vec<EffectId> = host
            .effects
            .iter()
            .filter(|e| matches!(e.kind, EffectKind::Dot(_)))
            .map(|e| e.id.clone())
            .collect();

        for dot_id in dots {
            let Some(host) = state.entity(id).filter(|e| e.is_alive()) else {
                break;
            };
            let Some(effect) = host.effect(&dot_id) else {
                continue;
            };
            let EffectKind::Dot(spec) = effect.kind else {
                continue;
            };
            let stacks = f64::from(effect.stack_count());
            let source_id = effect.source.unwrap_or(id);
            let name = effect.name.clone();
            let Some(source) = state.entity(source_id) else {
                continue;
            };
            let breakdown = match spec.damage {
                DotDamage::Fixed { base } => {
                    damage::break_dot_damage(source, host, spec.element, base * stacks)
                }
                DotDamage::Multiplier { ratio } => {
                    damage::dot_damage(source, host, spec.element, ratio * stacks)
                }
            };
            tracing::trace!(host = %id, dot = %dot_id, damage = breakdown.total, "dot tick");
            self.apply_damage(state, Some(source_id), id, breakdown.total, DamageKind::Dot)?;
            self.log_damage(state, LogKind::Dot, source_id, id, breakdown, Some(name));
        }
        Ok(())
    }

    /// Resolves crowd control on `id` at its turn start.
    ///
    /// Deals the tick damage, then decrements the duration. At zero the
    /// effect is removed and the turn proceeds; a thawed freeze also pulls
    /// the next turn forward. Otherwise the turn is lost.
    ///
    /// # Returns
    ///
    /// True if the entity loses this turn.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn resolve_crowd_control(
        &self,
        state: &mut GameState,
        id: EntityId,
    ) -> Result<bool, SimError> {
        let Some(host) = state.entity(id).filter(|e| e.is_alive()) else {
            return Ok(false);
        };
        let Some(effect) = host.crowd_control() else {
            return Ok(false);
        };
        let EffectKind::CrowdControl(spec) = effect.kind else {
            return Ok(false);
        };
        let cc_id = effect.id.clone();
        let name = effect.name.clone();
        let source_id = effect.source.unwrap_or(id);
        let stacks = f64::from(effect.stack_count());

        if spec.tick_damage > 0.0 {
            if let Some(breakdown) = state.entity(source_id).map(|source| {
                damage::break_additional_damage(source, host, spec.element, spec.tick_damage * stacks)
            }) {
                self.apply_damage(
                    state,
                    Some(source_id),
                    id,
                    breakdown.total,
                    DamageKind::Additional,
                )?;
                self.log_damage(
                    state,
                    LogKind::CrowdControl,
                    source_id,
                    id,
                    breakdown,
                    Some(name.clone()),
                );
            }
        }
        if !state.registry.is_alive(id) {
            return Ok(true);
        }

        let remaining = decrement(state, id, &cc_id).unwrap_or(0);
        if remaining <= 0 {
            self.remove_effect(state, id, &cc_id)?;
            if spec.cc == CrowdControlKind::Freeze {
                scheduler::advance(state, id, FREEZE_CATCH_UP);
            }
            return Ok(false);
        }

        tracing::debug!(entity = %id, status = %name, remaining, "turn skipped");
        if let Some(entity) = state.entity(id) {
            let mut entry = LogEntry::new(state.time, LogKind::TurnSkipped)
                .with_actor(entity)
                .with_details(name);
            entry.snapshot(entity);
            entry.skill_points = state.skill_points;
            state.record(entry);
        }
        Ok(true)
    }
}

/// Adds a stack to the entanglement on `target`, if any.
pub(crate) fn grow_entanglement(state: &mut GameState, target: EntityId) {
    state.registry.update(target, |e| {
        for effect in &mut e.effects {
            if let EffectKind::CrowdControl(spec) = &effect.kind {
                if spec.cc == CrowdControlKind::Entanglement {
                    if let Some(stacks) = effect.stacks.as_mut() {
                        stacks.count = (stacks.count + 1).min(stacks.max);
                    }
                }
            }
        }
    });
}

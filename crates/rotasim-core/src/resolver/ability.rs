//! Ability resolution: costs, targeting, hits, support and side-effects.
//!
//! # Order
//!
//! 1. Resolve targets and pay costs
//! 2. Publish the action event (`BasicAttack`, `SkillUsed`, ...)
//! 3. Resolve every hit (silently; the ability logs one summary line)
//! 4. Heal and shield
//! 5. Roll and apply the ability's effects
//! 6. Grant energy, log, publish `ActionComplete`

use rand::Rng;

use crate::ability::{AbilityEffect, AbilitySpec, EffectRecipient, HitSpec, TargetKind};
use crate::action::ActionKind;
use crate::damage::{DamageBreakdown, DamageKind};
use crate::effect::{EffectId, EffectTags};
use crate::energy;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::error::SimError;
use crate::event::{Event, EventKind};
use crate::kernel::Kernel;
use crate::log::{LogEntry, LogKind};
use crate::resolver::combat::HitRequest;
use crate::resolver::status::grow_entanglement;
use crate::state::GameState;
use crate::stats::StatKey;

/// Aggro weight used when an entity has none.
pub const DEFAULT_AGGRO: f64 = 100.0;

#[derive(Debug, Default)]
struct Tally {
    damage: f64,
    healing: f64,
    shield: f64,
    struck: Vec<EntityId>,
    breakdowns: Vec<DamageBreakdown>,
}

impl Kernel {
    /// Resolves one ability use.
    ///
    /// # Arguments
    ///
    /// * `kind` - Action kind; decides costs and the published event
    /// * `source` - Acting entity
    /// * `target` - Requested primary target, validated against the rule
    /// * `slot` - Ability slot to read instead of `kind`'s own slot
    ///
    /// Missing or dead sources, missing ability slots, a silenced skill and
    /// damaging abilities with no valid target are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub(crate) fn use_ability(
        &self,
        state: &mut GameState,
        kind: ActionKind,
        source: EntityId,
        target: Option<EntityId>,
        slot: Option<ActionKind>,
    ) -> Result<(), SimError> {
        let Some(actor) = state.entity(source).filter(|e| e.is_alive()) else {
            return Ok(());
        };
        let Some(spec) = actor.abilities.get(slot.unwrap_or(kind)).cloned() else {
            tracing::debug!(%source, ?kind, "no ability in slot");
            return Ok(());
        };
        if kind == ActionKind::Skill && actor.has_tag(EffectTags::SKILL_SILENCE) {
            tracing::debug!(%source, "skill silenced");
            return Ok(());
        }
        let pays_sp = actor.kind() == EntityKind::Character;
        let ult_cooldown = actor.rotation.ult_cooldown;

        let targets = resolve_targets(state, source, spec.target, target);
        if targets.is_empty() {
            tracing::debug!(%source, ?kind, "no valid target");
            return Ok(());
        }

        match kind {
            ActionKind::Basic if pays_sp => state.gain_skill_points(1),
            ActionKind::Skill if pays_sp => state.spend_skill_points(spec.sp_cost),
            ActionKind::Ultimate => {
                state.registry.update(source, |e| {
                    e.energy = 0.0;
                    e.ult_cooldown = ult_cooldown;
                });
            }
            _ => {}
        }

        let mut started = Event::new(EventKind::for_action(kind))
            .with_source(source)
            .with_action(kind)
            .with_target_count(targets.len());
        if let Some(primary) = targets.first() {
            started = started.with_target(*primary);
        }
        self.emit(state, &started)?;

        let mut tally = Tally::default();
        let damage_kind = DamageKind::from(kind);
        self.resolve_hits(state, source, &spec, &targets, damage_kind, &mut tally)?;
        for struck in &tally.struck {
            grow_entanglement(state, *struck);
        }
        self.resolve_support(state, source, &spec, &targets, &mut tally)?;
        self.resolve_effects(state, source, &spec.effects, &targets, &tally.struck)?;
        energy::gain_energy(state, source, spec.energy_gain, 0.0);

        self.log_ability(state, kind, source, &spec, &targets, &tally);
        let mut complete = Event::new(EventKind::ActionComplete)
            .with_source(source)
            .with_action(kind)
            .with_value(tally.damage)
            .with_target_count(targets.len());
        if let Some(primary) = targets.first() {
            complete = complete.with_target(*primary);
        }
        self.emit(state, &complete)
    }

    fn resolve_hits(
        &self,
        state: &mut GameState,
        source: EntityId,
        spec: &AbilitySpec,
        targets: &[EntityId],
        kind: DamageKind,
        tally: &mut Tally,
    ) -> Result<(), SimError> {
        if spec.target.is_supportive() {
            return Ok(());
        }
        if let TargetKind::Bounce { hits } = spec.target {
            let Some(hit) = spec.hits.first() else {
                return Ok(());
            };
            let mut next = targets.first().copied();
            for _ in 0..hits {
                let Some(target) = next.filter(|t| state.registry.is_alive(*t)) else {
                    break;
                };
                self.strike(state, source, target, hit, kind, tally)?;
                next = random_opponent(state, source);
            }
            return Ok(());
        }

        for target in targets {
            for hit in &spec.hits {
                self.strike(state, source, *target, hit, kind, tally)?;
            }
        }
        if spec.target == TargetKind::Blast {
            if let Some(primary) = targets.first() {
                let (left, right) = state.registry.neighbours(*primary);
                for neighbour in [left, right].into_iter().flatten() {
                    if !targetable(state, source, neighbour) {
                        continue;
                    }
                    for hit in &spec.adjacent_hits {
                        self.strike(state, source, neighbour, hit, kind, tally)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn strike(
        &self,
        state: &mut GameState,
        source: EntityId,
        target: EntityId,
        hit: &HitSpec,
        kind: DamageKind,
        tally: &mut Tally,
    ) -> Result<(), SimError> {
        let request = HitRequest::new(source, target, hit.clone(), kind).silent();
        if let Some(outcome) = self.deal_damage(state, &request)? {
            tally.damage += outcome.breakdown.total;
            tally.breakdowns.push(outcome.breakdown);
            if !tally.struck.contains(&target) {
                tally.struck.push(target);
            }
        }
        Ok(())
    }

    fn resolve_support(
        &self,
        state: &mut GameState,
        source: EntityId,
        spec: &AbilitySpec,
        targets: &[EntityId],
        tally: &mut Tally,
    ) -> Result<(), SimError> {
        let recipients: Vec<EntityId> = if spec.target.is_supportive() {
            targets.to_vec()
        } else {
            vec![source]
        };
        if let Some(heal) = &spec.heal {
            for recipient in &recipients {
                tally.healing += self.heal(state, source, *recipient, heal)?;
            }
        }
        if let Some(grant) = &spec.shield {
            let id = EffectId::new(format!("shield_{source}"));
            for recipient in &recipients {
                tally.shield += self.grant_shield(state, source, *recipient, grant, id.clone())?;
            }
        }
        Ok(())
    }

    fn resolve_effects(
        &self,
        state: &mut GameState,
        source: EntityId,
        effects: &[AbilityEffect],
        targets: &[EntityId],
        struck: &[EntityId],
    ) -> Result<(), SimError> {
        for ability_effect in effects {
            let recipients: Vec<EntityId> = match ability_effect.on {
                EffectRecipient::Source => vec![source],
                EffectRecipient::Targets if struck.is_empty() => targets.to_vec(),
                EffectRecipient::Targets => struck.to_vec(),
            };
            for recipient in recipients {
                if !state.registry.is_alive(recipient) {
                    continue;
                }
                if !effect_lands(state, source, recipient, ability_effect) {
                    tracing::debug!(%source, %recipient, effect = %ability_effect.effect.id, "effect resisted");
                    continue;
                }
                let effect = ability_effect.effect.clone().from_source(source);
                self.apply_effect(state, recipient, effect)?;
            }
        }
        Ok(())
    }

    fn log_ability(
        &self,
        state: &mut GameState,
        kind: ActionKind,
        source: EntityId,
        spec: &AbilitySpec,
        targets: &[EntityId],
        tally: &Tally,
    ) {
        let mut entry = LogEntry::new(state.time, LogKind::Action(kind));
        if let Some(actor) = state.entity(source) {
            entry = entry.with_actor(actor);
            entry.snapshot(actor);
        }
        let named = if tally.struck.is_empty() {
            targets
        } else {
            tally.struck.as_slice()
        };
        for id in named {
            if let Some(target) = state.entity(*id) {
                entry.targets.push(target.name.clone());
                if *id != source {
                    entry.snapshot(target);
                }
            }
        }
        entry.damage = tally.damage;
        entry.healing = tally.healing;
        entry.shield = tally.shield;
        entry.skill_points = state.skill_points;
        entry.breakdown.clone_from(&tally.breakdowns);
        if !spec.name.is_empty() {
            entry.details = Some(spec.name.clone());
        }
        state.record(entry);
    }
}

// =============================================================================
// Targeting
// =============================================================================

fn targetable(state: &GameState, attacker: EntityId, id: EntityId) -> bool {
    match (state.entity(attacker), state.entity(id)) {
        (Some(a), Some(t)) => t.is_alive() && t.is_opponent_of(a) && !t.untargetable,
        _ => false,
    }
}

fn opponents(state: &GameState, attacker: EntityId) -> Vec<EntityId> {
    let Some(a) = state.entity(attacker) else {
        return Vec::new();
    };
    state
        .registry
        .alive_on(a.side().opponent())
        .filter(|e| !e.untargetable)
        .map(Entity::id)
        .collect()
}

fn random_opponent(state: &mut GameState, attacker: EntityId) -> Option<EntityId> {
    let pool = opponents(state, attacker);
    if pool.is_empty() {
        return None;
    }
    let index = state.rng.gen_range(0..pool.len());
    pool.get(index).copied()
}

/// Picks the primary target for `attacker`.
///
/// Enemies draw an aggro-weighted random ally; everyone else takes the first
/// targetable opponent in roster order.
pub fn pick_target(state: &mut GameState, attacker: EntityId) -> Option<EntityId> {
    let is_enemy = state.entity(attacker)?.is_enemy();
    let pool = opponents(state, attacker);
    if !is_enemy {
        return pool.first().copied();
    }

    let weighted: Vec<(EntityId, f64)> = pool
        .iter()
        .filter_map(|id| state.entity(*id))
        .map(|e| {
            let aggro = e.stats.get(StatKey::Aggro);
            (e.id(), if aggro > 0.0 { aggro } else { DEFAULT_AGGRO })
        })
        .collect();
    let total: f64 = weighted.iter().map(|(_, w)| w).sum();
    if weighted.is_empty() || total <= 0.0 {
        return None;
    }
    let mut roll = state.rng.gen::<f64>() * total;
    for (id, weight) in &weighted {
        if roll < *weight {
            return Some(*id);
        }
        roll -= weight;
    }
    weighted.last().map(|(id, _)| *id)
}

fn resolve_targets(
    state: &mut GameState,
    source: EntityId,
    rule: TargetKind,
    requested: Option<EntityId>,
) -> Vec<EntityId> {
    match rule {
        TargetKind::SingleEnemy | TargetKind::Blast | TargetKind::Bounce { .. } => requested
            .filter(|t| targetable(state, source, *t))
            .or_else(|| pick_target(state, source))
            .into_iter()
            .collect(),
        TargetKind::AllEnemies => opponents(state, source),
        TargetKind::SelfOnly => vec![source],
        TargetKind::AllAllies => {
            let Some(side) = state.entity(source).map(Entity::side) else {
                return Vec::new();
            };
            state.registry.alive_on(side).map(Entity::id).collect()
        }
        TargetKind::SingleAlly => {
            let Some(actor) = state.entity(source) else {
                return Vec::new();
            };
            let side = actor.side();
            let preferred = actor.rotation.skill_target;
            let is_ally = |id: EntityId| {
                state
                    .entity(id)
                    .is_some_and(|e| e.is_alive() && e.side() == side)
            };
            let chosen = requested.filter(|id| is_ally(*id)).or_else(|| {
                preferred
                    .and_then(|index| state.registry.ids().nth(index))
                    .filter(|id| is_ally(*id))
            });
            vec![chosen.unwrap_or(source)]
        }
    }
}

fn effect_lands(
    state: &mut GameState,
    source: EntityId,
    target: EntityId,
    ability_effect: &AbilityEffect,
) -> bool {
    if !ability_effect.effect.is_debuff() {
        return true;
    }
    let hit_rate = state
        .entity(source)
        .map_or(0.0, |e| e.stats.get(StatKey::EffectHitRate));
    let res = state
        .entity(target)
        .map_or(0.0, |e| e.stats.get(StatKey::EffectRes));
    let chance = ability_effect.chance * (1.0 + hit_rate) * (1.0 - res);
    if chance >= 1.0 {
        return true;
    }
    if chance <= 0.0 {
        return false;
    }
    state.rng.gen::<f64>() < chance
}

//! Damage, healing, shields and effect application.
//!
//! Every operation here is an in-place kernel operation: it edits the state,
//! publishes the follow-on events and returns what happened. Missing or dead
//! targets are no-ops that return `None` or zero.
//!
//! # Hit pipeline
//!
//! 1. Reset the per-hit modifiers and publish `BeforeDamageCalculation`
//! 2. Roll crit and compute the hit from fresh snapshots
//! 3. Absorb into shield, then HP; publish `DamageDealt`
//! 4. On a kill, run defeat bookkeeping and publish `UnitDefeated`
//! 5. Reduce toughness; on a break, deal break damage, publish
//!    `WeaknessBreak` and apply the break status

use crate::ability::{HealSpec, HitSpec, ShieldGrant};
use crate::damage::{self, Absorption, DamageBreakdown, DamageKind, HitModifiers};
use crate::effect::manager::{AddOutcome, Removed};
use crate::effect::{self, breaks, DurationPolicy, Effect, EffectId, EffectKind, ShieldSpec};
use crate::energy::{self, KILL_ENERGY_REWARD};
use crate::entity::EntityId;
use crate::error::SimError;
use crate::event::{Event, EventKind};
use crate::kernel::Kernel;
use crate::log::{LogEntry, LogKind};
use crate::scheduler;
use crate::state::GameState;

/// One damage instance to resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRequest {
    /// Attacker.
    pub source: EntityId,
    /// Defender.
    pub target: EntityId,
    /// Scaling and toughness of the hit.
    pub hit: HitSpec,
    /// Damage category.
    pub kind: DamageKind,
    /// Skip the hit's own log line; the caller logs a summary.
    pub silent: bool,
}

impl HitRequest {
    /// Creates a logged request.
    #[must_use]
    pub const fn new(source: EntityId, target: EntityId, hit: HitSpec, kind: DamageKind) -> Self {
        Self {
            source,
            target,
            hit,
            kind,
            silent: false,
        }
    }

    /// Builder: suppresses the hit's log line.
    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Result of a resolved hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    /// Multiplier breakdown.
    pub breakdown: DamageBreakdown,
    /// Damage taken by the shield.
    pub absorbed: f64,
    /// HP lost.
    pub hp_loss: f64,
    /// Toughness removed.
    pub toughness_damage: f64,
    /// The hit depleted the target's toughness.
    pub broke: bool,
    /// The hit defeated the target.
    pub killed: bool,
}

impl Kernel {
    // =========================================================================
    // Damage
    // =========================================================================

    /// Resolves one hit through the full pipeline.
    ///
    /// # Returns
    ///
    /// `None` if either entity is missing or the target is already down.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn deal_damage(
        &self,
        state: &mut GameState,
        request: &HitRequest,
    ) -> Result<Option<HitOutcome>, SimError> {
        if state.entity(request.source).is_none() || !state.registry.is_alive(request.target) {
            return Ok(None);
        }

        state.hit_modifiers = HitModifiers::default();
        let mut before = Event::new(EventKind::BeforeDamageCalculation)
            .with_source(request.source)
            .with_target(request.target);
        if let Some(action) = request.kind.action() {
            before = before.with_action(action);
        }
        self.emit(state, &before)?;
        let modifiers = std::mem::take(&mut state.hit_modifiers);

        let Some(rate) = state
            .entity(request.source)
            .map(|source| damage::crit_rate(source, &modifiers))
        else {
            return Ok(None);
        };
        let is_crit = damage::roll_crit(&mut state.rng, rate, state.crit_policy);
        let (Some(source), Some(target)) = (state.entity(request.source), state.entity(request.target))
        else {
            return Ok(None);
        };
        if !target.is_alive() {
            return Ok(None);
        }
        let breakdown =
            damage::compute_hit(source, target, &request.hit, request.kind, &modifiers, is_crit);
        let reduction = damage::toughness_reduction(
            source,
            target,
            source.element,
            request.hit.toughness,
            modifiers.break_efficiency,
        );

        let Some(absorption) = self.apply_damage(
            state,
            Some(request.source),
            request.target,
            breakdown.total,
            request.kind,
        )?
        else {
            return Ok(None);
        };
        let killed = absorption.hp <= 0.0;
        let broke = if killed || reduction <= 0.0 {
            false
        } else {
            self.reduce_toughness(state, request.source, request.target, reduction)?
        };

        if !request.silent {
            let kind = request
                .kind
                .action()
                .map_or(LogKind::Damage, LogKind::Action);
            self.log_damage(state, kind, request.source, request.target, breakdown, None);
        }

        Ok(Some(HitOutcome {
            breakdown,
            absorbed: absorption.absorbed,
            hp_loss: absorption.hp_loss,
            toughness_damage: if killed { 0.0 } else { reduction },
            broke,
            killed,
        }))
    }

    /// Applies already-computed damage to shield and HP.
    ///
    /// Publishes `DotDamage` for DoT ticks and `DamageDealt` otherwise, then
    /// runs defeat bookkeeping if the target dropped to zero HP. Shield
    /// effects absorb oldest first and are removed once drained.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn apply_damage(
        &self,
        state: &mut GameState,
        source: Option<EntityId>,
        target: EntityId,
        amount: f64,
        kind: DamageKind,
    ) -> Result<Option<Absorption>, SimError> {
        let Some(victim) = state.entity(target).filter(|e| e.is_alive()) else {
            return Ok(None);
        };
        let absorption = damage::absorb(victim.shield, victim.hp, amount);
        let shields = effect::manager::drain_shields(state, target, absorption.absorbed);
        state.registry.update(target, |e| e.hp = absorption.hp);
        if let Some(source) = source {
            state.credit(source, amount.max(0.0), 0.0, 0.0);
        }
        for shield in &shields {
            self.remove_effect(state, target, shield)?;
        }

        let kind_event = if kind == DamageKind::Dot {
            EventKind::DotDamage
        } else {
            EventKind::DamageDealt
        };
        let mut event = Event::new(kind_event)
            .with_target(target)
            .with_value(amount)
            .with_target_count(1);
        if let Some(source) = source {
            event = event.with_source(source);
        }
        if let Some(action) = kind.action() {
            event = event.with_action(action);
        }
        self.emit(state, &event)?;

        if absorption.hp <= 0.0 {
            self.defeat(state, source, target)?;
        }
        Ok(Some(absorption))
    }

    fn defeat(
        &self,
        state: &mut GameState,
        killer: Option<EntityId>,
        victim: EntityId,
    ) -> Result<(), SimError> {
        tracing::debug!(%victim, ?killer, time = state.time, "unit defeated");
        if let Some(entity) = state.entity(victim) {
            let mut entry = LogEntry::new(state.time, LogKind::Defeat).with_actor(entity);
            entry.snapshot(entity);
            entry.skill_points = state.skill_points;
            state.record(entry);
        }
        scheduler::resync(state);
        if let Some(killer) = killer {
            energy::gain_energy(state, killer, KILL_ENERGY_REWARD, 0.0);
        }

        let mut event = Event::new(EventKind::UnitDefeated).with_target(victim);
        if let Some(killer) = killer {
            event = event.with_source(killer);
        }
        self.emit(state, &event)?;

        let summons: Vec<EntityId> = state
            .registry
            .iter()
            .filter(|e| e.owner == Some(victim) && e.is_alive())
            .map(|e| e.id())
            .collect();
        for summon in summons {
            self.dismiss(state, summon)?;
        }
        Ok(())
    }

    // =========================================================================
    // Toughness
    // =========================================================================

    /// Removes toughness and triggers a weakness break at zero.
    ///
    /// Returns true if this call broke the target.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn reduce_toughness(
        &self,
        state: &mut GameState,
        source: EntityId,
        target: EntityId,
        amount: f64,
    ) -> Result<bool, SimError> {
        let Some(entity) = state.entity(target).filter(|e| e.is_alive()) else {
            return Ok(false);
        };
        if entity.max_toughness <= 0.0 || entity.toughness <= 0.0 || amount <= 0.0 {
            return Ok(false);
        }
        let toughness = (entity.toughness - amount).max(0.0);
        state.registry.update(target, |e| e.toughness = toughness);
        if toughness > 0.0 {
            return Ok(false);
        }
        self.weakness_break(state, source, target)?;
        Ok(true)
    }

    fn weakness_break(
        &self,
        state: &mut GameState,
        source: EntityId,
        target: EntityId,
    ) -> Result<(), SimError> {
        let (Some(attacker), Some(victim)) = (state.entity(source), state.entity(target)) else {
            return Ok(());
        };
        let breakdown = damage::break_damage(attacker, victim);
        tracing::debug!(%source, %target, damage = breakdown.total, "weakness break");

        self.apply_damage(state, Some(source), target, breakdown.total, DamageKind::Break)?;
        self.log_damage(state, LogKind::Break, source, target, breakdown, None);
        self.emit(
            state,
            &Event::new(EventKind::WeaknessBreak)
                .with_source(source)
                .with_target(target)
                .with_value(breakdown.total),
        )?;

        let status = match (state.entity(source), state.entity(target)) {
            (Some(attacker), Some(victim)) if victim.is_alive() => {
                Some(breaks::for_element(attacker, victim))
            }
            _ => None,
        };
        if let Some(status) = status {
            self.apply_effect(state, target, status)?;
        }
        Ok(())
    }

    // =========================================================================
    // Healing and shields
    // =========================================================================

    /// Heals `target` by `spec`, scaled by `source`'s stats.
    ///
    /// Returns the HP actually restored.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn heal(
        &self,
        state: &mut GameState,
        source: EntityId,
        target: EntityId,
        spec: &HealSpec,
    ) -> Result<f64, SimError> {
        let amount = match (state.entity(source), state.entity(target)) {
            (Some(healer), Some(patient)) => damage::heal_amount(healer, patient, spec),
            _ => return Ok(0.0),
        };
        self.restore_hp(state, source, target, amount)
    }

    /// Restores a raw amount of HP, capped at max HP. Publishes `UnitHealed`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn restore_hp(
        &self,
        state: &mut GameState,
        source: EntityId,
        target: EntityId,
        amount: f64,
    ) -> Result<f64, SimError> {
        let Some(patient) = state.entity(target).filter(|e| e.is_alive()) else {
            return Ok(0.0);
        };
        let healed = amount.max(0.0).min(patient.max_hp() - patient.hp).max(0.0);
        state.registry.update(target, |e| e.hp += healed);
        state.credit(source, 0.0, healed, 0.0);
        self.emit(
            state,
            &Event::new(EventKind::UnitHealed)
                .with_source(source)
                .with_target(target)
                .with_value(healed),
        )?;
        Ok(healed)
    }

    /// Grants a shield effect with id `id`.
    ///
    /// A shield with the same id stacks onto what is left of the existing
    /// value, bounded by `grant.cap` when set. Publishes `ShieldApplied` with the added amount.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn grant_shield(
        &self,
        state: &mut GameState,
        source: EntityId,
        target: EntityId,
        grant: &ShieldGrant,
        id: impl Into<EffectId>,
    ) -> Result<f64, SimError> {
        let id = id.into();
        let (Some(caster), Some(holder)) = (state.entity(source), state.entity(target)) else {
            return Ok(0.0);
        };
        if !holder.is_alive() {
            return Ok(0.0);
        }
        let amount = damage::shield_amount(caster, grant);
        let existing = holder.effect(&id).and_then(|e| match e.kind {
            EffectKind::Shield(spec) => Some(spec.value),
            _ => None,
        });
        let value = match (existing, grant.cap) {
            (Some(current), Some(cap)) => (current + amount).min(cap.max(current)),
            (Some(current), None) => current + amount,
            (None, Some(cap)) => amount.min(cap),
            (None, None) => amount,
        };
        let added = value - existing.unwrap_or(0.0);

        let shield = Effect::new(id, "Shield", EffectKind::Shield(ShieldSpec { value }))
            .from_source(source)
            .with_duration(DurationPolicy::TurnStart, grant.duration);
        self.apply_effect(state, target, shield)?;
        state.credit(source, 0.0, 0.0, added);
        self.emit(
            state,
            &Event::new(EventKind::ShieldApplied)
                .with_source(source)
                .with_target(target)
                .with_value(added),
        )?;
        Ok(added)
    }

    // =========================================================================
    // Effects
    // =========================================================================

    /// Adds or refreshes an effect and publishes `EffectApplied`, plus
    /// `DebuffApplied` for debuffs.
    ///
    /// An effect handler with no subscriptions takes its kit's defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn apply_effect(
        &self,
        state: &mut GameState,
        target: EntityId,
        mut effect: Effect,
    ) -> Result<AddOutcome, SimError> {
        if let Some(handler) = effect.handler.as_mut() {
            if handler.subscribes_to.is_empty() {
                if let Some(kit) = self.catalog().get(&handler.kit) {
                    handler.subscribes_to = kit.subscriptions().to_vec();
                }
            }
        }
        let id = effect.id.clone();
        let source = effect.source;
        let debuff = effect.is_debuff();

        let outcome = effect::add_effect(state, target, effect);
        if !outcome.landed() {
            return Ok(outcome);
        }
        let mut event = Event::new(EventKind::EffectApplied)
            .with_target(target)
            .with_effect(id);
        if let Some(source) = source {
            event = event.with_source(source);
        }
        self.emit(state, &event)?;
        if debuff {
            event.kind = EventKind::DebuffApplied;
            self.emit(state, &event)?;
        }
        Ok(outcome)
    }

    /// Removes an effect and its linked children, publishing `EffectRemoved`
    /// for each.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn remove_effect(
        &self,
        state: &mut GameState,
        target: EntityId,
        effect_id: &EffectId,
    ) -> Result<Vec<Removed>, SimError> {
        let removed = effect::remove_effect(state, target, effect_id);
        self.announce_removed(state, &removed)?;
        Ok(removed)
    }

    /// Removes up to `count` cleansable debuffs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn cleanse(
        &self,
        state: &mut GameState,
        target: EntityId,
        count: usize,
    ) -> Result<Vec<Removed>, SimError> {
        let removed = effect::cleanse(state, target, count);
        self.announce_removed(state, &removed)?;
        Ok(removed)
    }

    /// Removes up to `count` dispellable buffs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn dispel(
        &self,
        state: &mut GameState,
        target: EntityId,
        count: usize,
    ) -> Result<Vec<Removed>, SimError> {
        let removed = effect::dispel(state, target, count);
        self.announce_removed(state, &removed)?;
        Ok(removed)
    }

    pub(crate) fn announce_removed(
        &self,
        state: &mut GameState,
        removed: &[Removed],
    ) -> Result<(), SimError> {
        for entry in removed {
            let mut event = Event::new(EventKind::EffectRemoved)
                .with_target(entry.host)
                .with_effect(entry.effect.id.clone());
            if let Some(source) = entry.effect.source {
                event = event.with_source(source);
            }
            self.emit(state, &event)?;
        }
        Ok(())
    }

    pub(crate) fn log_damage(
        &self,
        state: &mut GameState,
        kind: LogKind,
        source: EntityId,
        target: EntityId,
        breakdown: DamageBreakdown,
        details: Option<String>,
    ) {
        let mut entry = LogEntry::new(state.time, kind);
        if let Some(actor) = state.entity(source) {
            entry = entry.with_actor(actor);
            entry.snapshot(actor);
        }
        if let Some(victim) = state.entity(target) {
            entry.targets.push(victim.name.clone());
            entry.snapshot(victim);
        }
        entry.damage = breakdown.total;
        entry.breakdown.push(breakdown);
        entry.skill_points = state.skill_points;
        entry.details = details;
        state.record(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::CritPolicy;
    use crate::effect::CrowdControlKind;
    use crate::entity::Element;
    use crate::stats::StatKey;
    use crate::tests::helpers;

    fn setup() -> (Kernel, GameState, EntityId, EntityId) {
        let kernel = Kernel::default();
        let mut state = helpers::duel_state();
        state.crit_policy = CritPolicy::Never;
        let hero = helpers::first_ally(&state);
        let enemy = helpers::first_enemy(&state);
        (kernel, state, hero, enemy)
    }

    mod damage_tests {
        use super::*;

        #[test]
        fn hit_reduces_hp_and_logs() {
            let (kernel, mut state, hero, enemy) = setup();
            let before = state.entity(enemy).unwrap().hp;
            let outcome = kernel
                .deal_damage(
                    &mut state,
                    &HitRequest::new(hero, enemy, HitSpec::atk(1.0, 0.0), DamageKind::Skill),
                )
                .unwrap()
                .unwrap();
            assert!(!outcome.breakdown.is_crit);
            let after = state.entity(enemy).unwrap().hp;
            assert!((before - after - outcome.breakdown.total).abs() < 0.0001);
            assert_eq!(state.log.len(), 1);
            assert!((state.result.total_damage - outcome.breakdown.total).abs() < 0.0001);
        }

        #[test]
        fn silent_hits_do_not_log() {
            let (kernel, mut state, hero, enemy) = setup();
            kernel
                .deal_damage(
                    &mut state,
                    &HitRequest::new(hero, enemy, HitSpec::atk(1.0, 0.0), DamageKind::Basic)
                        .silent(),
                )
                .unwrap();
            assert!(state.log.is_empty());
        }

        #[test]
        fn shield_absorbs_before_hp() {
            let (kernel, mut state, hero, enemy) = setup();
            state.registry.update(hero, |e| e.shield = 100.0);
            let absorption = kernel
                .apply_damage(&mut state, Some(enemy), hero, 60.0, DamageKind::Basic)
                .unwrap()
                .unwrap();
            assert!((absorption.shield - 40.0).abs() < 0.0001);
            assert!(absorption.hp_loss.abs() < 0.0001);

            let absorption = kernel
                .apply_damage(&mut state, Some(enemy), hero, 100.0, DamageKind::Basic)
                .unwrap()
                .unwrap();
            assert!(absorption.shield.abs() < 0.0001);
            assert!((absorption.hp_loss - 60.0).abs() < 0.0001);
        }

        #[test]
        fn kill_purges_queue_and_rewards_killer() {
            let (kernel, mut state, hero, enemy) = setup();
            scheduler::initialize(&mut state);
            state.registry.update(hero, |e| e.energy = 0.0);
            let hp = state.entity(enemy).unwrap().hp;
            kernel
                .apply_damage(&mut state, Some(hero), enemy, hp + 1.0, DamageKind::Basic)
                .unwrap();
            assert!(!state.registry.is_alive(enemy));
            assert!(!state.queue.contains(enemy));
            assert!((state.entity(hero).unwrap().energy - KILL_ENERGY_REWARD).abs() < 0.0001);
            assert!(state.log.entries().iter().any(|e| e.kind == LogKind::Defeat));
        }

        #[test]
        fn dead_targets_are_noops() {
            let (kernel, mut state, hero, enemy) = setup();
            state.registry.update(enemy, |e| e.hp = 0.0);
            let outcome = kernel
                .deal_damage(
                    &mut state,
                    &HitRequest::new(hero, enemy, HitSpec::atk(1.0, 10.0), DamageKind::Basic),
                )
                .unwrap();
            assert!(outcome.is_none());
        }
    }

    mod break_tests {
        use super::*;

        #[test]
        fn weak_hit_breaks_and_applies_status() {
            let (kernel, mut state, hero, enemy) = setup();
            state.registry.update(hero, |e| e.element = Element::Ice);
            let toughness = state.entity(enemy).unwrap().toughness;
            let outcome = kernel
                .deal_damage(
                    &mut state,
                    &HitRequest::new(hero, enemy, HitSpec::atk(0.1, toughness), DamageKind::Skill),
                )
                .unwrap()
                .unwrap();
            assert!(outcome.broke);
            let enemy_now = state.entity(enemy).unwrap();
            assert!(enemy_now.is_broken());
            let cc = enemy_now.crowd_control().unwrap();
            assert!(matches!(
                cc.kind,
                EffectKind::CrowdControl(spec) if spec.cc == CrowdControlKind::Freeze
            ));
            assert!(state.log.entries().iter().any(|e| e.kind == LogKind::Break));
        }

        #[test]
        fn resisted_element_leaves_toughness() {
            let (kernel, mut state, hero, enemy) = setup();
            state.registry.update(hero, |e| e.element = Element::Wind);
            let toughness = state.entity(enemy).unwrap().toughness;
            let outcome = kernel
                .deal_damage(
                    &mut state,
                    &HitRequest::new(hero, enemy, HitSpec::atk(0.1, 30.0), DamageKind::Basic),
                )
                .unwrap()
                .unwrap();
            assert!(outcome.toughness_damage.abs() < 0.0001);
            assert!((state.entity(enemy).unwrap().toughness - toughness).abs() < 0.0001);
        }
    }

    mod support_tests {
        use super::*;

        #[test]
        fn healing_caps_at_max_hp() {
            let (kernel, mut state, hero, _) = setup();
            let max = state.entity(hero).unwrap().max_hp();
            state.registry.update(hero, |e| e.hp = max - 50.0);
            let healed = kernel.restore_hp(&mut state, hero, hero, 500.0).unwrap();
            assert!((healed - 50.0).abs() < 0.0001);
            assert!((state.entity(hero).unwrap().hp - max).abs() < 0.0001);
        }

        #[test]
        fn shields_stack_up_to_cap() {
            let (kernel, mut state, hero, _) = setup();
            let grant = ShieldGrant {
                scaling: StatKey::Def,
                multiplier: 0.0,
                flat: 200.0,
                duration: 2,
                cap: Some(300.0),
            };
            let first = kernel
                .grant_shield(&mut state, hero, hero, &grant, "barrier")
                .unwrap();
            let second = kernel
                .grant_shield(&mut state, hero, hero, &grant, "barrier")
                .unwrap();
            assert!((first - 200.0).abs() < 0.0001);
            assert!((second - 100.0).abs() < 0.0001);
            assert!((state.entity(hero).unwrap().shield - 300.0).abs() < 0.0001);
        }

        #[test]
        fn shields_drain_oldest_first_and_keep_their_remainder() {
            let (kernel, mut state, hero, enemy) = setup();
            let grant = ShieldGrant {
                scaling: StatKey::Hp,
                multiplier: 0.0,
                flat: 100.0,
                duration: 2,
                cap: None,
            };
            kernel.grant_shield(&mut state, hero, hero, &grant, "a").unwrap();
            kernel.grant_shield(&mut state, hero, hero, &grant, "b").unwrap();
            kernel
                .apply_damage(&mut state, Some(enemy), hero, 150.0, DamageKind::Basic)
                .unwrap();

            let holder = state.entity(hero).unwrap();
            assert!((holder.shield - 50.0).abs() < 0.0001);
            assert!(!holder.has_effect(&"a".into()));
            assert!(holder.has_effect(&"b".into()));

            kernel.remove_effect(&mut state, hero, &"b".into()).unwrap();
            assert!(state.entity(hero).unwrap().shield.abs() < 0.0001);
        }

        #[test]
        fn expiring_one_shield_keeps_the_others() {
            let (kernel, mut state, hero, enemy) = setup();
            let grant = ShieldGrant {
                scaling: StatKey::Hp,
                multiplier: 0.0,
                flat: 100.0,
                duration: 2,
                cap: None,
            };
            kernel.grant_shield(&mut state, hero, hero, &grant, "a").unwrap();
            kernel.grant_shield(&mut state, hero, hero, &grant, "b").unwrap();
            kernel
                .apply_damage(&mut state, Some(enemy), hero, 50.0, DamageKind::Basic)
                .unwrap();
            kernel.remove_effect(&mut state, hero, &"a".into()).unwrap();

            let holder = state.entity(hero).unwrap();
            assert!((holder.shield - 100.0).abs() < 0.0001);
            assert!(holder.has_effect(&"b".into()));
        }

        #[test]
        fn restacking_a_drained_shield_builds_on_what_is_left() {
            let (kernel, mut state, hero, enemy) = setup();
            let grant = ShieldGrant {
                scaling: StatKey::Hp,
                multiplier: 0.0,
                flat: 200.0,
                duration: 2,
                cap: Some(300.0),
            };
            kernel.grant_shield(&mut state, hero, hero, &grant, "barrier").unwrap();
            kernel
                .apply_damage(&mut state, Some(enemy), hero, 150.0, DamageKind::Basic)
                .unwrap();
            let added = kernel
                .grant_shield(&mut state, hero, hero, &grant, "barrier")
                .unwrap();

            assert!((added - 200.0).abs() < 0.0001);
            assert!((state.entity(hero).unwrap().shield - 250.0).abs() < 0.0001);
        }

        #[test]
        fn depleted_pool_drops_shield_effects() {
            let (kernel, mut state, hero, enemy) = setup();
            let grant = ShieldGrant {
                scaling: StatKey::Hp,
                multiplier: 0.0,
                flat: 100.0,
                duration: 2,
                cap: None,
            };
            kernel
                .grant_shield(&mut state, hero, hero, &grant, "barrier")
                .unwrap();
            kernel
                .apply_damage(&mut state, Some(enemy), hero, 150.0, DamageKind::Basic)
                .unwrap();
            assert!(!state.entity(hero).unwrap().has_effect(&"barrier".into()));
        }
    }
}

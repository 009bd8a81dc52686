//! Summons: entities created mid-battle by ability kits.

use serde::{Deserialize, Serialize};

use crate::ability::AbilitySet;
use crate::entity::{Element, Entity, EntityId, EntityKind};
use crate::error::SimError;
use crate::event::{Event, EventKind};
use crate::handler::KitId;
use crate::kernel::Kernel;
use crate::log::{LogEntry, LogKind};
use crate::scheduler;
use crate::state::GameState;
use crate::stats::{self, StatBlock};

/// Template of a summon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummonSpec {
    /// Display name; also the identity of the summon per owner.
    pub name: String,
    /// Element, defaulting to the owner's.
    pub element: Option<Element>,
    /// Base stats of the summon.
    pub stats: StatBlock,
    /// Fractions of the owner's derived stats added to the base stats.
    pub owner_ratios: StatBlock,
    /// Abilities. Summons act with their skill when they have one.
    pub abilities: AbilitySet,
    /// Kit registered for the summon.
    pub kit: Option<KitId>,
    /// Excluded from enemy targeting.
    pub untargetable: bool,
}

impl Kernel {
    /// Creates a summon owned by `owner`, placed after it in roster order.
    ///
    /// The summon starts with full HP and a full action value. If the owner
    /// already has an alive summon of the same name, that summon is restored
    /// to full HP instead and its id returned.
    ///
    /// # Returns
    ///
    /// The summon's id, or `None` if the owner is missing or dead.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn summon(
        &self,
        state: &mut GameState,
        owner: EntityId,
        spec: &SummonSpec,
    ) -> Result<Option<EntityId>, SimError> {
        if !state.registry.is_alive(owner) {
            return Ok(None);
        }
        let existing = state
            .registry
            .iter()
            .find(|e| e.owner == Some(owner) && e.name == spec.name && e.is_alive())
            .map(Entity::id);
        if let Some(existing) = existing {
            state.registry.update(existing, |e| e.hp = e.max_hp());
            return Ok(Some(existing));
        }

        let Some(master) = state.entity(owner) else {
            return Ok(None);
        };
        let mut base = spec.stats.clone();
        for (stat, ratio) in spec.owner_ratios.iter() {
            base.add(stat, master.stats.get(stat) * ratio);
        }
        let side = master.side();
        let level = master.level;
        let rank = master.rank;
        let element = spec.element.unwrap_or(master.element);

        let id = state.registry.spawn_after(owner, |id| {
            let mut entity = Entity::new(id, EntityKind::Summon, side, spec.name.clone());
            entity.level = level;
            entity.rank = rank;
            entity.element = element;
            entity.base_stats = base;
            entity.abilities = spec.abilities.clone();
            entity.owner = Some(owner);
            entity.kit = spec.kit.clone();
            entity.untargetable = spec.untargetable;
            entity
        });
        stats::rebuild(&mut state.registry, id);
        state.registry.update(id, |e| {
            e.hp = e.max_hp();
            e.action_value = scheduler::action_value(e.speed());
        });
        scheduler::resync(state);

        if let Some(kit_id) = &spec.kit {
            match self.catalog().get(kit_id) {
                Some(kit) => {
                    state.handlers.register(kit.register(id, level, rank));
                }
                None => tracing::warn!(kit = %kit_id, summon = %spec.name, "unknown kit, summon has no handler"),
            }
        }
        tracing::debug!(%owner, summon = %id, name = %spec.name, "summon created");

        if let Some(entity) = state.entity(id) {
            let mut entry = LogEntry::new(state.time, LogKind::Summon).with_actor(entity);
            entry.snapshot(entity);
            entry.skill_points = state.skill_points;
            state.record(entry);
        }
        self.emit(
            state,
            &Event::new(EventKind::SummonCreated)
                .with_source(owner)
                .with_target(id),
        )?;
        Ok(Some(id))
    }

    /// Removes a summon from play: HP to zero, handlers unregistered, queue
    /// entry dropped. Publishes `UnitDefeated` without a killer.
    ///
    /// Non-summons are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn dismiss(&self, state: &mut GameState, id: EntityId) -> Result<(), SimError> {
        if !state
            .entity(id)
            .is_some_and(|e| e.is_summon() && e.is_alive())
        {
            return Ok(());
        }
        state.registry.update(id, |e| {
            e.hp = 0.0;
            e.shield = 0.0;
        });
        state.handlers.unregister_owner(id);
        scheduler::resync(state);
        if let Some(entity) = state.entity(id) {
            let mut entry = LogEntry::new(state.time, LogKind::Defeat)
                .with_actor(entity)
                .with_details("dismissed");
            entry.snapshot(entity);
            state.record(entry);
        }
        self.emit(state, &Event::new(EventKind::UnitDefeated).with_target(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::DamageKind;
    use crate::stats::StatKey;
    use crate::tests::helpers;

    fn spirit() -> SummonSpec {
        SummonSpec {
            name: "Spirit".into(),
            stats: StatBlock::new().with(StatKey::Spd, 120.0),
            owner_ratios: StatBlock::new()
                .with(StatKey::Hp, 0.5)
                .with(StatKey::Atk, 1.0),
            ..SummonSpec::default()
        }
    }

    #[test]
    fn summon_inherits_owner_stats_and_joins_queue() {
        let kernel = Kernel::default();
        let mut state = helpers::duel_state();
        let hero = helpers::first_ally(&state);
        scheduler::initialize(&mut state);

        let id = kernel.summon(&mut state, hero, &spirit()).unwrap().unwrap();
        let owner_hp = state.entity(hero).unwrap().max_hp();
        let summon = state.entity(id).unwrap();
        assert!(summon.is_summon());
        assert_eq!(summon.owner, Some(hero));
        assert!((summon.max_hp() - owner_hp * 0.5).abs() < 0.0001);
        assert!((summon.hp - summon.max_hp()).abs() < 0.0001);
        assert!(state.queue.contains(id));
        assert_eq!(state.registry.position(id), Some(state.registry.position(hero).unwrap() + 1));
        assert_eq!(state.log.entries().last().unwrap().kind, LogKind::Summon);
    }

    #[test]
    fn resummon_restores_existing() {
        let kernel = Kernel::default();
        let mut state = helpers::duel_state();
        let hero = helpers::first_ally(&state);
        let first = kernel.summon(&mut state, hero, &spirit()).unwrap().unwrap();
        state.registry.update(first, |e| e.hp = 1.0);
        let second = kernel.summon(&mut state, hero, &spirit()).unwrap().unwrap();
        assert_eq!(first, second);
        let summon = state.entity(first).unwrap();
        assert!((summon.hp - summon.max_hp()).abs() < 0.0001);
    }

    #[test]
    fn owner_defeat_dismisses_summon() {
        let kernel = Kernel::default();
        let mut state = helpers::duel_state();
        let hero = helpers::first_ally(&state);
        let enemy = helpers::first_enemy(&state);
        scheduler::initialize(&mut state);
        let id = kernel.summon(&mut state, hero, &spirit()).unwrap().unwrap();

        let hp = state.entity(hero).unwrap().hp;
        kernel
            .apply_damage(&mut state, Some(enemy), hero, hp, DamageKind::Basic)
            .unwrap();
        assert!(!state.registry.is_alive(id));
        assert!(!state.queue.contains(id));
    }

    #[test]
    fn dismiss_ignores_non_summons() {
        let kernel = Kernel::default();
        let mut state = helpers::duel_state();
        let hero = helpers::first_ally(&state);
        kernel.dismiss(&mut state, hero).unwrap();
        assert!(state.registry.is_alive(hero));
    }
}

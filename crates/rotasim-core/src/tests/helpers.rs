//! Test helper functions for setting up battles and entities.
//!
//! This module provides factory functions and setup utilities that make
//! writing tests more ergonomic and consistent. States built here have no
//! handlers registered and no `BattleStart` dispatched; the queue is empty
//! until the test initializes it.

use crate::ability::{AbilitySet, AbilitySpec, TargetKind};
use crate::config::{CharacterConfig, EnemyConfig, SimulationConfig};
use crate::damage::CritPolicy;
use crate::entity::{Element, Entity, EntityId, EntityKind, RotationConfig, Side, Weaknesses};
use crate::registry::Registry;
use crate::state::GameState;
use crate::stats::{self, StatBlock, StatKey};

/// Seed used by every hand-built state.
pub const TEST_SEED: u64 = 7;

/// HP of the training dummies; large enough that nothing dies by accident.
pub const DUMMY_HP: f64 = 1_000_000.0;

// =============================================================================
// Entity Factories
// =============================================================================

/// Weak to every element except Wind.
fn dummy_weaknesses() -> Weaknesses {
    Weaknesses::from_elements(&[
        Element::Physical,
        Element::Fire,
        Element::Ice,
        Element::Lightning,
        Element::Quantum,
        Element::Imaginary,
    ])
}

/// Spawns a party member with the standard character defaults.
///
/// # Arguments
///
/// * `registry` - Registry to spawn into
/// * `name` - Display name
/// * `hp` - Base HP
/// * `spd` - Base speed
///
/// # Returns
///
/// The spawned character's ID.
pub fn spawn_character(registry: &mut Registry, name: &str, hp: f64, spd: f64) -> EntityId {
    registry.spawn(|id| {
        let mut e = Entity::new(id, EntityKind::Character, Side::Ally, name);
        e.element = Element::Lightning;
        e.base_stats = StatBlock::new()
            .with(StatKey::Hp, hp)
            .with(StatKey::Atk, 1000.0)
            .with(StatKey::Def, 500.0)
            .with(StatKey::Spd, spd)
            .with(StatKey::MaxEnergy, 120.0)
            .with(StatKey::CritRate, 0.05)
            .with(StatKey::CritDmg, 0.5);
        e
    })
}

/// Spawns a level 80 training dummy: 1000 DEF, 100 toughness, weak to
/// everything but Wind.
///
/// # Returns
///
/// The spawned enemy's ID.
pub fn spawn_dummy(registry: &mut Registry, name: &str, spd: f64) -> EntityId {
    registry.spawn(|id| {
        let mut e = Entity::new(id, EntityKind::Enemy, Side::Enemy, name);
        e.level = 80;
        e.weaknesses = dummy_weaknesses();
        e.max_toughness = 100.0;
        e.base_stats = StatBlock::new()
            .with(StatKey::Hp, DUMMY_HP)
            .with(StatKey::Atk, 300.0)
            .with(StatKey::Def, 1000.0)
            .with(StatKey::Spd, spd);
        e
    })
}

/// Derives stats and fills HP, toughness and energy the way a fresh battle
/// does.
fn finish(mut registry: Registry) -> GameState {
    stats::rebuild_all(&mut registry);
    let ids: Vec<EntityId> = registry.ids().collect();
    for id in ids {
        registry.update(id, |e| {
            e.hp = e.max_hp();
            e.toughness = e.max_toughness;
            if e.kind() == EntityKind::Character {
                e.energy = e.max_energy() * 0.5;
            }
        });
    }
    GameState::new(registry, TEST_SEED)
}

// =============================================================================
// Test Scenario Setup
// =============================================================================

/// One character ("Hero", SPD 110) against one dummy ("Dummy", SPD 90).
///
/// The hero has 3000 HP, 1000 ATK, 500 DEF and only a basic attack.
#[must_use]
pub fn duel_state() -> GameState {
    let mut registry = Registry::new();
    spawn_character(&mut registry, "Hero", 3000.0, 110.0);
    spawn_dummy(&mut registry, "Dummy", 90.0);
    finish(registry)
}

/// Three characters against three dummies.
///
/// Party order is "Hero" (SPD 110), "Sidekick" (SPD 100), "Medic" (SPD 95),
/// each with 5000 HP. Dummies are "Dummy A", "Dummy B" and "Dummy C".
#[must_use]
pub fn trio_state() -> GameState {
    let mut registry = Registry::new();
    spawn_character(&mut registry, "Hero", 5000.0, 110.0);
    spawn_character(&mut registry, "Sidekick", 5000.0, 100.0);
    spawn_character(&mut registry, "Medic", 5000.0, 95.0);
    spawn_dummy(&mut registry, "Dummy A", 90.0);
    spawn_dummy(&mut registry, "Dummy B", 85.0);
    spawn_dummy(&mut registry, "Dummy C", 80.0);
    finish(registry)
}

/// A winnable two-member battle config without kits.
///
/// "Seele" is a Quantum attacker with a skill and an ultimate; "March" is a
/// slower Ice support. The single enemy is weak to both.
#[must_use]
pub fn sample_config() -> SimulationConfig {
    let seele = CharacterConfig {
        name: "Seele".into(),
        element: Element::Quantum,
        stats: StatBlock::new()
            .with(StatKey::Hp, 4000.0)
            .with(StatKey::Atk, 2500.0)
            .with(StatKey::Def, 600.0)
            .with(StatKey::Spd, 115.0),
        abilities: AbilitySet {
            skill: Some(AbilitySpec::single_target("Sheathed Blade", 2.2, 20.0, 30.0)),
            ultimate: Some(AbilitySpec::single_target("Butterfly Flurry", 4.25, 90.0, 5.0)),
            ..AbilitySet::default()
        },
        rotation: RotationConfig {
            sequence: "sbb".into(),
            ..RotationConfig::default()
        },
        ..CharacterConfig::default()
    };
    let march = CharacterConfig {
        name: "March".into(),
        element: Element::Ice,
        stats: StatBlock::new()
            .with(StatKey::Hp, 3500.0)
            .with(StatKey::Atk, 1500.0)
            .with(StatKey::Def, 900.0)
            .with(StatKey::Spd, 101.0),
        abilities: AbilitySet {
            ultimate: Some(
                AbilitySpec::single_target("Glacial Cascade", 1.5, 60.0, 5.0)
                    .with_target(TargetKind::AllEnemies),
            ),
            ..AbilitySet::default()
        },
        rotation: RotationConfig {
            sequence: "b".into(),
            ..RotationConfig::default()
        },
        ..CharacterConfig::default()
    };
    let slime = EnemyConfig {
        name: "Slime".into(),
        hp: 20_000.0,
        atk: 300.0,
        speed: 90.0,
        toughness: 60.0,
        ..EnemyConfig::default()
    };
    SimulationConfig {
        characters: vec![seele, march],
        enemies: vec![slime],
        weaknesses: vec![Element::Quantum, Element::Ice],
        rounds: 10,
        seed: 42,
        crit_policy: CritPolicy::Roll,
        ..SimulationConfig::default()
    }
}

// =============================================================================
// Queries
// =============================================================================

/// First entity on the ally side.
///
/// # Panics
///
/// Panics if the state has no allies.
#[must_use]
pub fn first_ally(state: &GameState) -> EntityId {
    allies(state)[0]
}

/// First entity on the enemy side.
///
/// # Panics
///
/// Panics if the state has no enemies.
#[must_use]
pub fn first_enemy(state: &GameState) -> EntityId {
    enemies(state)[0]
}

/// Every ally in roster order, alive or not.
#[must_use]
pub fn allies(state: &GameState) -> Vec<EntityId> {
    state
        .registry
        .iter()
        .filter(|e| e.side() == Side::Ally)
        .map(Entity::id)
        .collect()
}

/// Every enemy in roster order, alive or not.
#[must_use]
pub fn enemies(state: &GameState) -> Vec<EntityId> {
    state
        .registry
        .iter()
        .filter(|e| e.side() == Side::Enemy)
        .map(Entity::id)
        .collect()
}

/// Total HP lost by `id` relative to `before`.
#[must_use]
pub fn hp_lost(before: &GameState, after: &GameState, id: EntityId) -> f64 {
    let hp = |state: &GameState| state.entity(id).map_or(0.0, |e| e.hp);
    hp(before) - hp(after)
}

//! Battle configuration and initial state construction.
//!
//! A [`SimulationConfig`] is plain data, usually parsed from JSON. Every
//! field has a default, so a config only needs names, HP and speed:
//!
//! ```
//! use rotasim_core::config::{create_initial_state, SimulationConfig};
//! use rotasim_core::handler::KitCatalog;
//!
//! let config: SimulationConfig = serde_json::from_str(r#"{
//!     "characters": [{ "name": "Hero", "stats": { "hp": 3000, "atk": 1200, "spd": 110 } }],
//!     "enemies": [{ "name": "Slime", "hp": 50000, "speed": 90 }],
//!     "weaknesses": ["fire"],
//!     "rounds": 3
//! }"#).unwrap();
//!
//! let state = create_initial_state(&config, &KitCatalog::new()).unwrap();
//! assert_eq!(state.registry.len(), 2);
//! assert_eq!(state.skill_points, 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::ability::AbilitySet;
use crate::damage::CritPolicy;
use crate::energy::INITIAL_ENERGY_RATIO;
use crate::entity::{Element, Entity, EntityId, EntityKind, RotationConfig, Side, Weaknesses};
use crate::error::ConfigError;
use crate::effect::{Effect, EffectId, EffectKind};
use crate::handler::{self, EquippedKit, KitCatalog, KitId};
use crate::registry::Registry;
use crate::state::GameState;
use crate::stats::{self, Modifier, StatBlock, StatKey};

/// Action-value budget of the first round.
pub const FIRST_ROUND_BUDGET: f64 = 150.0;

/// Action-value budget of every later round.
pub const ROUND_BUDGET: f64 = 100.0;

/// All-element resistance of an enemy to elements it is not weak to.
pub const DEFAULT_ENEMY_RES: f64 = 0.2;

// =============================================================================
// Limits
// =============================================================================

/// Iteration caps guarding against runaway loops.
///
/// Hitting a cap ends the phase early and records a
/// [`Diagnostic`](crate::state::Diagnostic); it never fails the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Actions one entity may take in a single turn.
    pub max_actions_per_turn: usize,
    /// Pending follow-ups drained per phase.
    pub max_pending: usize,
    /// Interrupts executed per turn.
    pub max_interrupts: usize,
    /// Nesting depth of re-entrant event publishing.
    pub max_event_depth: usize,
    /// Turns in a whole run.
    pub max_turns: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_actions_per_turn: 8,
            max_pending: 32,
            max_interrupts: 16,
            max_event_depth: 16,
            max_turns: 500,
        }
    }
}

// =============================================================================
// Config types
// =============================================================================

/// One party member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Display name.
    pub name: String,
    /// Disabled members are left out of the battle.
    pub enabled: bool,
    /// Character level.
    pub level: u32,
    /// Upgrade rank passed to the kit.
    pub rank: u32,
    /// Damage element.
    pub element: Element,
    /// Base stats. `hp` and `spd` are required.
    pub stats: StatBlock,
    /// Abilities.
    pub abilities: AbilitySet,
    /// Rotation and ultimate strategy.
    pub rotation: RotationConfig,
    /// Ability kit.
    pub kit: Option<KitId>,
    /// Equipment pieces in slot order.
    pub equipment: Vec<EquipmentConfig>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            level: 80,
            rank: 0,
            element: Element::Physical,
            stats: StatBlock::new(),
            abilities: AbilitySet::default(),
            rotation: RotationConfig::default(),
            kit: None,
            equipment: Vec::new(),
        }
    }
}

impl CharacterConfig {
    /// Base stats with defaults filled in for unset keys.
    #[must_use]
    pub fn base_stats(&self) -> StatBlock {
        let mut base = self.stats.clone();
        for (key, value) in [
            (StatKey::CritRate, 0.05),
            (StatKey::CritDmg, 0.5),
            (StatKey::MaxEnergy, 120.0),
            (StatKey::Aggro, 100.0),
        ] {
            if !base.contains(key) {
                base.set(key, value);
            }
        }
        base
    }
}

/// An equipment piece worn by a party member.
///
/// Passive modifiers land as one permanent buff that cannot be dispelled.
/// The optional kit registers after the wearer's own kit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentConfig {
    /// Display name, also used for the passive effect's id.
    pub name: String,
    /// Upgrade rank passed to the kit.
    pub rank: u32,
    /// Unconditional stat modifiers.
    pub passives: Vec<Modifier>,
    /// Kit providing the piece's triggered behaviour.
    pub kit: Option<KitId>,
}

impl EquipmentConfig {
    /// Id of the passive effect this piece grants.
    #[must_use]
    pub fn passive_id(&self) -> EffectId {
        EffectId::new(format!("equipment_{}", self.name))
    }

    /// The permanent passive buff on `wearer`, if the piece has passives.
    #[must_use]
    pub fn passive_effect(&self, wearer: EntityId) -> Option<Effect> {
        if self.passives.is_empty() {
            return None;
        }
        let effect = self.passives.iter().cloned().fold(
            Effect::new(self.passive_id(), self.name.clone(), EffectKind::Buff).from_source(wearer),
            Effect::with_modifier,
        );
        Some(effect)
    }
}

/// One enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Display name.
    pub name: String,
    /// Enemy level.
    pub level: u32,
    /// Max HP.
    pub hp: f64,
    /// ATK.
    pub atk: f64,
    /// DEF; defaults to `200 + 10 × level`.
    pub def: Option<f64>,
    /// Speed.
    pub speed: f64,
    /// Max toughness.
    pub toughness: f64,
    /// Damage element.
    pub element: Element,
    /// Overrides the battle-wide weaknesses.
    pub weaknesses: Option<Vec<Element>>,
    /// Resistance to elements the enemy is not weak to.
    pub res: f64,
    /// Effect resistance.
    pub effect_res: f64,
    /// Abilities.
    pub abilities: AbilitySet,
    /// Ability kit.
    pub kit: Option<KitId>,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: 80,
            hp: 0.0,
            atk: 500.0,
            def: None,
            speed: 100.0,
            toughness: 60.0,
            element: Element::Physical,
            weaknesses: None,
            res: DEFAULT_ENEMY_RES,
            effect_res: 0.0,
            abilities: AbilitySet::default(),
            kit: None,
        }
    }
}

impl EnemyConfig {
    /// Base stats of the enemy given its effective weaknesses.
    #[must_use]
    pub fn base_stats(&self, weaknesses: Weaknesses) -> StatBlock {
        let def = self
            .def
            .unwrap_or_else(|| 200.0 + 10.0 * f64::from(self.level));
        let mut base = StatBlock::new()
            .with(StatKey::Hp, self.hp)
            .with(StatKey::Atk, self.atk)
            .with(StatKey::Def, def)
            .with(StatKey::Spd, self.speed)
            .with(StatKey::EffectRes, self.effect_res);
        for element in Element::ALL {
            if !weaknesses.has(element) {
                base.set(element.res_stat(), self.res);
            }
        }
        base
    }
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Party in roster order.
    pub characters: Vec<CharacterConfig>,
    /// Enemies in roster order.
    pub enemies: Vec<EnemyConfig>,
    /// Weaknesses shared by every enemy without its own list.
    pub weaknesses: Vec<Element>,
    /// Round budget.
    pub rounds: u32,
    /// RNG seed.
    pub seed: u64,
    /// Crit sampling.
    pub crit_policy: CritPolicy,
    /// Iteration caps.
    pub limits: Limits,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            characters: Vec::new(),
            enemies: Vec::new(),
            weaknesses: Vec::new(),
            rounds: 5,
            seed: 0,
            crit_policy: CritPolicy::Roll,
            limits: Limits::default(),
        }
    }
}

impl SimulationConfig {
    /// Clock value at which the battle times out: `rounds × 100 + 50`.
    #[must_use]
    pub fn time_budget(&self) -> f64 {
        FIRST_ROUND_BUDGET + ROUND_BUDGET * f64::from(self.rounds.saturating_sub(1))
    }

    /// Checks the config without building a state.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self, catalog: &KitCatalog) -> Result<(), ConfigError> {
        if self.rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        let party: Vec<&CharacterConfig> = self.characters.iter().filter(|c| c.enabled).collect();
        if party.is_empty() {
            return Err(ConfigError::NoPartyMembers);
        }
        if self.enemies.is_empty() {
            return Err(ConfigError::NoEnemies);
        }
        for member in party {
            let sequence = &member.rotation.sequence;
            if sequence.is_empty() || sequence.chars().any(|c| c != 's' && c != 'b') {
                return Err(ConfigError::InvalidRotation {
                    name: member.name.clone(),
                    rotation: sequence.clone(),
                });
            }
            check_vitals(&member.name, member.stats.get(StatKey::Hp), member.stats.get(StatKey::Spd))?;
            check_kit(&member.name, member.kit.as_ref(), catalog)?;
            for piece in &member.equipment {
                check_kit(&member.name, piece.kit.as_ref(), catalog)?;
            }
        }
        for enemy in &self.enemies {
            check_vitals(&enemy.name, enemy.hp, enemy.speed)?;
            check_kit(&enemy.name, enemy.kit.as_ref(), catalog)?;
        }
        Ok(())
    }
}

fn check_vitals(name: &str, hp: f64, speed: f64) -> Result<(), ConfigError> {
    if hp.is_nan() || hp <= 0.0 {
        return Err(ConfigError::InvalidHp {
            name: name.to_string(),
            hp,
        });
    }
    if speed.is_nan() || speed <= 0.0 {
        return Err(ConfigError::InvalidSpeed {
            name: name.to_string(),
            speed,
        });
    }
    Ok(())
}

fn check_kit(name: &str, kit: Option<&KitId>, catalog: &KitCatalog) -> Result<(), ConfigError> {
    match kit {
        Some(kit) if !catalog.contains(kit) => Err(ConfigError::UnknownKit {
            name: name.to_string(),
            kit: kit.clone(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Initial state
// =============================================================================

/// Builds the initial battle state.
///
/// Characters come first in roster order, then enemies. Every entity starts
/// at full HP and toughness; characters start with half their max energy.
/// Kit handlers are registered in roster order. The scheduler is left empty
/// until `BattleStart` is dispatched.
///
/// # Errors
///
/// Returns [`ConfigError`] for an empty party or enemy list, an invalid
/// rotation, non-positive HP or speed, a zero round budget or an unknown kit.
pub fn create_initial_state(
    config: &SimulationConfig,
    catalog: &KitCatalog,
) -> Result<GameState, ConfigError> {
    config.validate(catalog)?;

    let mut registry = Registry::new();
    for member in config.characters.iter().filter(|c| c.enabled) {
        registry.spawn(|id| {
            let mut e = Entity::new(id, EntityKind::Character, Side::Ally, member.name.clone());
            e.level = member.level;
            e.rank = member.rank;
            e.element = member.element;
            e.base_stats = member.base_stats();
            e.abilities = member.abilities.clone();
            e.rotation = member.rotation.clone();
            e.kit.clone_from(&member.kit);
            e.equipment = member
                .equipment
                .iter()
                .filter_map(|piece| {
                    piece.kit.clone().map(|kit| EquippedKit {
                        kit,
                        rank: piece.rank,
                    })
                })
                .collect();
            e.effects = member
                .equipment
                .iter()
                .filter_map(|piece| piece.passive_effect(id))
                .collect();
            e
        });
    }
    let shared = Weaknesses::from_elements(&config.weaknesses);
    for enemy in &config.enemies {
        let weaknesses = enemy
            .weaknesses
            .as_deref()
            .map_or(shared, Weaknesses::from_elements);
        registry.spawn(|id| {
            let mut e = Entity::new(id, EntityKind::Enemy, Side::Enemy, enemy.name.clone());
            e.level = enemy.level;
            e.element = enemy.element;
            e.weaknesses = weaknesses;
            e.base_stats = enemy.base_stats(weaknesses);
            e.max_toughness = enemy.toughness.max(0.0);
            e.abilities = enemy.abilities.clone();
            e.kit.clone_from(&enemy.kit);
            e
        });
    }

    stats::rebuild_all(&mut registry);
    let ids: Vec<_> = registry.ids().collect();
    for id in ids {
        registry.update(id, |e| {
            e.hp = e.max_hp();
            e.toughness = e.max_toughness;
            e.energy = e.max_energy() * INITIAL_ENERGY_RATIO;
        });
    }

    let mut state = GameState::new(registry, config.seed);
    state.time_budget = config.time_budget();
    state.crit_policy = config.crit_policy;
    let registered = handler::register_kits(&mut state, catalog)?;
    tracing::debug!(
        entities = state.registry.len(),
        handlers = registered,
        budget = state.time_budget,
        "initial state built"
    );
    Ok(state)
}

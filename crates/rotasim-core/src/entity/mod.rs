//! Entity module for the combat kernel.
//!
//! This module provides the core entity types:
//! - [`EntityId`]: Unique identifier for entities
//! - [`EntityKind`]: Character, enemy or summon classification
//! - [`Side`]: Which team an entity fights for
//! - [`Entity`]: The complete combat record
//!
//! # Architecture
//!
//! An `Entity` is a plain value. The registry stores each record behind an
//! `Arc` and replaces it whole on every write, so a snapshot handed to an
//! ability handler never changes underneath it.
//!
//! # Example
//!
//! ```
//! use rotasim_core::entity::{Entity, EntityId, EntityKind, Side};
//!
//! let hero = Entity::new(EntityId::new(1), EntityKind::Character, Side::Ally, "Hero");
//!
//! assert_eq!(hero.id().as_u64(), 1);
//! assert!(!hero.is_enemy());
//! ```

pub mod components;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ability::AbilitySet;
use crate::effect::{Effect, EffectId, EffectTags};
use crate::handler::{EquippedKit, KitId};
use crate::stats::{StatBlock, StatKey};

pub use components::{Element, RotationConfig, UltStrategy, Weaknesses};

/// Unique identifier for an entity.
///
/// `EntityId` is a newtype wrapper around `u64`. Identifiers are assigned
/// monotonically by the registry and never reused, so they also record
/// creation order.
///
/// # Example
///
/// ```
/// use rotasim_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Classification of a combat entity.
///
/// The kind decides how the orchestrator picks the entity's turn action:
/// characters follow their rotation, enemies basic-attack an aggro-weighted
/// target, and summons use their skill.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Party member controlled by a rotation config.
    Character,
    /// Opponent controlled by the enemy routine.
    Enemy,
    /// Entity created mid-battle by an ability handler.
    Summon,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character => write!(f, "Character"),
            Self::Enemy => write!(f, "Enemy"),
            Self::Summon => write!(f, "Summon"),
        }
    }
}

/// Team affiliation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The configured party and its summons.
    Ally,
    /// The configured enemies.
    Enemy,
}

impl Side {
    /// Returns the opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Ally => Self::Enemy,
            Self::Enemy => Self::Ally,
        }
    }
}

// =============================================================================
// Entity
// =============================================================================

/// A combat entity: character, enemy or summon.
///
/// Identity fields are private and fixed at construction. Everything else is
/// public combat state that transitions replace wholesale through the
/// registry.
///
/// # Invariants
///
/// - `0 <= hp <= max_hp()` for every persisted record
/// - `stats` is rebuilt from `base_stats` and `effects` after every effect
///   change, so it is never edited directly by ability code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier.
    id: EntityId,
    /// Character, enemy or summon.
    kind: EntityKind,
    /// Team affiliation.
    side: Side,
    /// Display name used in the log.
    pub name: String,
    /// Entity level, used by the defence and break formulas.
    pub level: u32,
    /// Upgrade rank passed to the ability kit factory.
    pub rank: u32,
    /// Element of the damage this entity deals.
    pub element: Element,
    /// Elements that reduce this entity's toughness.
    pub weaknesses: Weaknesses,
    /// Stats before any effect is applied.
    pub base_stats: StatBlock,
    /// Stats after all active effect modifiers.
    pub stats: StatBlock,
    /// Current hit points.
    pub hp: f64,
    /// Current shield pool.
    pub shield: f64,
    /// Current toughness; zero means broken.
    pub toughness: f64,
    /// Toughness restored on recovery.
    pub max_toughness: f64,
    /// Current energy.
    pub energy: f64,
    /// Active effects in application order.
    pub effects: Vec<Effect>,
    /// Remaining action value until this entity's next turn.
    pub action_value: f64,
    /// Abilities available to this entity.
    pub abilities: AbilitySet,
    /// Rotation and ultimate strategy config.
    pub rotation: RotationConfig,
    /// Position within the rotation string.
    pub rotation_cursor: usize,
    /// Turns until the ultimate is usable again.
    pub ult_cooldown: u32,
    /// Owner of a summon.
    pub owner: Option<EntityId>,
    /// Partner entity for paired mechanics.
    pub linked_target: Option<EntityId>,
    /// Ability kit registered for this entity.
    pub kit: Option<KitId>,
    /// Equipment kits registered after the entity's own kit.
    pub equipment: Vec<EquippedKit>,
    /// Excluded from enemy targeting while set.
    pub untargetable: bool,
}

impl Entity {
    /// Creates an entity with empty stats and no abilities beyond a basic
    /// attack.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique identifier
    /// * `kind` - Character, enemy or summon
    /// * `side` - Team affiliation
    /// * `name` - Display name
    #[must_use]
    pub fn new(id: EntityId, kind: EntityKind, side: Side, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            side,
            name: name.into(),
            level: 80,
            rank: 0,
            element: Element::Physical,
            weaknesses: Weaknesses::empty(),
            base_stats: StatBlock::new(),
            stats: StatBlock::new(),
            hp: 0.0,
            shield: 0.0,
            toughness: 0.0,
            max_toughness: 0.0,
            energy: 0.0,
            effects: Vec::new(),
            action_value: 0.0,
            abilities: AbilitySet::default(),
            rotation: RotationConfig::default(),
            rotation_cursor: 0,
            ult_cooldown: 0,
            owner: None,
            linked_target: None,
            kit: None,
            equipment: Vec::new(),
            untargetable: false,
        }
    }

    /// Returns the entity's unique identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity's kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the entity's side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Returns true while HP is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Returns true if this entity fights on the enemy side.
    #[must_use]
    pub fn is_enemy(&self) -> bool {
        self.side == Side::Enemy
    }

    /// Returns true if this entity was summoned mid-battle.
    #[must_use]
    pub fn is_summon(&self) -> bool {
        self.kind == EntityKind::Summon
    }

    /// Returns true if `other` fights on the opposing side.
    #[must_use]
    pub fn is_opponent_of(&self, other: &Self) -> bool {
        self.side != other.side
    }

    /// Maximum HP from derived stats.
    #[must_use]
    pub fn max_hp(&self) -> f64 {
        self.stats.get(StatKey::Hp)
    }

    /// Current speed from derived stats.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.stats.get(StatKey::Spd)
    }

    /// Maximum energy from derived stats.
    #[must_use]
    pub fn max_energy(&self) -> f64 {
        self.stats.get(StatKey::MaxEnergy)
    }

    /// Returns true if this entity has toughness and it is depleted.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.max_toughness > 0.0 && self.toughness <= 0.0
    }

    /// Returns the active effect with the given id.
    #[must_use]
    pub fn effect(&self, id: &EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| &e.id == id)
    }

    /// Returns true if an effect with the given id is active.
    #[must_use]
    pub fn has_effect(&self, id: &EffectId) -> bool {
        self.effect(id).is_some()
    }

    /// Returns true if any active effect carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: EffectTags) -> bool {
        self.effects.iter().any(|e| e.tags.contains(tag))
    }

    /// Returns the active crowd-control effect, if any.
    #[must_use]
    pub fn crowd_control(&self) -> Option<&Effect> {
        self.effects.iter().find(|e| e.is_crowd_control())
    }

    /// Returns true if the ultimate can fire: energy full, no cooldown, and an
    /// ultimate ability exists.
    #[must_use]
    pub fn ult_ready(&self) -> bool {
        self.abilities.ultimate.is_some()
            && self.ult_cooldown == 0
            && self.max_energy() > 0.0
            && self.energy >= self.max_energy()
    }
}

//! Stat keys, stat blocks and modifiers.
//!
//! - [`StatKey`]: Every stat the damage, healing and scheduling formulas read
//! - [`StatBlock`]: Sparse map of stat values with a zero default
//! - [`Modifier`]: A (stat, operation, value) triple contributed by an effect
//!
//! Derived stats are produced by [`builder::build_stats`]; nothing else writes
//! to `Entity::stats`.
//!
//! # Dynamic modifiers
//!
//! A modifier value may be [`ModifierValue::Dynamic`], which is evaluated
//! against the live registry every time the host's stats are rebuilt. It is
//! never cached, so "20% of the caster's ATK" follows the caster's ATK as it
//! changes.

pub mod builder;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::{Element, EntityId};

pub use builder::{build_stats, rebuild, rebuild_all};

// =============================================================================
// StatKey
// =============================================================================

/// Identifier of a single stat.
///
/// `Hp`, `Atk`, `Def` and `Spd` are *scaled* stats: percent modifiers
/// multiply the base value. Every other stat is *additive*: flat and percent
/// modifiers are both summed onto the base value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum StatKey {
    Hp,
    Atk,
    Def,
    Spd,
    CritRate,
    CritDmg,
    BreakEffect,
    BreakEfficiency,
    EnergyRegenRate,
    MaxEnergy,
    EffectHitRate,
    EffectRes,
    OutgoingHealingBoost,
    IncomingHealingBoost,
    ShieldStrengthBoost,
    Aggro,
    DefReduction,
    DefIgnore,
    AllTypeDmgBoost,
    BasicDmgBoost,
    SkillDmgBoost,
    UltimateDmgBoost,
    FollowUpDmgBoost,
    DotDmgBoost,
    PhysicalDmgBoost,
    FireDmgBoost,
    IceDmgBoost,
    LightningDmgBoost,
    WindDmgBoost,
    QuantumDmgBoost,
    ImaginaryDmgBoost,
    PhysicalRes,
    FireRes,
    IceRes,
    LightningRes,
    WindRes,
    QuantumRes,
    ImaginaryRes,
    AllTypeResPen,
    PhysicalResPen,
    FireResPen,
    IceResPen,
    LightningResPen,
    WindResPen,
    QuantumResPen,
    ImaginaryResPen,
    AllTypeVuln,
    PhysicalVuln,
    FireVuln,
    IceVuln,
    LightningVuln,
    WindVuln,
    QuantumVuln,
    ImaginaryVuln,
}

impl StatKey {
    /// Returns true for stats where percent modifiers scale the base value.
    #[must_use]
    pub const fn is_scaled(self) -> bool {
        matches!(self, Self::Hp | Self::Atk | Self::Def | Self::Spd)
    }
}

impl Element {
    /// Damage boost stat for this element.
    #[must_use]
    pub const fn dmg_boost_stat(self) -> StatKey {
        match self {
            Self::Physical => StatKey::PhysicalDmgBoost,
            Self::Fire => StatKey::FireDmgBoost,
            Self::Ice => StatKey::IceDmgBoost,
            Self::Lightning => StatKey::LightningDmgBoost,
            Self::Wind => StatKey::WindDmgBoost,
            Self::Quantum => StatKey::QuantumDmgBoost,
            Self::Imaginary => StatKey::ImaginaryDmgBoost,
        }
    }

    /// Resistance stat for this element.
    #[must_use]
    pub const fn res_stat(self) -> StatKey {
        match self {
            Self::Physical => StatKey::PhysicalRes,
            Self::Fire => StatKey::FireRes,
            Self::Ice => StatKey::IceRes,
            Self::Lightning => StatKey::LightningRes,
            Self::Wind => StatKey::WindRes,
            Self::Quantum => StatKey::QuantumRes,
            Self::Imaginary => StatKey::ImaginaryRes,
        }
    }

    /// Resistance penetration stat for this element.
    #[must_use]
    pub const fn res_pen_stat(self) -> StatKey {
        match self {
            Self::Physical => StatKey::PhysicalResPen,
            Self::Fire => StatKey::FireResPen,
            Self::Ice => StatKey::IceResPen,
            Self::Lightning => StatKey::LightningResPen,
            Self::Wind => StatKey::WindResPen,
            Self::Quantum => StatKey::QuantumResPen,
            Self::Imaginary => StatKey::ImaginaryResPen,
        }
    }

    /// Vulnerability stat for this element.
    #[must_use]
    pub const fn vuln_stat(self) -> StatKey {
        match self {
            Self::Physical => StatKey::PhysicalVuln,
            Self::Fire => StatKey::FireVuln,
            Self::Ice => StatKey::IceVuln,
            Self::Lightning => StatKey::LightningVuln,
            Self::Wind => StatKey::WindVuln,
            Self::Quantum => StatKey::QuantumVuln,
            Self::Imaginary => StatKey::ImaginaryVuln,
        }
    }
}

// =============================================================================
// StatBlock
// =============================================================================

/// Sparse stat map. Missing stats read as zero.
///
/// Backed by a `BTreeMap` so serialization and iteration order are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatBlock(BTreeMap<StatKey, f64>);

impl StatBlock {
    /// Creates an empty stat block.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value of `key`, or zero when unset.
    #[must_use]
    pub fn get(&self, key: StatKey) -> f64 {
        self.0.get(&key).copied().unwrap_or(0.0)
    }

    /// Returns true if `key` is explicitly set.
    #[must_use]
    pub fn contains(&self, key: StatKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Overwrites the value of `key`.
    pub fn set(&mut self, key: StatKey, value: f64) {
        self.0.insert(key, value);
    }

    /// Adds `value` onto the current value of `key`.
    pub fn add(&mut self, key: StatKey, value: f64) {
        *self.0.entry(key).or_insert(0.0) += value;
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, key: StatKey, value: f64) -> Self {
        self.set(key, value);
        self
    }

    /// Iterates set stats in key order.
    pub fn iter(&self) -> impl Iterator<Item = (StatKey, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Returns the number of stats explicitly set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no stat is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(StatKey, f64)> for StatBlock {
    fn from_iter<T: IntoIterator<Item = (StatKey, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Modifier
// =============================================================================

/// How a modifier combines with the base value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    /// Added after percent scaling.
    Flat,
    /// Multiplies the base of scaled stats; summed for additive stats.
    Percent,
}

/// A modifier value computed from live battle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicValue {
    /// `ratio` of another entity's current derived `stat`, optionally capped.
    ///
    /// Reads the referenced entity's stats as they stand in the registry at
    /// rebuild time. A missing entity contributes zero.
    StatOf {
        /// Entity whose stat is read.
        entity: EntityId,
        /// Stat to read.
        stat: StatKey,
        /// Fraction of the stat contributed.
        ratio: f64,
        /// Upper bound on the contribution.
        #[serde(default)]
        cap: Option<f64>,
    },
}

/// Static or lazily computed modifier value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModifierValue {
    /// Fixed number.
    Static(f64),
    /// Re-evaluated on every stat rebuild.
    Dynamic(DynamicValue),
}

/// A stat modifier contributed by an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Stat being modified.
    pub stat: StatKey,
    /// Combination rule.
    pub op: ModifierOp,
    /// Contribution.
    pub value: ModifierValue,
}

impl Modifier {
    /// Flat modifier with a static value.
    #[must_use]
    pub const fn flat(stat: StatKey, value: f64) -> Self {
        Self {
            stat,
            op: ModifierOp::Flat,
            value: ModifierValue::Static(value),
        }
    }

    /// Percent modifier with a static value.
    #[must_use]
    pub const fn percent(stat: StatKey, value: f64) -> Self {
        Self {
            stat,
            op: ModifierOp::Percent,
            value: ModifierValue::Static(value),
        }
    }

    /// Modifier whose value is computed at every rebuild.
    #[must_use]
    pub const fn dynamic(stat: StatKey, op: ModifierOp, value: DynamicValue) -> Self {
        Self {
            stat,
            op,
            value: ModifierValue::Dynamic(value),
        }
    }
}

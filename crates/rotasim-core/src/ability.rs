//! Ability definitions.
//!
//! An ability is pure data: who it targets, the hits it deals, the healing or
//! shield it grants and the effects it may apply. Behaviour that goes beyond
//! this data lives in ability kits and runs through the event bus.

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::effect::Effect;
use crate::stats::StatKey;

/// Target selection rule of an ability.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// One opponent.
    #[default]
    SingleEnemy,
    /// One opponent plus its alive roster neighbours.
    Blast,
    /// Every alive opponent.
    AllEnemies,
    /// `hits` hits on randomly chosen alive opponents.
    Bounce {
        /// Number of bounces.
        hits: u32,
    },
    /// One ally.
    SingleAlly,
    /// The caster.
    SelfOnly,
    /// Every alive ally.
    AllAllies,
}

impl TargetKind {
    /// Returns true if the ability targets the caster's own side.
    #[must_use]
    pub const fn is_supportive(self) -> bool {
        matches!(self, Self::SingleAlly | Self::SelfOnly | Self::AllAllies)
    }
}

/// One damage instance of an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitSpec {
    /// Stat the damage scales from.
    #[serde(default = "default_scaling")]
    pub scaling: StatKey,
    /// Multiplier applied to the scaling stat.
    pub multiplier: f64,
    /// Toughness removed from a weak target.
    #[serde(default)]
    pub toughness: f64,
}

impl HitSpec {
    /// ATK-scaling hit.
    #[must_use]
    pub const fn atk(multiplier: f64, toughness: f64) -> Self {
        Self {
            scaling: StatKey::Atk,
            multiplier,
            toughness,
        }
    }
}

/// Healing granted by an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealSpec {
    /// Stat the heal scales from.
    #[serde(default = "default_heal_scaling")]
    pub scaling: StatKey,
    /// Multiplier applied to the scaling stat.
    #[serde(default)]
    pub multiplier: f64,
    /// Flat amount added after scaling.
    #[serde(default)]
    pub flat: f64,
}

/// Shield granted by an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldGrant {
    /// Stat the shield scales from.
    #[serde(default = "default_shield_scaling")]
    pub scaling: StatKey,
    /// Multiplier applied to the scaling stat.
    #[serde(default)]
    pub multiplier: f64,
    /// Flat amount added after scaling.
    #[serde(default)]
    pub flat: f64,
    /// Turns the shield lasts.
    #[serde(default = "default_shield_duration")]
    pub duration: i32,
    /// Upper bound when the shield stacks onto an existing one.
    #[serde(default)]
    pub cap: Option<f64>,
}

/// Who receives an ability side-effect.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectRecipient {
    /// Every target of the ability.
    #[default]
    Targets,
    /// The caster.
    Source,
}

/// Effect an ability may apply after it resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityEffect {
    /// Template of the effect; `source` is filled in on application.
    pub effect: Effect,
    /// Base chance for debuffs. Buffs always land.
    #[serde(default = "default_chance")]
    pub chance: f64,
    /// Recipient.
    #[serde(default)]
    pub on: EffectRecipient,
}

/// A single ability: basic attack, skill, ultimate or follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitySpec {
    /// Display name.
    pub name: String,
    /// Target rule.
    pub target: TargetKind,
    /// Hits dealt to the primary target (or every target for AoE).
    pub hits: Vec<HitSpec>,
    /// Hits dealt to blast neighbours.
    pub adjacent_hits: Vec<HitSpec>,
    /// Energy the caster gains on use, before regen rate.
    pub energy_gain: f64,
    /// Skill points consumed by a skill.
    pub sp_cost: u32,
    /// Healing granted to each target.
    pub heal: Option<HealSpec>,
    /// Shield granted to each target.
    pub shield: Option<ShieldGrant>,
    /// Effects applied after the ability resolves.
    pub effects: Vec<AbilityEffect>,
}

impl Default for AbilitySpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            target: TargetKind::SingleEnemy,
            hits: Vec::new(),
            adjacent_hits: Vec::new(),
            energy_gain: 0.0,
            sp_cost: 1,
            heal: None,
            shield: None,
            effects: Vec::new(),
        }
    }
}

impl AbilitySpec {
    /// Single-target ATK ability with one hit.
    #[must_use]
    pub fn single_target(
        name: impl Into<String>,
        multiplier: f64,
        toughness: f64,
        energy_gain: f64,
    ) -> Self {
        Self {
            name: name.into(),
            hits: vec![HitSpec::atk(multiplier, toughness)],
            energy_gain,
            ..Self::default()
        }
    }

    /// Builder: sets the target rule.
    #[must_use]
    pub fn with_target(mut self, target: TargetKind) -> Self {
        self.target = target;
        self
    }

    /// Builder: appends an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: Effect, chance: f64, on: EffectRecipient) -> Self {
        self.effects.push(AbilityEffect { effect, chance, on });
        self
    }

    /// Returns true if the ability deals damage.
    #[must_use]
    pub fn deals_damage(&self) -> bool {
        !self.hits.is_empty() || !self.adjacent_hits.is_empty()
    }
}

/// The abilities available to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitySet {
    /// Basic attack, always available.
    pub basic: AbilitySpec,
    /// Skill, costs skill points.
    pub skill: Option<AbilitySpec>,
    /// Ultimate, costs full energy.
    pub ultimate: Option<AbilitySpec>,
    /// Follow-up attack triggered by kits.
    pub follow_up: Option<AbilitySpec>,
}

impl Default for AbilitySet {
    fn default() -> Self {
        Self {
            basic: AbilitySpec::single_target("Basic Attack", 1.0, 10.0, 20.0),
            skill: None,
            ultimate: None,
            follow_up: None,
        }
    }
}

impl AbilitySet {
    /// Returns the ability for an action kind, if the entity has one.
    #[must_use]
    pub fn get(&self, kind: ActionKind) -> Option<&AbilitySpec> {
        match kind {
            ActionKind::Basic => Some(&self.basic),
            ActionKind::Skill => self.skill.as_ref(),
            ActionKind::Ultimate => self.ultimate.as_ref(),
            ActionKind::FollowUp => self.follow_up.as_ref(),
        }
    }
}

const fn default_scaling() -> StatKey {
    StatKey::Atk
}

const fn default_heal_scaling() -> StatKey {
    StatKey::Hp
}

const fn default_shield_scaling() -> StatKey {
    StatKey::Def
}

const fn default_shield_duration() -> i32 {
    3
}

const fn default_chance() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_only_basic() {
        let set = AbilitySet::default();
        assert!(set.get(ActionKind::Basic).is_some());
        assert!(set.get(ActionKind::Skill).is_none());
        assert!(set.get(ActionKind::Ultimate).is_none());
        assert!(set.basic.deals_damage());
    }

    #[test]
    fn ability_parses_with_defaults() {
        let spec: AbilitySpec = serde_json::from_str(
            r#"{"name":"Blast","target":"blast","hits":[{"multiplier":2.0,"toughness":20}]}"#,
        )
        .unwrap();
        assert_eq!(spec.target, TargetKind::Blast);
        assert_eq!(spec.sp_cost, 1);
        assert_eq!(spec.hits[0].scaling, StatKey::Atk);
    }

    #[test]
    fn bounce_target_parses() {
        let spec: AbilitySpec =
            serde_json::from_str(r#"{"target":{"bounce":{"hits":4}}}"#).unwrap();
        assert_eq!(spec.target, TargetKind::Bounce { hits: 4 });
    }

    #[test]
    fn supportive_targets() {
        assert!(TargetKind::SingleAlly.is_supportive());
        assert!(TargetKind::AllAllies.is_supportive());
        assert!(!TargetKind::Blast.is_supportive());
    }
}

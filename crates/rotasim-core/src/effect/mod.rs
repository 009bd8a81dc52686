//! Effects: buffs, debuffs, damage-over-time, crowd control, shields and
//! statuses.
//!
//! An [`Effect`] is pure data. Its kind decides how the kernel treats it:
//! - [`EffectKind::Dot`] ticks damage at the host's turn start
//! - [`EffectKind::CrowdControl`] is resolved on the host's turn and may skip it
//! - [`EffectKind::Shield`] feeds the host's shield pool
//! - every kind may contribute stat [`Modifier`]s
//!
//! Behaviour beyond data (for example "when this field ends, heal everyone")
//! is expressed through an optional [`EffectHandler`], which registers a kit
//! handler while the effect is attached.
//!
//! # Example
//!
//! ```
//! use rotasim_core::effect::{DurationPolicy, Effect, EffectFlags, EffectKind};
//! use rotasim_core::stats::{Modifier, StatKey};
//!
//! let rally = Effect::new("rally", "Rally", EffectKind::Buff)
//!     .with_duration(DurationPolicy::TurnEnd, 3)
//!     .with_stacks(1, 3)
//!     .with_flags(EffectFlags::DISPELLABLE)
//!     .with_modifier(Modifier::percent(StatKey::Atk, 0.1));
//!
//! assert!(rally.is_buff());
//! assert_eq!(rally.remaining, 3);
//! ```

pub mod breaks;
pub mod manager;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::{Element, EntityId};
use crate::event::EventKind;
use crate::handler::KitId;
use crate::stats::Modifier;

pub use manager::{add_effect, cleanse, dispel, remove_effect, tick_turn_end, tick_turn_start};

// =============================================================================
// Identity
// =============================================================================

/// Identifier of an effect.
///
/// Unique per host: applying an effect whose id is already present on the
/// host refreshes it instead of adding a second copy.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(String);

impl EffectId {
    /// Creates an effect id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectId({})", self.0)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EffectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EffectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// =============================================================================
// Kind
// =============================================================================

/// Damage-over-time family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum DotKind {
    Bleed,
    Burn,
    Shock,
    WindShear,
    Arcana,
}

/// How a DoT tick is computed.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DotDamage {
    /// `ratio` of the source's current ATK, with DMG boosts. Per stack.
    Multiplier {
        /// Fraction of ATK.
        ratio: f64,
    },
    /// Fixed base scaled by the source's break effect. Per stack.
    Fixed {
        /// Base damage before multipliers.
        base: f64,
    },
}

/// Payload of a DoT effect.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotSpec {
    /// DoT family.
    pub dot: DotKind,
    /// Element of the tick damage.
    pub element: Element,
    /// Tick damage rule.
    pub damage: DotDamage,
}

/// Crowd-control family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CrowdControlKind {
    Freeze,
    Entanglement,
    Imprisonment,
}

/// Payload of a crowd-control effect.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdControlSpec {
    /// Crowd-control family.
    pub cc: CrowdControlKind,
    /// Element of the tick damage.
    pub element: Element,
    /// Base damage dealt on each of the host's turns, per stack, before the
    /// source's break effect.
    pub tick_damage: f64,
    /// Action delay applied to the host when the effect attaches.
    pub delay_on_apply: f64,
}

/// Payload of a shield effect.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldSpec {
    /// Shield points this effect contributes to the host's pool.
    pub value: f64,
}

/// Tagged kind of an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Beneficial modifier.
    Buff,
    /// Harmful modifier.
    Debuff,
    /// Damage over time.
    Dot(DotSpec),
    /// Turn-skipping status.
    CrowdControl(CrowdControlSpec),
    /// Shield pool contribution.
    Shield(ShieldSpec),
    /// Neutral marker, e.g. a field or a stack counter.
    Status,
}

/// Buff/debuff/status category derived from the kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum EffectCategory {
    Buff,
    Debuff,
    Status,
}

// =============================================================================
// Duration and stacks
// =============================================================================

/// When an effect's remaining duration decrements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Never decrements.
    #[default]
    Permanent,
    /// Decrements at the host's turn start.
    TurnStart,
    /// Decrements at the host's turn end.
    TurnEnd,
    /// Lives exactly as long as the parent effect.
    Linked {
        /// Id of the parent effect, which may be on any entity.
        parent: EffectId,
        /// Entity carrying the parent. Left unset, it is resolved when the
        /// effect is added.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<EntityId>,
    },
}

/// Stack counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stacks {
    /// Current stacks, `1..=max`.
    pub count: u32,
    /// Upper bound.
    pub max: u32,
}

/// How stacks scale an effect's modifiers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackScaling {
    /// Every modifier is multiplied by the stack count.
    #[default]
    Multiply,
    /// Modifiers apply once regardless of stacks.
    Fixed,
}

bitflags! {
    /// Removal and timing flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EffectFlags: u8 {
        /// Removable by dispel.
        const DISPELLABLE = 1 << 0;
        /// Removable by cleanse.
        const CLEANSABLE = 1 << 1;
        /// The first duration tick is skipped if the effect was gained during
        /// the host's own turn.
        const SKIP_FIRST_TICK = 1 << 2;
    }
}

bitflags! {
    /// Behaviour tags read by the orchestrator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EffectTags: u8 {
        /// A broken host does not recover toughness.
        const SKIP_TOUGHNESS_RECOVERY = 1 << 0;
        /// The host takes another action this turn.
        const EXTRA_ACTION = 1 << 1;
        /// The host cannot use its skill.
        const SKILL_SILENCE = 1 << 2;
    }
}

/// Kit handler bound to an effect's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectHandler {
    /// Kit providing the logic.
    pub kit: KitId,
    /// Events the handler listens to. Empty means the kit's defaults.
    #[serde(default)]
    pub subscribes_to: Vec<EventKind>,
}

// =============================================================================
// Effect
// =============================================================================

/// A timed modifier or status attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Identity, unique per host.
    pub id: EffectId,
    /// Display name.
    pub name: String,
    /// Tagged kind.
    pub kind: EffectKind,
    /// Entity that applied the effect.
    #[serde(default)]
    pub source: Option<EntityId>,
    /// Duration policy.
    #[serde(default)]
    pub duration: DurationPolicy,
    /// Remaining duration in host turns.
    #[serde(default)]
    pub remaining: i32,
    /// Stack counter, if stackable.
    #[serde(default)]
    pub stacks: Option<Stacks>,
    /// Stack scaling rule.
    #[serde(default)]
    pub scaling: StackScaling,
    /// Stat modifiers.
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /// Removal and timing flags.
    #[serde(default)]
    pub flags: EffectFlags,
    /// Behaviour tags.
    #[serde(default)]
    pub tags: EffectTags,
    /// Handler registered while attached.
    #[serde(default)]
    pub handler: Option<EffectHandler>,
    /// Set when gained during the host's own turn with `SKIP_FIRST_TICK`.
    #[serde(default)]
    pub applied_during_turn_of: Option<EntityId>,
}

impl Effect {
    /// Creates a permanent, unflagged effect.
    #[must_use]
    pub fn new(id: impl Into<EffectId>, name: impl Into<String>, kind: EffectKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            source: None,
            duration: DurationPolicy::Permanent,
            remaining: 0,
            stacks: None,
            scaling: StackScaling::Multiply,
            modifiers: Vec::new(),
            flags: EffectFlags::empty(),
            tags: EffectTags::empty(),
            handler: None,
            applied_during_turn_of: None,
        }
    }

    /// Builder: sets the source entity.
    #[must_use]
    pub fn from_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Builder: sets the duration policy and remaining turns.
    #[must_use]
    pub fn with_duration(mut self, duration: DurationPolicy, turns: i32) -> Self {
        self.duration = duration;
        self.remaining = turns;
        self
    }

    /// Builder: links the effect to a parent.
    ///
    /// The parent's host is resolved when the effect is added: the target
    /// itself if it carries the parent, then the effect's source, then the
    /// first entity in roster order.
    #[must_use]
    pub fn linked_to(mut self, parent: impl Into<EffectId>) -> Self {
        self.duration = DurationPolicy::Linked {
            parent: parent.into(),
            host: None,
        };
        self
    }

    /// Builder: links the effect to the parent carried by `host`.
    #[must_use]
    pub fn linked_to_host(mut self, parent: impl Into<EffectId>, host: EntityId) -> Self {
        self.duration = DurationPolicy::Linked {
            parent: parent.into(),
            host: Some(host),
        };
        self
    }

    /// Builder: makes the effect stackable.
    #[must_use]
    pub fn with_stacks(mut self, count: u32, max: u32) -> Self {
        let max = max.max(1);
        self.stacks = Some(Stacks {
            count: count.clamp(1, max),
            max,
        });
        self
    }

    /// Builder: sets the stack scaling rule.
    #[must_use]
    pub fn with_scaling(mut self, scaling: StackScaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Builder: appends a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Builder: adds flags.
    #[must_use]
    pub fn with_flags(mut self, flags: EffectFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Builder: adds tags.
    #[must_use]
    pub fn with_tags(mut self, tags: EffectTags) -> Self {
        self.tags |= tags;
        self
    }

    /// Builder: binds a kit handler to the effect's lifetime.
    #[must_use]
    pub fn with_handler(mut self, kit: impl Into<KitId>, subscribes_to: Vec<EventKind>) -> Self {
        self.handler = Some(EffectHandler {
            kit: kit.into(),
            subscribes_to,
        });
        self
    }

    /// Category derived from the kind.
    #[must_use]
    pub const fn category(&self) -> EffectCategory {
        match self.kind {
            EffectKind::Buff | EffectKind::Shield(_) => EffectCategory::Buff,
            EffectKind::Debuff | EffectKind::Dot(_) | EffectKind::CrowdControl(_) => {
                EffectCategory::Debuff
            }
            EffectKind::Status => EffectCategory::Status,
        }
    }

    /// Returns true for buffs and shields.
    #[must_use]
    pub const fn is_buff(&self) -> bool {
        matches!(self.category(), EffectCategory::Buff)
    }

    /// Returns true for debuffs, DoTs and crowd control.
    #[must_use]
    pub const fn is_debuff(&self) -> bool {
        matches!(self.category(), EffectCategory::Debuff)
    }

    /// Returns true for crowd-control effects.
    #[must_use]
    pub const fn is_crowd_control(&self) -> bool {
        matches!(self.kind, EffectKind::CrowdControl(_))
    }

    /// Returns true for shield effects.
    #[must_use]
    pub const fn is_shield(&self) -> bool {
        matches!(self.kind, EffectKind::Shield(_))
    }

    /// Parent effect id for linked effects.
    #[must_use]
    pub fn parent(&self) -> Option<&EffectId> {
        match &self.duration {
            DurationPolicy::Linked { parent, .. } => Some(parent),
            _ => None,
        }
    }

    /// Entity carrying the parent, once resolved.
    #[must_use]
    pub const fn parent_host(&self) -> Option<EntityId> {
        match &self.duration {
            DurationPolicy::Linked { host, .. } => *host,
            _ => None,
        }
    }

    /// Returns true if this effect is linked to `parent` on `host`.
    ///
    /// An unresolved link matches `parent` on any host.
    #[must_use]
    pub fn is_linked_to(&self, host: EntityId, parent: &EffectId) -> bool {
        self.parent() == Some(parent) && self.parent_host().map_or(true, |h| h == host)
    }

    /// Current stack count, 1 for non-stackable effects.
    #[must_use]
    pub fn stack_count(&self) -> u32 {
        self.stacks.map_or(1, |s| s.count)
    }

    /// Multiplier applied to every modifier of this effect.
    #[must_use]
    pub fn modifier_scale(&self) -> f64 {
        match self.scaling {
            StackScaling::Multiply => f64::from(self.stack_count()),
            StackScaling::Fixed => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatKey;

    mod category_tests {
        use super::*;

        #[test]
        fn kinds_map_to_categories() {
            let dot = Effect::new(
                "burn",
                "Burn",
                EffectKind::Dot(DotSpec {
                    dot: DotKind::Burn,
                    element: Element::Fire,
                    damage: DotDamage::Fixed { base: 100.0 },
                }),
            );
            assert!(dot.is_debuff());
            assert!(Effect::new("s", "S", EffectKind::Shield(ShieldSpec { value: 1.0 })).is_buff());
            assert_eq!(
                Effect::new("f", "F", EffectKind::Status).category(),
                EffectCategory::Status
            );
        }

        #[test]
        fn crowd_control_predicate() {
            let freeze = Effect::new(
                "freeze",
                "Freeze",
                EffectKind::CrowdControl(CrowdControlSpec {
                    cc: CrowdControlKind::Freeze,
                    element: Element::Ice,
                    tick_damage: 0.0,
                    delay_on_apply: 0.0,
                }),
            );
            assert!(freeze.is_crowd_control());
            assert!(freeze.is_debuff());
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn stacks_are_clamped_at_build() {
            let effect = Effect::new("x", "X", EffectKind::Buff).with_stacks(9, 3);
            assert_eq!(effect.stack_count(), 3);
            assert!((effect.modifier_scale() - 3.0).abs() < 0.0001);
            let fixed = effect.with_scaling(StackScaling::Fixed);
            assert!((fixed.modifier_scale() - 1.0).abs() < 0.0001);
        }

        #[test]
        fn linked_effect_reports_parent() {
            let child = Effect::new("child", "Child", EffectKind::Buff).linked_to("field");
            assert_eq!(child.parent(), Some(&EffectId::new("field")));
        }

        #[test]
        fn template_parses_with_defaults() {
            let effect: Effect = serde_json::from_str(
                r#"{"id":"atk_up","name":"ATK Up","kind":"buff","duration":"turn_end","remaining":2,
                    "modifiers":[{"stat":"atk","op":"percent","value":0.3}]}"#,
            )
            .unwrap();
            assert_eq!(effect.duration, DurationPolicy::TurnEnd);
            assert_eq!(effect.modifiers[0].stat, StatKey::Atk);
            assert!(effect.flags.is_empty());
        }
    }
}

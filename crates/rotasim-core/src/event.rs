//! Typed battle events published on the dispatch bus.

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::effect::EffectId;
use crate::entity::EntityId;

/// Discriminant of an event. Handlers subscribe by kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum EventKind {
    BattleStart,
    TurnStart,
    TurnEnd,
    BeforeDamageCalculation,
    DamageDealt,
    DotDamage,
    WeaknessBreak,
    WeaknessBreakRecoveryAttempt,
    UnitDefeated,
    BasicAttack,
    SkillUsed,
    UltimateUsed,
    FollowUpAttack,
    ActionComplete,
    UnitHealed,
    ShieldApplied,
    EffectApplied,
    EffectRemoved,
    DebuffApplied,
    SummonCreated,
}

impl EventKind {
    /// Event published when an ability of the given kind resolves.
    #[must_use]
    pub const fn for_action(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Basic => Self::BasicAttack,
            ActionKind::Skill => Self::SkillUsed,
            ActionKind::Ultimate => Self::UltimateUsed,
            ActionKind::FollowUp => Self::FollowUpAttack,
        }
    }
}

/// An immutable battle event.
///
/// # Example
///
/// ```
/// use rotasim_core::entity::EntityId;
/// use rotasim_core::event::{Event, EventKind};
///
/// let hit = Event::new(EventKind::DamageDealt)
///     .with_source(EntityId::new(0))
///     .with_target(EntityId::new(3))
///     .with_value(1200.0);
///
/// assert_eq!(hit.kind, EventKind::DamageDealt);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event kind.
    pub kind: EventKind,
    /// Acting entity.
    pub source: Option<EntityId>,
    /// Affected entity.
    pub target: Option<EntityId>,
    /// Numeric payload (damage, heal, shield, energy).
    pub value: f64,
    /// Ability slot that caused the event.
    pub action: Option<ActionKind>,
    /// Number of targets of the causing ability.
    pub target_count: usize,
    /// Effect involved in the event.
    pub effect: Option<EffectId>,
}

impl Event {
    /// Creates an event with an empty payload.
    #[must_use]
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            source: None,
            target: None,
            value: 0.0,
            action: None,
            target_count: 0,
            effect: None,
        }
    }

    /// Builder: sets the source.
    #[must_use]
    pub const fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Builder: sets the target.
    #[must_use]
    pub const fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Builder: sets the numeric payload.
    #[must_use]
    pub const fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Builder: sets the ability slot.
    #[must_use]
    pub const fn with_action(mut self, action: ActionKind) -> Self {
        self.action = Some(action);
        self
    }

    /// Builder: sets the target count.
    #[must_use]
    pub const fn with_target_count(mut self, count: usize) -> Self {
        self.target_count = count;
        self
    }

    /// Builder: sets the effect id.
    #[must_use]
    pub fn with_effect(mut self, effect: EffectId) -> Self {
        self.effect = Some(effect);
        self
    }
}

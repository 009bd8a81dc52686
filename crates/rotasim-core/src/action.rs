//! Actions accepted by [`Kernel::dispatch`](crate::kernel::Kernel::dispatch).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityId;
use crate::handler::HandlerRegistration;

/// Ability slot an action uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Basic attack; generates a skill point.
    Basic,
    /// Skill; consumes skill points.
    Skill,
    /// Ultimate; consumes all energy.
    Ultimate,
    /// Follow-up attack queued by a kit.
    FollowUp,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "Basic ATK"),
            Self::Skill => write!(f, "Skill"),
            Self::Ultimate => write!(f, "Ultimate"),
            Self::FollowUp => write!(f, "Follow-up"),
        }
    }
}

/// A state transition request.
///
/// Actions naming a missing or dead source are no-ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Action {
    /// Basic attack.
    BasicAttack {
        /// Actor.
        source: EntityId,
        /// Primary target; chosen automatically when absent.
        target: Option<EntityId>,
    },
    /// Skill.
    Skill {
        /// Actor.
        source: EntityId,
        /// Primary target; chosen automatically when absent.
        target: Option<EntityId>,
    },
    /// Ultimate.
    Ultimate {
        /// Actor.
        source: EntityId,
        /// Primary target; chosen automatically when absent.
        target: Option<EntityId>,
    },
    /// Follow-up attack, usually queued by a kit.
    FollowUpAttack {
        /// Actor.
        source: EntityId,
        /// Primary target; chosen automatically when absent.
        target: Option<EntityId>,
        /// Ability slot to use instead of the follow-up slot.
        #[serde(default)]
        ability: Option<ActionKind>,
    },
    /// Publishes `BattleStart`.
    BattleStart,
    /// Registers handlers in order.
    RegisterHandlers {
        /// Registrations to add.
        registrations: Vec<HandlerRegistration>,
    },
    /// Pulls an entity's next turn forward.
    Advance {
        /// Entity to advance.
        target: EntityId,
        /// Fraction of a full action value.
        fraction: f64,
    },
    /// Pushes an entity's next turn back.
    Delay {
        /// Entity to delay.
        target: EntityId,
        /// Fraction of a full action value.
        fraction: f64,
    },
}

impl Action {
    /// Builds the ability action for `kind`.
    #[must_use]
    pub const fn ability(kind: ActionKind, source: EntityId, target: Option<EntityId>) -> Self {
        match kind {
            ActionKind::Basic => Self::BasicAttack { source, target },
            ActionKind::Skill => Self::Skill { source, target },
            ActionKind::Ultimate => Self::Ultimate { source, target },
            ActionKind::FollowUp => Self::FollowUpAttack {
                source,
                target,
                ability: None,
            },
        }
    }

    /// Acting entity of an ability action.
    #[must_use]
    pub const fn source(&self) -> Option<EntityId> {
        match self {
            Self::BasicAttack { source, .. }
            | Self::Skill { source, .. }
            | Self::Ultimate { source, .. }
            | Self::FollowUpAttack { source, .. } => Some(*source),
            _ => None,
        }
    }

    /// Ability slot of an ability action.
    #[must_use]
    pub const fn kind(&self) -> Option<ActionKind> {
        match self {
            Self::BasicAttack { .. } => Some(ActionKind::Basic),
            Self::Skill { .. } => Some(ActionKind::Skill),
            Self::Ultimate { .. } => Some(ActionKind::Ultimate),
            Self::FollowUpAttack { .. } => Some(ActionKind::FollowUp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ability_constructor_matches_kind() {
        let action = Action::ability(ActionKind::Ultimate, EntityId::new(1), None);
        assert_eq!(action.kind(), Some(ActionKind::Ultimate));
        assert_eq!(action.source(), Some(EntityId::new(1)));
        assert_eq!(Action::BattleStart.source(), None);
    }

    #[test]
    fn actions_parse_from_tagged_json() {
        let action: Action =
            serde_json::from_str(r#"{"type":"skill","source":2,"target":5}"#).unwrap();
        assert_eq!(
            action,
            Action::Skill {
                source: EntityId::new(2),
                target: Some(EntityId::new(5)),
            }
        );
    }
}

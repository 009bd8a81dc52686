//! Counter kit.
//!
//! When an enemy's attack lands on the owner, or on an ally holding the
//! owner's shield, the owner queues a follow-up attack against the attacker.
//! The kit then sits on cooldown until the owner's turn ends.
//!
//! # Subscriptions
//!
//! - `DamageDealt`

use crate::action::{Action, ActionKind};
use crate::effect::EffectId;
use crate::entity::EntityId;
use crate::error::HandlerError;
use crate::event::{Event, EventKind};
use crate::handler::{AbilityKit, HandlerContext, KitId};
use crate::state::GameState;

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::DamageDealt];

/// Follow-up attack in response to enemy hits.
///
/// Uses the owner's follow-up ability, or its basic attack when it has none.
///
/// # Example
///
/// ```
/// use rotasim_core::handler::AbilityKit;
/// use rotasim_core::kits::CounterKit;
///
/// let kit = CounterKit::new();
/// assert_eq!(kit.id().as_str(), "counter");
/// assert_eq!(kit.cooldown(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CounterKit {
    id: KitId,
    cooldown: u32,
}

impl CounterKit {
    /// Default catalog id.
    pub const ID: &'static str = "counter";

    /// Creates the kit with a one-turn cooldown.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: KitId::new(Self::ID),
            cooldown: 1,
        }
    }

    /// Builder: owner turn ends between two counters.
    #[must_use]
    pub fn with_cooldown(mut self, turns: u32) -> Self {
        self.cooldown = turns;
        self
    }

    /// Owner turn ends between two counters.
    #[must_use]
    pub const fn cooldown(&self) -> u32 {
        self.cooldown
    }
}

impl Default for CounterKit {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if `target` is the owner or carries the owner's shield.
fn covered(state: &GameState, owner: EntityId, target: EntityId) -> bool {
    if target == owner {
        return true;
    }
    let shield = EffectId::new(format!("shield_{owner}"));
    state.entity(target).is_some_and(|e| e.has_effect(&shield))
}

impl AbilityKit for CounterKit {
    fn id(&self) -> &KitId {
        &self.id
    }

    fn subscriptions(&self) -> &[EventKind] {
        SUBSCRIPTIONS
    }

    fn on_event(
        &self,
        ctx: &HandlerContext<'_>,
        event: &Event,
        mut state: GameState,
    ) -> Result<GameState, HandlerError> {
        let owner = ctx.owner();
        // Only direct attacks carry an action kind.
        let (Some(attacker), Some(target), Some(_)) = (event.source, event.target, event.action)
        else {
            return Ok(state);
        };
        let Some(me) = state.entity(owner).filter(|e| e.is_alive()) else {
            return Ok(state);
        };
        let hostile = state
            .entity(attacker)
            .is_some_and(|a| a.is_alive() && a.is_opponent_of(me));
        if !hostile || !covered(&state, owner, target) {
            return Ok(state);
        }

        let ability = if me.abilities.follow_up.is_some() {
            None
        } else {
            Some(ActionKind::Basic)
        };
        tracing::debug!(%owner, %attacker, "counter queued");
        state.enqueue(Action::FollowUpAttack {
            source: owner,
            target: Some(attacker),
            ability,
        });
        ctx.start_cooldown(&mut state, self.cooldown);
        Ok(state)
    }
}

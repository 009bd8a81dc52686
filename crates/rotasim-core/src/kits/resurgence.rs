//! Resurgence kit: defeating an enemy on the owner's own turn grants an
//! extra action with a damage boost.
//!
//! The extra action is carried by an `EXTRA_ACTION` status that the turn
//! loop consumes. The boost expires at the end of the owner's turn and
//! blocks a second resurgence while it lasts.

use crate::effect::{DurationPolicy, Effect, EffectId, EffectKind, EffectTags};
use crate::error::HandlerError;
use crate::event::{Event, EventKind};
use crate::handler::{AbilityKit, HandlerContext, KitId};
use crate::state::GameState;
use crate::stats::{Modifier, StatKey};

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::UnitDefeated];

/// Id of the extra-action status.
pub const RESURGENCE: &str = "resurgence";

/// Id of the damage boost that accompanies the extra action.
pub const RESURGENCE_BOOST: &str = "resurgence_boost";

/// Extra action on kill.
#[derive(Debug, Clone)]
pub struct ResurgenceKit {
    id: KitId,
    dmg_boost: f64,
}

impl ResurgenceKit {
    /// Default catalog id.
    pub const ID: &'static str = "resurgence";

    /// Creates the kit with a 40% damage boost.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: KitId::new(Self::ID),
            dmg_boost: 0.4,
        }
    }

    /// Builder: damage boost during the extra action.
    #[must_use]
    pub fn with_dmg_boost(mut self, boost: f64) -> Self {
        self.dmg_boost = boost;
        self
    }
}

impl Default for ResurgenceKit {
    fn default() -> Self {
        Self::new()
    }
}

impl AbilityKit for ResurgenceKit {
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
        if event.source != Some(owner) || state.current_turn != Some(owner) {
            return Ok(state);
        }
        let killed_enemy = event
            .target
            .and_then(|victim| state.entity(victim))
            .zip(state.entity(owner))
            .is_some_and(|(victim, me)| victim.is_opponent_of(me));
        let ready = state
            .entity(owner)
            .is_some_and(|me| me.is_alive() && !me.has_effect(&EffectId::new(RESURGENCE_BOOST)));
        if !killed_enemy || !ready {
            return Ok(state);
        }

        tracing::debug!(%owner, "resurgence");
        let kernel = ctx.kernel();
        let boost = Effect::new(RESURGENCE_BOOST, "Resurgence", EffectKind::Buff)
            .from_source(owner)
            .with_duration(DurationPolicy::TurnEnd, 1)
            .with_modifier(Modifier::flat(StatKey::AllTypeDmgBoost, self.dmg_boost));
        kernel.apply_effect(&mut state, owner, boost)?;
        let extra = Effect::new(RESURGENCE, "Extra Action", EffectKind::Status)
            .from_source(owner)
            .with_tags(EffectTags::EXTRA_ACTION);
        kernel.apply_effect(&mut state, owner, extra)?;
        Ok(state)
    }
}

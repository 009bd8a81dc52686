//! Field kit: the owner's ultimate opens a field that shares part of the
//! owner's ATK with every other ally.
//!
//! The field is a status on the owner counting down at the owner's turn
//! start. Each ally's share is linked to it and disappears with it. Shares
//! read the owner's live ATK, so buffs on the owner carry over.

use crate::effect::{DurationPolicy, Effect, EffectFlags, EffectKind};
use crate::entity::{Entity, EntityId};
use crate::error::HandlerError;
use crate::event::{Event, EventKind};
use crate::handler::{AbilityKit, HandlerContext, KitId};
use crate::state::GameState;
use crate::stats::{DynamicValue, Modifier, ModifierOp, StatKey};

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::UltimateUsed];

/// ATK-sharing field opened by the ultimate.
#[derive(Debug, Clone)]
pub struct FieldKit {
    id: KitId,
    duration: i32,
    atk_share: f64,
}

impl FieldKit {
    /// Default catalog id.
    pub const ID: &'static str = "field";

    /// Creates the kit: a two-turn field sharing 20% of the owner's ATK.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: KitId::new(Self::ID),
            duration: 2,
            atk_share: 0.2,
        }
    }

    /// Id of the field status on `owner`.
    #[must_use]
    pub fn field_id(owner: EntityId) -> String {
        format!("field_{owner}")
    }

    /// Id of the share buff granted by `owner`'s field.
    #[must_use]
    pub fn share_id(owner: EntityId) -> String {
        format!("field_share_{owner}")
    }
}

impl Default for FieldKit {
    fn default() -> Self {
        Self::new()
    }
}

impl AbilityKit for FieldKit {
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
        if event.source != Some(owner) {
            return Ok(state);
        }
        let Some(side) = state.entity(owner).filter(|e| e.is_alive()).map(Entity::side) else {
            return Ok(state);
        };
        let kernel = ctx.kernel();

        let field = Effect::new(Self::field_id(owner), "Field", EffectKind::Status)
            .from_source(owner)
            .with_duration(DurationPolicy::TurnStart, self.duration);
        kernel.apply_effect(&mut state, owner, field)?;

        let allies: Vec<EntityId> = state
            .registry
            .alive_on(side)
            .map(Entity::id)
            .filter(|id| *id != owner)
            .collect();
        for ally in allies {
            let share = Effect::new(Self::share_id(owner), "Field Share", EffectKind::Buff)
                .from_source(owner)
                .linked_to_host(Self::field_id(owner), owner)
                .with_flags(EffectFlags::DISPELLABLE)
                .with_modifier(Modifier::dynamic(
                    StatKey::Atk,
                    ModifierOp::Flat,
                    DynamicValue::StatOf {
                        entity: owner,
                        stat: StatKey::Atk,
                        ratio: self.atk_share,
                        cap: None,
                    },
                ));
            kernel.apply_effect(&mut state, ally, share)?;
        }
        tracing::debug!(%owner, "field opened");
        Ok(state)
    }
}

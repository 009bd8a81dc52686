//! Benediction kit.
//!
//! - Skill on an ally: the ally gains a damage boost until the end of its
//!   next turn and, unless it is the owner, acts immediately
//! - Basic attack: the owner's next turn is pulled forward
//!
//! Turn pulls are queued as `Advance` actions, so they land after the
//! ability has fully resolved.

use crate::action::Action;
use crate::effect::{DurationPolicy, Effect, EffectFlags, EffectKind};
use crate::entity::EntityId;
use crate::error::HandlerError;
use crate::event::{Event, EventKind};
use crate::handler::{AbilityKit, HandlerContext, KitId};
use crate::state::GameState;
use crate::stats::{Modifier, StatKey};

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::SkillUsed, EventKind::BasicAttack];

/// Ally buff and turn advance on skill use.
#[derive(Debug, Clone)]
pub struct BenedictionKit {
    id: KitId,
    dmg_boost: f64,
    skill_advance: f64,
    basic_advance: f64,
}

impl BenedictionKit {
    /// Default catalog id.
    pub const ID: &'static str = "benediction";

    /// Creates the kit: 66% damage boost, full advance on skill, 30%
    /// self-advance on basic attack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: KitId::new(Self::ID),
            dmg_boost: 0.66,
            skill_advance: 1.0,
            basic_advance: 0.3,
        }
    }

    /// Id of the buff applied by `owner`.
    #[must_use]
    pub fn buff_id(owner: EntityId) -> String {
        format!("benediction_{owner}")
    }

    fn bless(
        &self,
        ctx: &HandlerContext<'_>,
        state: &mut GameState,
        target: EntityId,
    ) -> Result<(), HandlerError> {
        let owner = ctx.owner();
        let same_side = state
            .entity(owner)
            .zip(state.entity(target))
            .is_some_and(|(me, ally)| ally.is_alive() && ally.side() == me.side());
        if !same_side {
            return Ok(());
        }
        let buff = Effect::new(Self::buff_id(owner), "Benediction", EffectKind::Buff)
            .from_source(owner)
            .with_duration(DurationPolicy::TurnEnd, 1)
            .with_flags(EffectFlags::DISPELLABLE | EffectFlags::SKIP_FIRST_TICK)
            .with_modifier(Modifier::flat(StatKey::AllTypeDmgBoost, self.dmg_boost));
        ctx.kernel().apply_effect(state, target, buff)?;
        if target != owner {
            state.enqueue(Action::Advance {
                target,
                fraction: self.skill_advance,
            });
        }
        Ok(())
    }
}

impl Default for BenedictionKit {
    fn default() -> Self {
        Self::new()
    }
}

impl AbilityKit for BenedictionKit {
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
        match event.kind {
            EventKind::SkillUsed => {
                if let Some(target) = event.target {
                    self.bless(ctx, &mut state, target)?;
                }
            }
            EventKind::BasicAttack => state.enqueue(Action::Advance {
                target: owner,
                fraction: self.basic_advance,
            }),
            _ => {}
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{AbilitySpec, TargetKind};
    use crate::config::Limits;
    use crate::effect::EffectId;
    use crate::handler::KitCatalog;
    use crate::kernel::Kernel;
    use crate::scheduler;
    use crate::tests::helpers;
    use std::sync::Arc;

    fn setup() -> (Kernel, GameState) {
        let kit = BenedictionKit::new();
        let mut state = helpers::trio_state();
        let hero = helpers::first_ally(&state);
        state.registry.update(hero, |e| {
            e.abilities.skill = Some(AbilitySpec {
                name: "Combat Redeployment".into(),
                target: TargetKind::SingleAlly,
                energy_gain: 30.0,
                ..AbilitySpec::default()
            });
        });
        state.handlers.register(kit.register(hero, 80, 0));
        scheduler::initialize(&mut state);
        let kernel = Kernel::new(KitCatalog::new().with(Arc::new(kit)), Limits::default());
        (kernel, state)
    }

    #[test]
    fn skill_buffs_and_advances_ally() {
        let (kernel, mut state) = setup();
        let hero = helpers::first_ally(&state);
        let ally = helpers::allies(&state)[1];
        kernel
            .execute(&mut state, &Action::Skill { source: hero, target: Some(ally) })
            .unwrap();
        kernel.drain_pending(&mut state).unwrap();

        let blessed = state.entity(ally).unwrap();
        assert!(blessed.has_effect(&EffectId::new(BenedictionKit::buff_id(hero))));
        assert!((blessed.stats.get(StatKey::AllTypeDmgBoost) - 0.66).abs() < 0.0001);
        assert!(blessed.action_value.abs() < 0.0001);
        assert_eq!(state.queue.head().unwrap().entity, ally);
    }

    #[test]
    fn self_target_is_not_advanced() {
        let (kernel, mut state) = setup();
        let hero = helpers::first_ally(&state);
        let before = state.entity(hero).unwrap().action_value;
        kernel
            .execute(&mut state, &Action::Skill { source: hero, target: Some(hero) })
            .unwrap();
        assert!(state.pending.is_empty());
        assert!((state.entity(hero).unwrap().action_value - before).abs() < 0.0001);
    }

    #[test]
    fn basic_attack_pulls_owner_forward() {
        let (kernel, mut state) = setup();
        let hero = helpers::first_ally(&state);
        let enemy = helpers::first_enemy(&state);
        let full = scheduler::action_value(state.entity(hero).unwrap().speed());
        kernel
            .execute(&mut state, &Action::BasicAttack { source: hero, target: Some(enemy) })
            .unwrap();
        kernel.drain_pending(&mut state).unwrap();
        assert!((state.entity(hero).unwrap().action_value - full * 0.7).abs() < 0.0001);
    }
}

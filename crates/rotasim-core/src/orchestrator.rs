//! Turn orchestration: one scheduler cycle per [`Kernel::step`].
//!
//! # Phases
//!
//! ```text
//! SelectNext → PreTurn → ActionLoop → DrainPending → InterruptCheck → TurnEnd → Resync
//! ```
//!
//! - **SelectNext**: take the queue head and move the clock by its action
//!   value; time out instead if that would pass the time budget
//! - **PreTurn**: reset the actor's action value, publish `TurnStart`,
//!   recover toughness, tick DoTs and turn-start durations, resolve crowd
//!   control (which may skip straight to `TurnEnd`)
//! - **ActionLoop**: run the actor's action, again while it holds an
//!   `EXTRA_ACTION` effect, up to `max_actions_per_turn`
//! - **DrainPending**: run queued follow-ups FIFO
//! - **InterruptCheck**: fire ready `Immediate` ultimates in roster order,
//!   rescanning after each, up to `max_interrupts`
//! - **TurnEnd**: publish `TurnEnd`, tick turn-end durations and handler
//!   cooldowns, advance the rotation, rebuild stats
//!
//! # Example
//!
//! ```
//! use rotasim_core::action::Action;
//! use rotasim_core::config::{create_initial_state, SimulationConfig};
//! use rotasim_core::kernel::Kernel;
//!
//! let config: SimulationConfig = serde_json::from_str(r#"{
//!     "characters": [{ "name": "Hero", "stats": { "hp": 3000, "atk": 1200, "spd": 110 } }],
//!     "enemies": [{ "name": "Slime", "hp": 8000, "speed": 90 }],
//!     "rounds": 20
//! }"#).unwrap();
//!
//! let kernel = Kernel::default();
//! let mut state = create_initial_state(&config, kernel.catalog()).unwrap();
//! state = kernel.dispatch(&state, &Action::BattleStart).unwrap();
//! while state.result.outcome.is_none() {
//!     state = kernel.step(&state).unwrap();
//! }
//! assert!(state.result.outcome.is_some());
//! ```

use crate::action::{Action, ActionKind};
use crate::effect::{self, EffectId, EffectTags};
use crate::entity::{EntityId, EntityKind, UltStrategy};
use crate::error::SimError;
use crate::event::{Event, EventKind};
use crate::kernel::Kernel;
use crate::scheduler;
use crate::state::{GameState, Outcome, Phase};
use crate::stats;

/// What happened during the actor's turn, for turn-end bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
struct TurnSummary {
    skipped: bool,
    used_ultimate: bool,
}

impl Kernel {
    /// Runs one scheduler cycle: the next entity's turn plus any interrupts
    /// it triggers.
    ///
    /// A decided battle is returned unchanged. Callers loop until
    /// `result.outcome` is set.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails. `state` is untouched.
    pub fn step(&self, state: &GameState) -> Result<GameState, SimError> {
        let mut next = state.clone();
        self.run_turn(&mut next)?;
        Ok(next)
    }

    fn run_turn(&self, state: &mut GameState) -> Result<(), SimError> {
        if state.result.outcome.is_some() {
            return Ok(());
        }
        if let Some(outcome) = state.decided_outcome() {
            state.result.outcome = Some(outcome);
            return Ok(());
        }
        if state.queue.is_empty() {
            scheduler::resync(state);
        }
        let Some(head) = state.queue.head() else {
            return Ok(());
        };
        if state.time + head.action_value > state.time_budget {
            tracing::debug!(time = state.time, budget = state.time_budget, "time budget exhausted");
            state.result.outcome = Some(Outcome::Timeout);
            return Ok(());
        }

        scheduler::advance_timeline(state, head.action_value);
        let actor = head.entity;
        state.current_turn = Some(actor);
        state.turn += 1;
        tracing::debug!(%actor, time = state.time, turn = state.turn, "turn start");

        let mut summary = TurnSummary {
            skipped: self.pre_turn(state, actor)?,
            used_ultimate: false,
        };
        if !summary.skipped && state.registry.is_alive(actor) && state.decided_outcome().is_none() {
            summary.used_ultimate = self.action_loop(state, actor)?;
        }
        self.drain_pending(state)?;
        self.interrupt_check(state)?;
        self.turn_end(state, actor, summary)?;

        scheduler::resync(state);
        debug_assert!(
            state.check_invariants().is_ok(),
            "invariant broken after turn {}: {:?}",
            state.turn,
            state.check_invariants()
        );
        state.current_turn = None;
        state.result.outcome = state.decided_outcome();
        Ok(())
    }

    // =========================================================================
    // Phases
    // =========================================================================

    /// Returns true if crowd control costs the actor this turn.
    fn pre_turn(&self, state: &mut GameState, actor: EntityId) -> Result<bool, SimError> {
        scheduler::reset_action_value(state, actor);
        self.emit(state, &Event::new(EventKind::TurnStart).with_source(actor))?;
        self.recover_toughness(state, actor)?;
        self.resolve_dots(state, actor)?;
        if !state.registry.is_alive(actor) {
            return Ok(true);
        }
        let expired = effect::tick_turn_start(state, actor);
        self.announce_removed(state, &expired)?;
        self.resolve_crowd_control(state, actor)
    }

    /// Returns true if the actor used its ultimate as a turn action.
    fn action_loop(&self, state: &mut GameState, actor: EntityId) -> Result<bool, SimError> {
        let cap = self.limits().max_actions_per_turn;
        let mut used_ultimate = false;
        let mut taken = 0;
        while let Some(action) = determine_action(state, actor) {
            used_ultimate |= action.kind() == Some(ActionKind::Ultimate);
            taken += 1;
            self.execute(state, &action)?;
            if state.decided_outcome().is_some() || !state.registry.is_alive(actor) {
                break;
            }
            let Some(extra) = extra_action(state, actor) else {
                break;
            };
            if taken >= cap {
                state.record_cap(Phase::ActionLoop, cap);
                break;
            }
            self.remove_effect(state, actor, &extra)?;
            tracing::debug!(%actor, taken, "extra action");
        }
        Ok(used_ultimate)
    }

    fn interrupt_check(&self, state: &mut GameState) -> Result<(), SimError> {
        let cap = self.limits().max_interrupts;
        let mut fired = 0;
        while state.decided_outcome().is_none() {
            let Some(ready) = state
                .registry
                .iter()
                .find(|e| {
                    e.is_alive()
                        && e.kind() == EntityKind::Character
                        && e.rotation.ult_strategy == UltStrategy::Immediate
                        && e.ult_ready()
                })
                .map(|e| e.id())
            else {
                break;
            };
            if fired >= cap {
                state.record_cap(Phase::InterruptCheck, cap);
                break;
            }
            fired += 1;
            tracing::debug!(entity = %ready, time = state.time, "interrupt ultimate");
            self.execute(state, &Action::ability(ActionKind::Ultimate, ready, None))?;
            self.drain_pending(state)?;
        }
        Ok(())
    }

    fn turn_end(
        &self,
        state: &mut GameState,
        actor: EntityId,
        summary: TurnSummary,
    ) -> Result<(), SimError> {
        self.emit(state, &Event::new(EventKind::TurnEnd).with_source(actor))?;
        let expired = effect::tick_turn_end(state, actor);
        self.announce_removed(state, &expired)?;
        state.cooldowns.tick_owner(actor);
        state.registry.update(actor, |e| {
            if !summary.skipped && !summary.used_ultimate {
                e.rotation_cursor = e.rotation.next_cursor(e.rotation_cursor);
            }
            if !summary.used_ultimate {
                e.ult_cooldown = e.ult_cooldown.saturating_sub(1);
            }
        });
        stats::rebuild_all(&mut state.registry);
        Ok(())
    }
}

/// First `EXTRA_ACTION` effect on the actor, if any.
fn extra_action(state: &GameState, actor: EntityId) -> Option<EffectId> {
    state.entity(actor).and_then(|e| {
        e.effects
            .iter()
            .find(|effect| effect.tags.contains(EffectTags::EXTRA_ACTION))
            .map(|effect| effect.id.clone())
    })
}

/// Chooses the actor's turn action.
///
/// A queued external command for the actor wins. Otherwise enemies
/// basic-attack, summons use their skill, and characters fire a ready
/// `OnTurn` ultimate or follow their rotation.
fn determine_action(state: &mut GameState, actor: EntityId) -> Option<Action> {
    if let Some(index) = state
        .commands
        .iter()
        .position(|command| command.source() == Some(actor))
    {
        return state.commands.remove(index);
    }

    let entity = state.entity(actor).filter(|e| e.is_alive())?;
    let kind = match entity.kind() {
        EntityKind::Enemy => ActionKind::Basic,
        EntityKind::Summon if entity.abilities.skill.is_some() => ActionKind::Skill,
        EntityKind::Summon => ActionKind::Basic,
        EntityKind::Character => {
            if entity.rotation.ult_strategy == UltStrategy::OnTurn && entity.ult_ready() {
                ActionKind::Ultimate
            } else if entity.rotation.wants_skill(entity.rotation_cursor)
                && !entity.has_tag(EffectTags::SKILL_SILENCE)
                && entity
                    .abilities
                    .skill
                    .as_ref()
                    .is_some_and(|skill| state.skill_points >= skill.sp_cost)
            {
                ActionKind::Skill
            } else {
                ActionKind::Basic
            }
        }
    };
    Some(Action::ability(kind, actor, None))
}

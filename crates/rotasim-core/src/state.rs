//! The game state threaded through every kernel transition.
//!
//! # Architecture
//!
//! [`GameState`] is a plain value. Kernel entry points borrow the caller's
//! state and return a new one; internally a transition works on its own copy.
//! Cloning is cheap: entity records and the log are reference-counted and
//! replaced whole on write.
//!
//! # Determinism
//!
//! Every random draw (crit, enemy targeting, bounce targets, effect chance)
//! comes from [`GameState::rng`], a `ChaCha8Rng` seeded from the battle
//! config. Two states built from the same config evolve identically.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::action::Action;
use crate::damage::{CritPolicy, HitModifiers};
use crate::effect::EffectId;
use crate::entity::{Entity, EntityId, Side};
use crate::error::InvariantViolation;
use crate::handler::{Cooldowns, HandlerTable};
use crate::log::{ActionLog, LogEntry};
use crate::registry::Registry;
use crate::scheduler::ActionQueue;

/// Initial team skill points.
pub const INITIAL_SKILL_POINTS: u32 = 3;

/// Team skill point cap.
pub const MAX_SKILL_POINTS: u32 = 5;

/// How a battle ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every enemy is down.
    Victory,
    /// Every ally is down.
    Defeat,
    /// The round budget ran out.
    Timeout,
}

/// Per-entity totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Contribution {
    /// Damage dealt.
    pub damage: f64,
    /// Healing done.
    pub healing: f64,
    /// Shield granted.
    pub shield: f64,
}

/// Running battle totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BattleResult {
    /// Set once the battle is decided.
    pub outcome: Option<Outcome>,
    /// Damage dealt by allies.
    pub total_damage: f64,
    /// Totals per source entity.
    pub contributions: BTreeMap<EntityId, Contribution>,
}

/// Phase that hit an iteration cap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Extra-action loop of one turn.
    ActionLoop,
    /// Pending follow-up drain.
    DrainPending,
    /// Interrupt scan.
    InterruptCheck,
    /// Re-entrant event publishing.
    EventDepth,
    /// Whole-battle turn limit.
    Run,
}

/// Record of a cap exit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Phase that was cut short.
    pub phase: Phase,
    /// Entity whose turn it was.
    pub actor: Option<EntityId>,
    /// The cap that was hit.
    pub cap: usize,
    /// Global clock.
    pub time: f64,
}

/// Complete battle state.
#[derive(Debug, Clone, Serialize)]
pub struct GameState {
    /// Every entity.
    pub registry: Registry,
    /// Turn order.
    pub queue: ActionQueue,
    /// Global clock in action-value units.
    pub time: f64,
    /// Clock value at which the battle times out.
    pub time_budget: f64,
    /// Team skill points.
    pub skill_points: u32,
    /// Skill point cap.
    pub max_skill_points: u32,
    /// Handler registrations in order.
    pub handlers: HandlerTable,
    /// Handler cooldowns.
    pub cooldowns: Cooldowns,
    /// Follow-up actions queued during the current turn.
    pub pending: VecDeque<Action>,
    /// Externally supplied turn actions, consumed before rotation logic.
    pub commands: VecDeque<Action>,
    /// Modifiers for the hit being computed.
    pub hit_modifiers: HitModifiers,
    /// Entity whose turn is in progress.
    pub current_turn: Option<EntityId>,
    /// Number of turns taken so far.
    pub turn: u64,
    /// Battle log.
    pub log: ActionLog,
    /// Running totals and outcome.
    pub result: BattleResult,
    /// Cap exits.
    pub diagnostics: Vec<Diagnostic>,
    /// Crit sampling policy.
    pub crit_policy: CritPolicy,
    /// Current re-entrant publish depth.
    pub event_depth: usize,
    /// Seeded RNG.
    pub rng: ChaCha8Rng,
}

impl GameState {
    /// Creates a state around `registry` with default resources.
    #[must_use]
    pub fn new(registry: Registry, seed: u64) -> Self {
        Self {
            registry,
            queue: ActionQueue::default(),
            time: 0.0,
            time_budget: f64::INFINITY,
            skill_points: INITIAL_SKILL_POINTS,
            max_skill_points: MAX_SKILL_POINTS,
            handlers: HandlerTable::new(),
            cooldowns: Cooldowns::default(),
            pending: VecDeque::new(),
            commands: VecDeque::new(),
            hit_modifiers: HitModifiers::default(),
            current_turn: None,
            turn: 0,
            log: ActionLog::new(),
            result: BattleResult::default(),
            diagnostics: Vec::new(),
            crit_policy: CritPolicy::Roll,
            event_depth: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Shortcut for `registry.get(id)`.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    /// Queues a follow-up action to run before the turn completes.
    pub fn enqueue(&mut self, action: Action) {
        self.pending.push_back(action);
    }

    /// Queues an external command for the next turn of its source.
    pub fn push_command(&mut self, action: Action) {
        self.commands.push_back(action);
    }

    /// Adds skill points up to the cap.
    pub fn gain_skill_points(&mut self, amount: u32) {
        self.skill_points = (self.skill_points + amount).min(self.max_skill_points);
    }

    /// Removes skill points, floored at zero.
    pub fn spend_skill_points(&mut self, amount: u32) {
        self.skill_points = self.skill_points.saturating_sub(amount);
    }

    /// Appends a log entry.
    pub fn record(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }

    /// Records a cap exit.
    pub fn record_cap(&mut self, phase: Phase, cap: usize) {
        tracing::warn!(?phase, cap, actor = ?self.current_turn, time = self.time, "iteration cap hit");
        self.diagnostics.push(Diagnostic {
            phase,
            actor: self.current_turn,
            cap,
            time: self.time,
        });
    }

    /// Adds to an entity's contribution totals.
    pub fn credit(&mut self, source: EntityId, damage: f64, healing: f64, shield: f64) {
        let entry = self.result.contributions.entry(source).or_default();
        entry.damage += damage;
        entry.healing += healing;
        entry.shield += shield;
        if self.registry.get(source).is_some_and(|e| !e.is_enemy()) {
            self.result.total_damage += damage;
        }
    }

    /// Victory once every enemy is down, defeat once every non-summon ally is
    /// down, `None` while both sides stand.
    #[must_use]
    pub fn decided_outcome(&self) -> Option<Outcome> {
        let enemies_alive = self.registry.alive_on(Side::Enemy).next().is_some();
        let party_alive = self
            .registry
            .alive_on(Side::Ally)
            .any(|e| !e.is_summon());
        match (party_alive, enemies_alive) {
            (_, false) => Some(Outcome::Victory),
            (false, true) => Some(Outcome::Defeat),
            (true, true) => None,
        }
    }

    /// Verifies the core invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for entity in self.registry.iter() {
            let max_hp = entity.max_hp();
            if entity.hp < 0.0 || entity.hp > max_hp + 1e-6 {
                return Err(InvariantViolation::HpOutOfRange {
                    entity: entity.id(),
                    hp: entity.hp,
                    max_hp,
                });
            }
        }

        let mut seen = BTreeSet::new();
        for entry in self.queue.entries() {
            if !seen.insert(entry.entity) {
                return Err(InvariantViolation::DuplicateQueueEntry(entry.entity));
            }
            if !self.registry.is_alive(entry.entity) {
                return Err(InvariantViolation::DeadInQueue(entry.entity));
            }
        }
        if self
            .queue
            .entries()
            .windows(2)
            .any(|pair| pair[0].action_value > pair[1].action_value)
        {
            return Err(InvariantViolation::QueueUnordered);
        }

        let all_effects: BTreeSet<(EntityId, &EffectId)> = self
            .registry
            .iter()
            .flat_map(|e| e.effects.iter().map(move |effect| (e.id(), &effect.id)))
            .collect();
        for entity in self.registry.iter() {
            for effect in &entity.effects {
                if let Some(parent) = effect.parent() {
                    let present = match effect.parent_host() {
                        Some(host) => all_effects.contains(&(host, parent)),
                        None => all_effects.iter().any(|(_, id)| *id == parent),
                    };
                    if !present {
                        return Err(InvariantViolation::OrphanedEffect {
                            entity: entity.id(),
                            effect: effect.id.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Effect, EffectKind};
    use crate::entity::EntityKind;
    use crate::stats::StatKey;

    fn state_with_hero() -> (GameState, EntityId) {
        let mut registry = Registry::new();
        let hero = registry.spawn(|id| {
            let mut e = Entity::new(id, EntityKind::Character, Side::Ally, "Hero");
            e.stats.set(StatKey::Hp, 100.0);
            e.hp = 100.0;
            e
        });
        (GameState::new(registry, 7), hero)
    }

    #[test]
    fn skill_points_are_bounded() {
        let (mut state, _) = state_with_hero();
        state.gain_skill_points(10);
        assert_eq!(state.skill_points, MAX_SKILL_POINTS);
        state.spend_skill_points(9);
        assert_eq!(state.skill_points, 0);
    }

    #[test]
    fn invariants_hold_for_fresh_state() {
        let (state, _) = state_with_hero();
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn hp_above_max_is_reported() {
        let (mut state, hero) = state_with_hero();
        state.registry.update(hero, |e| e.hp = 150.0);
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::HpOutOfRange { .. })
        ));
    }

    #[test]
    fn orphaned_link_is_reported() {
        let (mut state, hero) = state_with_hero();
        state.registry.update(hero, |e| {
            e.effects
                .push(Effect::new("child", "Child", EffectKind::Buff).linked_to("gone"));
        });
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::OrphanedEffect { .. })
        ));
    }

    #[test]
    fn credit_tracks_ally_damage() {
        let (mut state, hero) = state_with_hero();
        state.credit(hero, 100.0, 5.0, 0.0);
        state.credit(hero, 50.0, 0.0, 0.0);
        assert!((state.result.total_damage - 150.0).abs() < 0.0001);
        assert!((state.result.contributions[&hero].healing - 5.0).abs() < 0.0001);
    }
}

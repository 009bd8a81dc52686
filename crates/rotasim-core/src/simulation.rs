//! Battle runner: builds the initial state, steps it to an outcome and
//! summarises the result.
//!
//! # Run loop
//!
//! 1. Register kit handlers
//! 2. Dispatch `BattleStart`
//! 3. Step until the battle is decided, or `max_turns` as a hard cap
//! 4. Return a [`BattleReport`]
//!
//! # Determinism
//!
//! Every random draw comes from the state's seeded RNG, so the same config
//! and seed always produce the same report.
//!
//! # Example
//!
//! ```
//! use rotasim_core::config::SimulationConfig;
//! use rotasim_core::handler::KitCatalog;
//! use rotasim_core::simulation::Simulation;
//!
//! let config: SimulationConfig = serde_json::from_str(r#"{
//!     "characters": [{ "name": "Hero", "stats": { "hp": 8000, "atk": 1500, "spd": 120 } }],
//!     "enemies": [{ "name": "Slime", "hp": 6000, "speed": 90 }],
//!     "rounds": 30,
//!     "seed": 7
//! }"#).unwrap();
//!
//! let report = Simulation::new(&config, KitCatalog::new()).unwrap().run().unwrap();
//! assert!(report.turns > 0);
//! assert!(report.total_damage > 0.0);
//! ```

use std::fmt;

use serde::Serialize;

use crate::action::Action;
use crate::config::{create_initial_state, SimulationConfig};
use crate::entity::EntityId;
use crate::error::{ConfigError, SimError};
use crate::handler::{self, KitCatalog};
use crate::kernel::Kernel;
use crate::log::LogEntry;
use crate::state::{Diagnostic, GameState, Outcome, Phase};

// =============================================================================
// Report
// =============================================================================

/// Totals of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityContribution {
    /// Entity id.
    pub entity: EntityId,
    /// Display name.
    pub name: String,
    /// Damage dealt.
    pub damage: f64,
    /// Healing done.
    pub healing: f64,
    /// Shield granted.
    pub shield: f64,
}

/// Summary of a finished battle.
#[derive(Debug, Clone, Serialize)]
pub struct BattleReport {
    /// How the battle ended.
    pub outcome: Outcome,
    /// Turns taken.
    pub turns: u64,
    /// Clock at the end of the battle.
    pub time: f64,
    /// Damage dealt by the party and its summons.
    pub total_damage: f64,
    /// Per-entity totals in roster order.
    pub contributions: Vec<EntityContribution>,
    /// Cap exits recorded during the run.
    pub diagnostics: Vec<Diagnostic>,
    /// The battle log.
    pub log: Vec<LogEntry>,
    /// Final state.
    #[serde(skip)]
    pub state: GameState,
}

impl BattleReport {
    fn from_state(state: GameState, outcome: Outcome) -> Self {
        let contributions = state
            .registry
            .iter()
            .filter_map(|entity| {
                state
                    .result
                    .contributions
                    .get(&entity.id())
                    .map(|totals| EntityContribution {
                        entity: entity.id(),
                        name: entity.name.clone(),
                        damage: totals.damage,
                        healing: totals.healing,
                        shield: totals.shield,
                    })
            })
            .collect();
        Self {
            outcome,
            turns: state.turn,
            time: state.time,
            total_damage: state.result.total_damage,
            contributions,
            diagnostics: state.diagnostics.clone(),
            log: state.log.entries().to_vec(),
            state,
        }
    }
}

impl fmt::Display for BattleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Outcome: {:?} after {} turns (AV {:.1})",
            self.outcome, self.turns, self.time
        )?;
        writeln!(f, "Total damage: {:.0}", self.total_damage)?;
        for row in &self.contributions {
            writeln!(
                f,
                "  {:<16} dmg {:>12.0}  heal {:>10.0}  shield {:>10.0}",
                row.name, row.damage, row.healing, row.shield
            )?;
        }
        for diagnostic in &self.diagnostics {
            writeln!(
                f,
                "  cap hit: {:?} (cap {}) at AV {:.1}",
                diagnostic.phase, diagnostic.cap, diagnostic.time
            )?;
        }
        Ok(())
    }
}

// =============================================================================
// Simulation
// =============================================================================

/// A configured battle, ready to run.
#[derive(Debug, Clone)]
pub struct Simulation {
    kernel: Kernel,
    state: GameState,
}

impl Simulation {
    /// Builds the initial state from `config` and kit `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config is rejected.
    pub fn new(config: &SimulationConfig, catalog: KitCatalog) -> Result<Self, ConfigError> {
        let state = create_initial_state(config, &catalog)?;
        Ok(Self {
            kernel: Kernel::new(catalog, config.limits),
            state,
        })
    }

    /// Wraps an existing state.
    #[must_use]
    pub fn from_state(kernel: Kernel, state: GameState) -> Self {
        Self { kernel, state }
    }

    /// The kernel driving the battle.
    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Runs the battle to an outcome.
    ///
    /// Hitting `max_turns` records a diagnostic and ends the battle as a
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails or an entity names an unknown
    /// kit.
    pub fn run(self) -> Result<BattleReport, SimError> {
        let Self { kernel, mut state } = self;
        handler::register_kits(&mut state, kernel.catalog())?;
        let mut state = kernel.dispatch(&state, &Action::BattleStart)?;

        let max_turns = kernel.limits().max_turns;
        let turn_cap = u64::try_from(max_turns).unwrap_or(u64::MAX);
        while state.result.outcome.is_none() {
            if state.turn >= turn_cap {
                state.record_cap(Phase::Run, max_turns);
                state.result.outcome = Some(Outcome::Timeout);
                break;
            }
            let turn = state.turn;
            state = kernel.step(&state)?;
            if state.turn == turn && state.result.outcome.is_none() {
                // Nothing left to schedule.
                state.result.outcome = Some(state.decided_outcome().unwrap_or(Outcome::Timeout));
            }
        }

        let outcome = state.result.outcome.unwrap_or(Outcome::Timeout);
        tracing::info!(?outcome, turns = state.turn, time = state.time, damage = state.result.total_damage, "battle finished");
        Ok(BattleReport::from_state(state, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers;

    #[test]
    fn run_reaches_an_outcome() {
        let report = Simulation::new(&helpers::sample_config(), KitCatalog::new())
            .unwrap()
            .run()
            .unwrap();
        assert!(report.turns > 0);
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.log.len(), report.state.log.len());
        assert!(report.state.check_invariants().is_ok());
    }

    #[test]
    fn weak_party_times_out() {
        let mut config = helpers::sample_config();
        config.enemies[0].hp = 1.0e9;
        config.rounds = 2;
        let report = Simulation::new(&config, KitCatalog::new())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(report.outcome, Outcome::Timeout);
        assert!(report.time <= config.time_budget());
    }

    #[test]
    fn turn_cap_is_recorded() {
        let mut config = helpers::sample_config();
        config.enemies[0].hp = 1.0e9;
        config.rounds = 1000;
        config.limits.max_turns = 10;
        let report = Simulation::new(&config, KitCatalog::new())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(report.outcome, Outcome::Timeout);
        assert_eq!(report.turns, 10);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].phase, Phase::Run);
    }

    #[test]
    fn contributions_follow_roster_order() {
        let report = Simulation::new(&helpers::sample_config(), KitCatalog::new())
            .unwrap()
            .run()
            .unwrap();
        let names: Vec<&str> = report.contributions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"Seele"));
        let summed: f64 = report
            .contributions
            .iter()
            .filter(|c| !report.state.entity(c.entity).is_some_and(|e| e.is_enemy()))
            .map(|c| c.damage)
            .sum();
        assert!((summed - report.total_damage).abs() < 0.001);
    }

    #[test]
    fn report_renders_summary() {
        let report = Simulation::new(&helpers::sample_config(), KitCatalog::new())
            .unwrap()
            .run()
            .unwrap();
        let text = report.to_string();
        assert!(text.starts_with("Outcome:"));
        assert!(text.contains("Seele"));
    }
}

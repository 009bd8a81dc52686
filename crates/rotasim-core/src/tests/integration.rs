//! Integration tests for the full simulation pipeline.
//!
//! These tests run whole battles through [`Simulation`], from config to
//! report, checking:
//! - Battle outcomes (victory, defeat, timeout)
//! - Config validation errors
//! - The standard kits reacting inside a real battle loop

use crate::action::ActionKind;
use crate::config::{CharacterConfig, EnemyConfig, SimulationConfig};
use crate::error::ConfigError;
use crate::handler::KitCatalog;
use crate::kits::{standard_catalog, SpiritKit};
use crate::log::LogKind;
use crate::simulation::{BattleReport, Simulation};
use crate::state::Outcome;

use super::helpers::sample_config;

// =============================================================================
// Helpers
// =============================================================================

fn run(config: &SimulationConfig) -> BattleReport {
    Simulation::new(config, standard_catalog())
        .expect("config should be valid")
        .run()
        .expect("battle should run")
}

fn count(report: &BattleReport, actor: &str, kind: LogKind) -> usize {
    report
        .log
        .iter()
        .filter(|e| e.actor_name == actor && e.kind == kind)
        .count()
}

/// The sample party against an enemy that cannot be killed in time.
fn endless_config() -> SimulationConfig {
    let mut config = sample_config();
    config.enemies[0].hp = 1.0e9;
    config
}

// =============================================================================
// Outcomes
// =============================================================================

/// Verify that the sample battle runs to a victory with a consistent report.
#[test]
fn sample_battle_ends_in_victory() {
    let report = run(&sample_config());

    assert_eq!(report.outcome, Outcome::Victory);
    assert!(report.turns > 0);
    assert!(report.diagnostics.is_empty(), "No cap should be hit");
    assert_eq!(report.log.first().map(|e| e.kind), Some(LogKind::BattleStart));
    assert!(report.state.check_invariants().is_ok());

    let party_damage: f64 = report
        .contributions
        .iter()
        .filter(|c| c.name != "Slime")
        .map(|c| c.damage)
        .sum();
    assert!(report.total_damage >= 20_000.0 - 0.0001);
    assert!((party_damage - report.total_damage).abs() < 0.0001);
}

/// Verify that a battle nobody can win stops at the round budget.
#[test]
fn endless_battle_times_out() {
    let mut config = endless_config();
    config.rounds = 3;
    let report = run(&config);

    assert_eq!(report.outcome, Outcome::Timeout);
    assert!(report.time <= config.time_budget());
    assert!(report.state.check_invariants().is_ok());
}

/// Verify that a lethal enemy defeats the party.
#[test]
fn overwhelming_enemy_defeats_party() {
    let mut config = endless_config();
    config.enemies[0].atk = 1.0e7;
    let report = run(&config);

    assert_eq!(report.outcome, Outcome::Defeat);
    assert!(report
        .state
        .registry
        .iter()
        .filter(|e| !e.is_enemy())
        .all(|e| !e.is_alive()));
    assert_eq!(count(&report, "Seele", LogKind::Defeat), 1);
    assert_eq!(count(&report, "March", LogKind::Defeat), 1);
}

/// Verify that more rounds never shorten a battle.
#[test]
fn longer_budget_runs_at_least_as_long() {
    let mut short = endless_config();
    short.rounds = 2;
    let mut long = endless_config();
    long.rounds = 4;

    let short = run(&short);
    let long = run(&long);
    assert!(long.turns >= short.turns);
    assert!(long.total_damage >= short.total_damage);
}

// =============================================================================
// Configuration
// =============================================================================

/// Verify that an unknown kit is rejected before the battle starts.
#[test]
fn unknown_kit_is_rejected() {
    let mut config = sample_config();
    config.characters[0].kit = Some("does_not_exist".into());
    let err = Simulation::new(&config, standard_catalog()).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKit { .. }), "Got {err:?}");
}

/// Verify that kits are only valid when the catalog supplies them.
#[test]
fn kits_need_a_catalog_entry() {
    let mut config = sample_config();
    config.characters[0].kit = Some("resurgence".into());
    assert!(Simulation::new(&config, KitCatalog::new()).is_err());
    assert!(Simulation::new(&config, standard_catalog()).is_ok());
}

/// Verify that an empty party is a config error.
#[test]
fn empty_party_is_rejected() {
    let mut config = sample_config();
    config.characters.clear();
    let err = Simulation::new(&config, standard_catalog()).unwrap_err();
    assert!(matches!(err, ConfigError::NoPartyMembers), "Got {err:?}");
}

/// Verify that a config read from JSON runs the same battle as the one it
/// was written from.
#[test]
fn json_config_round_trips_into_same_battle() {
    let config = sample_config();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: SimulationConfig = serde_json::from_str(&json).unwrap();

    let first = run(&config);
    let second = run(&parsed);
    assert_eq!(first.turns, second.turns);
    assert!((first.total_damage - second.total_damage).abs() < f64::EPSILON);
}

// =============================================================================
// Standard Kits
// =============================================================================

/// Verify that the counter kit answers enemy attacks with follow-ups.
#[test]
fn counter_kit_strikes_back() {
    let mut config = endless_config();
    config.characters.remove(0);
    config.characters[0].kit = Some("counter".into());
    let report = run(&config);

    let attacks = count(&report, "Slime", LogKind::Action(ActionKind::Basic));
    let counters = count(&report, "March", LogKind::Action(ActionKind::FollowUp));
    assert!(attacks > 0, "The slime should attack at least once");
    assert!(counters > 0, "March should counter");
    assert!(counters <= attacks);
    assert!(report.diagnostics.is_empty());
}

/// Verify that the spirit kit summons at battle start and the summon takes
/// turns of its own.
#[test]
fn spirit_kit_fights_alongside_owner() {
    let mut config = endless_config();
    config.characters[1].kit = Some(SpiritKit::ID.into());
    let report = run(&config);

    assert_eq!(count(&report, SpiritKit::SPIRIT_NAME, LogKind::Summon), 1);
    assert!(count(&report, SpiritKit::SPIRIT_NAME, LogKind::Action(ActionKind::Skill)) > 0);
    let spirit = report
        .contributions
        .iter()
        .find(|c| c.name == SpiritKit::SPIRIT_NAME)
        .expect("spirit should be credited");
    assert!(spirit.damage > 0.0);
}

/// Verify that a full party of standard kits plays out without hitting any
/// iteration cap and keeps every invariant.
#[test]
fn full_kit_party_is_stable() {
    let mut config = endless_config();
    let kits = ["resurgence", "benediction", "field", "counter"];
    let template = config.characters[1].clone();
    config.characters.push(CharacterConfig {
        name: "Bronya".into(),
        ..template.clone()
    });
    config.characters.push(CharacterConfig {
        name: "Tingyun".into(),
        ..template
    });
    for (character, kit) in config.characters.iter_mut().zip(kits) {
        character.kit = Some(kit.into());
    }
    config.enemies.push(EnemyConfig {
        name: "Slime B".into(),
        ..config.enemies[0].clone()
    });
    config.rounds = 6;

    let report = run(&config);
    assert_eq!(report.outcome, Outcome::Timeout);
    assert!(report.diagnostics.is_empty(), "Got {:?}", report.diagnostics);
    assert!(report.state.check_invariants().is_ok());
    assert!(report.state.pending.is_empty());
}

//! # Rotasim Core
//!
//! Deterministic turn-based combat kernel for party rotation simulation.
//!
//! This crate provides the simulation engine: an action-value scheduler, a
//! synchronous event bus with pluggable ability kits, an effect manager, a
//! damage pipeline and the turn orchestrator that ties them together.
//!
//! ## Architecture
//!
//! - **Entities**: characters, enemies and summons stored in a [`Registry`]
//! - **Kits**: [`AbilityKit`] implementations reacting to battle events
//! - **Resolvers**: damage, toughness, healing, shields, effects, summons
//! - **Orchestrator**: one [`Kernel::step`] runs one turn to completion
//!
//! Every transition takes a [`GameState`] and returns the next one. Kits
//! receive the state by value and return it, so the kernel never shares
//! mutable state with kit code.
//!
//! ## Usage
//!
//! ```
//! use rotasim_core::config::SimulationConfig;
//! use rotasim_core::kits::standard_catalog;
//! use rotasim_core::simulation::Simulation;
//!
//! let config: SimulationConfig = serde_json::from_str(r#"{
//!     "characters": [
//!         { "name": "Seele", "element": "quantum", "kit": "resurgence",
//!           "stats": { "hp": 4000, "atk": 2400, "spd": 115 } }
//!     ],
//!     "enemies": [{ "name": "Slime", "hp": 20000, "speed": 90 }],
//!     "rounds": 20,
//!     "seed": 42
//! }"#).unwrap();
//!
//! let report = Simulation::new(&config, standard_catalog()).unwrap().run().unwrap();
//! println!("{report}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// Core modules
pub mod ability;
pub mod action;
pub mod config;
pub mod damage;
pub mod effect;
pub mod energy;
pub mod entity;
pub mod error;
pub mod event;
pub mod handler;
pub mod kernel;
pub mod log;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod stats;

// Turn processing
pub mod orchestrator;
pub mod resolver;
pub mod simulation;

// Ability kits
pub mod kits;

pub use action::{Action, ActionKind};
pub use config::{create_initial_state, SimulationConfig};
pub use entity::{Entity, EntityId};
pub use error::{ConfigError, HandlerError, SimError};
pub use event::{Event, EventKind};
pub use handler::{AbilityKit, KitCatalog, KitId};
pub use kernel::Kernel;
pub use registry::Registry;
pub use simulation::{BattleReport, Simulation};
pub use state::{GameState, Outcome};

#[cfg(test)]
mod tests;

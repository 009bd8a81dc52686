//! Crate-level tests for the battle kernel.
//!
//! - **Determinism tests**: same config and seed produce identical logs
//! - **Scenario tests**: hand-built battles checking one rule each
//! - **Integration tests**: full simulations with the standard kits
//!
//! # Test Structure
//!
//! - `determinism.rs`: reproducibility and scheduler properties
//! - `scenarios.rs`: damage, durations, stacking, interrupts, shields
//! - `integration.rs`: end-to-end battles through [`crate::Simulation`]
//! - `helpers.rs`: state factories shared with the unit tests

pub mod helpers;

mod determinism;
mod integration;

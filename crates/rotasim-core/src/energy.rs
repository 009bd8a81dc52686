//! Energy gain.
//!
//! Base energy is scaled by the entity's energy regeneration rate; flat
//! energy is added as is. The total is capped at max energy.

use crate::entity::EntityId;
use crate::state::GameState;
use crate::stats::StatKey;

/// Energy the killer gains for defeating an entity.
pub const KILL_ENERGY_REWARD: f64 = 10.0;

/// Fraction of max energy characters start the battle with.
pub const INITIAL_ENERGY_RATIO: f64 = 0.5;

/// `base × (1 + regen rate)`.
#[must_use]
pub fn scaled_gain(base: f64, regen_rate: f64) -> f64 {
    base * (1.0 + regen_rate)
}

/// Adds energy to `id`.
///
/// # Arguments
///
/// * `base` - Energy scaled by the entity's regeneration rate
/// * `flat` - Energy added unscaled
///
/// # Returns
///
/// Energy actually gained after the cap; zero for missing or dead entities.
pub fn gain_energy(state: &mut GameState, id: EntityId, base: f64, flat: f64) -> f64 {
    if !state.registry.is_alive(id) {
        return 0.0;
    }
    let mut gained = 0.0;
    state.registry.update(id, |e| {
        let gain = scaled_gain(base, e.stats.get(StatKey::EnergyRegenRate)) + flat;
        let next = (e.energy + gain).clamp(0.0, e.max_energy().max(0.0));
        gained = next - e.energy;
        e.energy = next;
    });
    gained
}

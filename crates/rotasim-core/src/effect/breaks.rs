//! Weakness-break statuses.
//!
//! Breaking a target applies one status chosen by the attacker's element:
//!
//! | Element   | Status        | Kind          |
//! |-----------|---------------|---------------|
//! | Physical  | Bleed         | DoT           |
//! | Fire      | Burn          | DoT           |
//! | Lightning | Shock         | DoT           |
//! | Wind      | Wind Shear    | stacking DoT  |
//! | Ice       | Freeze        | crowd control |
//! | Quantum   | Entanglement  | crowd control |
//! | Imaginary | Imprisonment  | crowd control |
//!
//! Bases are expressed in multiples of the attacker's break level multiplier
//! and are scaled by break effect when they tick.

use crate::damage::{level_multiplier, toughness_multiplier};
use crate::effect::{
    CrowdControlKind, CrowdControlSpec, DotDamage, DotKind, DotSpec, DurationPolicy, Effect,
    EffectFlags, EffectKind, StackScaling,
};
use crate::entity::{Element, Entity};
use crate::stats::{Modifier, StatKey};

/// Turns a break DoT lasts.
pub const BREAK_DOT_DURATION: i32 = 2;

/// Crowd-control duration; the host loses `duration - 1` turns.
pub const CROWD_CONTROL_DURATION: i32 = 2;

/// Maximum Wind Shear and Entanglement stacks.
pub const MAX_BREAK_STACKS: u32 = 5;

/// Toughness above which an enemy counts as elite for break statuses.
const ELITE_TOUGHNESS: f64 = 100.0;

fn is_elite(target: &Entity) -> bool {
    target.max_toughness > ELITE_TOUGHNESS
}

fn dot(id: &str, name: &str, source: &Entity, dot: DotKind, base: f64) -> Effect {
    Effect::new(
        id,
        name,
        EffectKind::Dot(DotSpec {
            dot,
            element: source.element,
            damage: DotDamage::Fixed { base },
        }),
    )
    .from_source(source.id())
    .with_duration(DurationPolicy::TurnStart, BREAK_DOT_DURATION)
    .with_flags(EffectFlags::CLEANSABLE)
}

fn crowd_control(id: &str, name: &str, source: &Entity, spec: CrowdControlSpec) -> Effect {
    Effect::new(id, name, EffectKind::CrowdControl(spec))
        .from_source(source.id())
        .with_duration(DurationPolicy::TurnStart, CROWD_CONTROL_DURATION)
        .with_flags(EffectFlags::CLEANSABLE)
}

fn break_effect(source: &Entity) -> f64 {
    source.stats.get(StatKey::BreakEffect)
}

/// Bleed: a share of the target's max HP, capped by its toughness.
#[must_use]
pub fn bleed(source: &Entity, target: &Entity) -> Effect {
    let ratio = if is_elite(target) { 0.07 } else { 0.16 };
    let cap = 2.0 * level_multiplier(source.level) * toughness_multiplier(target);
    let base = (target.max_hp() * ratio).min(cap);
    dot("break_bleed", "Bleed", source, DotKind::Bleed, base)
}

/// Burn.
#[must_use]
pub fn burn(source: &Entity) -> Effect {
    dot(
        "break_burn",
        "Burn",
        source,
        DotKind::Burn,
        level_multiplier(source.level),
    )
}

/// Shock.
#[must_use]
pub fn shock(source: &Entity) -> Effect {
    dot(
        "break_shock",
        "Shock",
        source,
        DotKind::Shock,
        2.0 * level_multiplier(source.level),
    )
}

/// Wind Shear: stacking DoT, three initial stacks on elites.
#[must_use]
pub fn wind_shear(source: &Entity, target: &Entity) -> Effect {
    let stacks = if is_elite(target) { 3 } else { 1 };
    dot(
        "break_wind_shear",
        "Wind Shear",
        source,
        DotKind::WindShear,
        level_multiplier(source.level),
    )
    .with_stacks(stacks, MAX_BREAK_STACKS)
}

/// Freeze: skips the host's turn and deals Ice damage when resolved.
#[must_use]
pub fn freeze(source: &Entity) -> Effect {
    crowd_control(
        "break_freeze",
        "Freeze",
        source,
        CrowdControlSpec {
            cc: CrowdControlKind::Freeze,
            element: Element::Ice,
            tick_damage: level_multiplier(source.level),
            delay_on_apply: 0.0,
        },
    )
}

/// Entanglement: delays the host and deals Quantum damage per stack.
///
/// Stacks grow when the entangled host is hit.
#[must_use]
pub fn entanglement(source: &Entity, target: &Entity) -> Effect {
    crowd_control(
        "break_entanglement",
        "Entanglement",
        source,
        CrowdControlSpec {
            cc: CrowdControlKind::Entanglement,
            element: Element::Quantum,
            tick_damage: 0.6 * level_multiplier(source.level) * toughness_multiplier(target),
            delay_on_apply: 0.2 * (1.0 + break_effect(source)),
        },
    )
    .with_stacks(1, MAX_BREAK_STACKS)
    .with_scaling(StackScaling::Fixed)
}

/// Imprisonment: delays the host and slows it by 10%.
#[must_use]
pub fn imprisonment(source: &Entity) -> Effect {
    crowd_control(
        "break_imprisonment",
        "Imprisonment",
        source,
        CrowdControlSpec {
            cc: CrowdControlKind::Imprisonment,
            element: Element::Imaginary,
            tick_damage: 0.0,
            delay_on_apply: 0.3 * (1.0 + break_effect(source)),
        },
    )
    .with_modifier(Modifier::percent(StatKey::Spd, -0.1))
}

/// Break status for `source`'s element.
#[must_use]
pub fn for_element(source: &Entity, target: &Entity) -> Effect {
    match source.element {
        Element::Physical => bleed(source, target),
        Element::Fire => burn(source),
        Element::Lightning => shock(source),
        Element::Wind => wind_shear(source, target),
        Element::Ice => freeze(source),
        Element::Quantum => entanglement(source, target),
        Element::Imaginary => imprisonment(source),
    }
}

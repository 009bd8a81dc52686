//! Damage, healing and shield formulas.
//!
//! Every function here is pure: it reads entity snapshots and returns
//! numbers. Applying the results to state is the job of the combat resolver.
//!
//! # Hit formula
//!
//! ```text
//! final = base × (1 + dmg boost) × crit × def × (1 − res) × (1 + vuln) × broken
//! def   = 1 − targetDef / (targetDef + 200 + 10 × targetLevel)
//! res   = clamp(targetRes − resPen, −1, 0.9)
//! ```
//!
//! `targetDef` is the target's DEF after DEF reduction and DEF ignore, floored
//! at zero. `broken` is 1.0 when the target's toughness is depleted and
//! [`UNBROKEN_MULTIPLIER`] otherwise.
//!
//! # Determinism
//!
//! Crit rolls draw from the caller's RNG through [`roll_crit`]. Given the same
//! inputs and the same crit outcome, every function returns bit-identical
//! results.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ability::{HealSpec, HitSpec, ShieldGrant};
use crate::action::ActionKind;
use crate::entity::{Element, Entity};
use crate::stats::StatKey;

/// Damage multiplier against a target whose toughness is not depleted.
pub const UNBROKEN_MULTIPLIER: f64 = 0.9;

/// Level multiplier at level 80, the base of break-status damage.
pub const LEVEL_CONSTANT_80: f64 = 3767.55;

/// Break damage level multipliers at known levels.
const LEVEL_MULTIPLIERS: [(u32, f64); 8] = [
    (1, 54.0),
    (20, 100.0),
    (30, 231.0),
    (40, 502.0),
    (50, 774.0),
    (60, 1640.0),
    (70, 2660.0),
    (80, LEVEL_CONSTANT_80),
];

/// Bounds of effective resistance.
const RES_FLOOR: f64 = -1.0;
const RES_CEILING: f64 = 0.9;

// =============================================================================
// Types
// =============================================================================

/// Source category of a damage instance; selects the type DMG boost.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum DamageKind {
    Basic,
    Skill,
    Ultimate,
    FollowUp,
    Dot,
    Break,
    Additional,
}

impl DamageKind {
    /// Type-specific DMG boost stat, if any.
    #[must_use]
    pub const fn boost_stat(self) -> Option<StatKey> {
        match self {
            Self::Basic => Some(StatKey::BasicDmgBoost),
            Self::Skill => Some(StatKey::SkillDmgBoost),
            Self::Ultimate => Some(StatKey::UltimateDmgBoost),
            Self::FollowUp => Some(StatKey::FollowUpDmgBoost),
            Self::Dot => Some(StatKey::DotDmgBoost),
            Self::Break | Self::Additional => None,
        }
    }

    /// Ability kind behind the damage, if it came from an ability.
    #[must_use]
    pub const fn action(self) -> Option<ActionKind> {
        match self {
            Self::Basic => Some(ActionKind::Basic),
            Self::Skill => Some(ActionKind::Skill),
            Self::Ultimate => Some(ActionKind::Ultimate),
            Self::FollowUp => Some(ActionKind::FollowUp),
            Self::Dot | Self::Break | Self::Additional => None,
        }
    }
}

impl From<ActionKind> for DamageKind {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Basic => Self::Basic,
            ActionKind::Skill => Self::Skill,
            ActionKind::Ultimate => Self::Ultimate,
            ActionKind::FollowUp => Self::FollowUp,
        }
    }
}

/// Crit sampling policy.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CritPolicy {
    /// Bernoulli draw against the crit rate.
    #[default]
    Roll,
    /// Every hit crits.
    Always,
    /// No hit crits.
    Never,
}

/// Per-hit modifiers injected by handlers during `BeforeDamageCalculation`.
///
/// Reset after every hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HitModifiers {
    /// Extra DEF ignore.
    pub def_ignore: f64,
    /// Extra crit rate.
    pub crit_rate: f64,
    /// Extra crit DMG.
    pub crit_dmg: f64,
    /// Extra DMG boost.
    pub dmg_boost: f64,
    /// Extra break efficiency.
    pub break_efficiency: f64,
}

/// Every multiplier of one damage instance, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    /// Pre-multiplier damage.
    pub base: f64,
    /// `1 + Σ DMG boost`.
    pub dmg_boost: f64,
    /// Crit multiplier, 1.0 when the hit did not crit.
    pub crit: f64,
    /// DEF multiplier.
    pub def: f64,
    /// Resistance multiplier.
    pub res: f64,
    /// Vulnerability multiplier.
    pub vuln: f64,
    /// Broken multiplier.
    pub broken: f64,
    /// Whether the hit crit.
    pub is_crit: bool,
    /// Final damage.
    pub total: f64,
}

/// Result of applying damage to shield and HP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Absorption {
    /// Shield left.
    pub shield: f64,
    /// HP left.
    pub hp: f64,
    /// Damage taken by the shield.
    pub absorbed: f64,
    /// HP lost.
    pub hp_loss: f64,
}

// =============================================================================
// Multipliers
// =============================================================================

/// DEF multiplier of a hit on `target`.
#[must_use]
pub fn def_multiplier(source: &Entity, target: &Entity, extra_def_ignore: f64) -> f64 {
    let shred = target.stats.get(StatKey::DefReduction)
        + source.stats.get(StatKey::DefIgnore)
        + extra_def_ignore;
    let def = (target.stats.get(StatKey::Def) * (1.0 - shred)).max(0.0);
    let level = f64::from(target.level);
    1.0 - def / (def + 200.0 + 10.0 * level)
}

/// Resistance multiplier `1 − clamp(res − pen, −1, 0.9)`.
#[must_use]
pub fn res_multiplier(source: &Entity, target: &Entity, element: Element) -> f64 {
    let res = target.stats.get(element.res_stat());
    let pen =
        source.stats.get(element.res_pen_stat()) + source.stats.get(StatKey::AllTypeResPen);
    1.0 - (res - pen).clamp(RES_FLOOR, RES_CEILING)
}

/// Vulnerability multiplier `1 + all-type + element`.
#[must_use]
pub fn vuln_multiplier(target: &Entity, element: Element) -> f64 {
    1.0 + target.stats.get(StatKey::AllTypeVuln) + target.stats.get(element.vuln_stat())
}

/// 1.0 against a broken target, [`UNBROKEN_MULTIPLIER`] otherwise.
#[must_use]
pub fn broken_multiplier(target: &Entity) -> f64 {
    if target.toughness > 0.0 {
        UNBROKEN_MULTIPLIER
    } else {
        1.0
    }
}

/// `1 + element boost + type boost + all-type boost + extra`.
#[must_use]
pub fn dmg_boost_multiplier(source: &Entity, element: Element, kind: DamageKind, extra: f64) -> f64 {
    let typed = kind
        .boost_stat()
        .map_or(0.0, |stat| source.stats.get(stat));
    1.0 + source.stats.get(element.dmg_boost_stat())
        + typed
        + source.stats.get(StatKey::AllTypeDmgBoost)
        + extra
}

/// Draws a crit outcome.
pub fn roll_crit<R: Rng + ?Sized>(rng: &mut R, crit_rate: f64, policy: CritPolicy) -> bool {
    match policy {
        CritPolicy::Always => true,
        CritPolicy::Never => false,
        CritPolicy::Roll => crit_rate > 0.0 && rng.gen::<f64>() < crit_rate,
    }
}

/// Effective crit rate of `source` for one hit, capped at 1.
#[must_use]
pub fn crit_rate(source: &Entity, modifiers: &HitModifiers) -> f64 {
    (source.stats.get(StatKey::CritRate) + modifiers.crit_rate).min(1.0)
}

// =============================================================================
// Hits
// =============================================================================

/// Computes one ability hit.
///
/// # Arguments
///
/// * `source` - Attacker snapshot
/// * `target` - Defender snapshot
/// * `hit` - Scaling stat and multiplier
/// * `kind` - Damage category
/// * `modifiers` - Handler-injected per-hit modifiers
/// * `is_crit` - Outcome of the crit roll
#[must_use]
pub fn compute_hit(
    source: &Entity,
    target: &Entity,
    hit: &HitSpec,
    kind: DamageKind,
    modifiers: &HitModifiers,
    is_crit: bool,
) -> DamageBreakdown {
    let element = source.element;
    let base = source.stats.get(hit.scaling) * hit.multiplier;
    let dmg_boost = dmg_boost_multiplier(source, element, kind, modifiers.dmg_boost);
    let crit = if is_crit {
        1.0 + source.stats.get(StatKey::CritDmg) + modifiers.crit_dmg
    } else {
        1.0
    };
    let def = def_multiplier(source, target, modifiers.def_ignore);
    let res = res_multiplier(source, target, element);
    let vuln = vuln_multiplier(target, element);
    let broken = broken_multiplier(target);

    DamageBreakdown {
        base,
        dmg_boost,
        crit,
        def,
        res,
        vuln,
        broken,
        is_crit,
        total: base * dmg_boost * crit * def * res * vuln * broken,
    }
}

/// Toughness removed by a hit. Zero unless `target` is weak to `element`.
#[must_use]
pub fn toughness_reduction(
    source: &Entity,
    target: &Entity,
    element: Element,
    amount: f64,
    extra_efficiency: f64,
) -> f64 {
    if target.max_toughness <= 0.0 || !target.weaknesses.has(element) {
        return 0.0;
    }
    amount * (1.0 + source.stats.get(StatKey::BreakEfficiency) + extra_efficiency)
}

// =============================================================================
// Break
// =============================================================================

/// Break damage level multiplier, interpolated between known levels.
#[must_use]
pub fn level_multiplier(level: u32) -> f64 {
    let (first_level, first_value) = LEVEL_MULTIPLIERS[0];
    if level <= first_level {
        return first_value;
    }
    for pair in LEVEL_MULTIPLIERS.windows(2) {
        let (lo, lo_value) = pair[0];
        let (hi, hi_value) = pair[1];
        if level <= hi {
            let ratio = f64::from(level - lo) / f64::from(hi - lo);
            return lo_value + ratio * (hi_value - lo_value);
        }
    }
    LEVEL_CONSTANT_80
}

/// Element multiplier of break damage.
#[must_use]
pub const fn break_element_multiplier(element: Element) -> f64 {
    match element {
        Element::Physical | Element::Fire => 2.0,
        Element::Ice | Element::Lightning => 1.0,
        Element::Wind => 1.5,
        Element::Quantum | Element::Imaginary => 0.5,
    }
}

/// `0.5 + max_toughness / 40`.
#[must_use]
pub fn toughness_multiplier(target: &Entity) -> f64 {
    0.5 + target.max_toughness / 40.0
}

fn mitigated(
    source: &Entity,
    target: &Entity,
    element: Element,
    base: f64,
    boost: f64,
) -> DamageBreakdown {
    let def = def_multiplier(source, target, 0.0);
    let res = res_multiplier(source, target, element);
    let vuln = vuln_multiplier(target, element);
    let broken = broken_multiplier(target);
    DamageBreakdown {
        base,
        dmg_boost: boost,
        crit: 1.0,
        def,
        res,
        vuln,
        broken,
        is_crit: false,
        total: base * boost * def * res * vuln * broken,
    }
}

/// Damage dealt when `source` breaks `target`'s weakness.
#[must_use]
pub fn break_damage(source: &Entity, target: &Entity) -> DamageBreakdown {
    let base = level_multiplier(source.level)
        * break_element_multiplier(source.element)
        * toughness_multiplier(target);
    let boost = 1.0 + source.stats.get(StatKey::BreakEffect);
    mitigated(source, target, source.element, base, boost)
}

/// Fixed-base DoT tick scaled by the source's break effect.
#[must_use]
pub fn break_dot_damage(
    source: &Entity,
    target: &Entity,
    element: Element,
    base: f64,
) -> DamageBreakdown {
    let boost = (1.0 + source.stats.get(StatKey::BreakEffect))
        * (1.0 + source.stats.get(StatKey::DotDmgBoost));
    mitigated(source, target, element, base, boost)
}

/// ATK-scaling DoT tick with the source's DMG boosts.
#[must_use]
pub fn dot_damage(source: &Entity, target: &Entity, element: Element, ratio: f64) -> DamageBreakdown {
    let base = source.stats.get(StatKey::Atk) * ratio;
    let boost = dmg_boost_multiplier(source, element, DamageKind::Dot, 0.0);
    mitigated(source, target, element, base, boost)
}

/// Break-scaled additional damage, used by crowd-control ticks.
#[must_use]
pub fn break_additional_damage(
    source: &Entity,
    target: &Entity,
    element: Element,
    base: f64,
) -> DamageBreakdown {
    let boost = 1.0 + source.stats.get(StatKey::BreakEffect);
    mitigated(source, target, element, base, boost)
}

// =============================================================================
// Absorption, healing, shields
// =============================================================================

/// Applies `damage` to a shield pool first, then to HP floored at zero.
#[must_use]
pub fn absorb(shield: f64, hp: f64, damage: f64) -> Absorption {
    let damage = damage.max(0.0);
    let absorbed = damage.min(shield.max(0.0));
    let remainder = damage - absorbed;
    let hp_after = (hp - remainder).max(0.0);
    Absorption {
        shield: shield - absorbed,
        hp: hp_after,
        absorbed,
        hp_loss: hp - hp_after,
    }
}

/// Raw heal amount `(stat × mult + flat) × (1 + outgoing + incoming)`.
#[must_use]
pub fn heal_amount(source: &Entity, target: &Entity, spec: &HealSpec) -> f64 {
    let base = source.stats.get(spec.scaling) * spec.multiplier + spec.flat;
    base * (1.0
        + source.stats.get(StatKey::OutgoingHealingBoost)
        + target.stats.get(StatKey::IncomingHealingBoost))
}

/// Shield amount `(stat × mult + flat) × (1 + shield strength boost)`.
#[must_use]
pub fn shield_amount(source: &Entity, grant: &ShieldGrant) -> f64 {
    let base = source.stats.get(grant.scaling) * grant.multiplier + grant.flat;
    base * (1.0 + source.stats.get(StatKey::ShieldStrengthBoost))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntityKind, Side, Weaknesses};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn attacker(atk: f64) -> Entity {
        let mut e = Entity::new(EntityId::new(0), EntityKind::Character, Side::Ally, "A");
        e.stats.set(StatKey::Atk, atk);
        e.stats.set(StatKey::CritDmg, 0.5);
        e
    }

    fn defender(def: f64, toughness: f64) -> Entity {
        let mut e = Entity::new(EntityId::new(1), EntityKind::Enemy, Side::Enemy, "D");
        e.stats.set(StatKey::Def, def);
        e.stats.set(StatKey::Hp, 10_000.0);
        e.hp = 10_000.0;
        e.toughness = toughness;
        e.max_toughness = toughness;
        e
    }

    mod hit_tests {
        use super::*;

        #[test]
        fn basic_hit_matches_reference_number() {
            let source = attacker(1000.0);
            let target = defender(1000.0, 60.0);
            let result = compute_hit(
                &source,
                &target,
                &HitSpec::atk(1.0, 10.0),
                DamageKind::Basic,
                &HitModifiers::default(),
                false,
            );
            assert!((result.total - 450.0).abs() < 0.0001);
            assert!((result.def - 0.5).abs() < 0.0001);
        }

        #[test]
        fn crit_applies_crit_dmg() {
            let source = attacker(1000.0);
            let target = defender(1000.0, 0.0);
            let result = compute_hit(
                &source,
                &target,
                &HitSpec::atk(1.0, 0.0),
                DamageKind::Skill,
                &HitModifiers::default(),
                true,
            );
            assert!((result.total - 750.0).abs() < 0.0001);
            assert!(result.is_crit);
        }

        #[test]
        fn resistance_is_clamped() {
            let source = attacker(1000.0);
            let mut target = defender(0.0, 0.0);
            target.stats.set(StatKey::PhysicalRes, 2.0);
            assert!((res_multiplier(&source, &target, Element::Physical) - 0.1).abs() < 0.0001);
            target.stats.set(StatKey::PhysicalRes, -3.0);
            assert!((res_multiplier(&source, &target, Element::Physical) - 2.0).abs() < 0.0001);
        }

        #[test]
        fn def_shred_is_floored() {
            let mut source = attacker(1000.0);
            source.stats.set(StatKey::DefIgnore, 0.8);
            let mut target = defender(1000.0, 0.0);
            target.stats.set(StatKey::DefReduction, 0.5);
            assert!((def_multiplier(&source, &target, 0.0) - 1.0).abs() < 0.0001);
        }

        #[test]
        fn fixed_crit_is_bit_identical() {
            let source = attacker(1234.5);
            let target = defender(777.0, 30.0);
            let run = || {
                compute_hit(
                    &source,
                    &target,
                    &HitSpec::atk(2.2, 0.0),
                    DamageKind::Ultimate,
                    &HitModifiers::default(),
                    true,
                )
                .total
            };
            assert_eq!(run().to_bits(), run().to_bits());
        }
    }

    mod crit_tests {
        use super::*;

        #[test]
        fn policies_force_outcome() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            assert!(roll_crit(&mut rng, 0.0, CritPolicy::Always));
            assert!(!roll_crit(&mut rng, 1.0, CritPolicy::Never));
            assert!(!roll_crit(&mut rng, 0.0, CritPolicy::Roll));
            assert!(roll_crit(&mut rng, 1.0, CritPolicy::Roll));
        }
    }

    mod toughness_tests {
        use super::*;

        #[test]
        fn only_weak_targets_lose_toughness() {
            let source = attacker(1000.0);
            let mut target = defender(0.0, 60.0);
            assert!(toughness_reduction(&source, &target, Element::Fire, 10.0, 0.0).abs() < 0.0001);
            target.weaknesses = Weaknesses::FIRE;
            assert!(
                (toughness_reduction(&source, &target, Element::Fire, 10.0, 0.5) - 15.0).abs()
                    < 0.0001
            );
        }

        #[test]
        fn level_multiplier_interpolates() {
            assert!((level_multiplier(80) - LEVEL_CONSTANT_80).abs() < 0.0001);
            assert!((level_multiplier(35) - 366.5).abs() < 0.0001);
            assert!((level_multiplier(1) - 54.0).abs() < 0.0001);
            assert!((level_multiplier(95) - LEVEL_CONSTANT_80).abs() < 0.0001);
        }

        #[test]
        fn break_damage_uses_element_and_toughness() {
            let mut source = attacker(1000.0);
            source.element = Element::Fire;
            let target = defender(0.0, 0.0);
            let mut broken = target.clone();
            broken.max_toughness = 60.0;
            let result = break_damage(&source, &broken);
            let expected = LEVEL_CONSTANT_80 * 2.0 * 2.0;
            assert!((result.total - expected).abs() < 0.001);
        }
    }

    mod absorb_tests {
        use super::*;

        #[test]
        fn shield_absorbs_first() {
            let result = absorb(500.0, 1000.0, 300.0);
            assert!((result.shield - 200.0).abs() < 0.0001);
            assert!((result.hp - 1000.0).abs() < 0.0001);
        }

        #[test]
        fn overflow_hits_hp_and_floors() {
            let result = absorb(100.0, 200.0, 1000.0);
            assert!(result.shield.abs() < 0.0001);
            assert!(result.hp.abs() < 0.0001);
            assert!((result.hp_loss - 200.0).abs() < 0.0001);
        }
    }

    mod heal_tests {
        use super::*;

        #[test]
        fn heal_and_shield_scale_with_boosts() {
            let mut source = attacker(1000.0);
            source.stats.set(StatKey::Hp, 2000.0);
            source.stats.set(StatKey::Def, 500.0);
            source.stats.set(StatKey::OutgoingHealingBoost, 0.2);
            source.stats.set(StatKey::ShieldStrengthBoost, 0.1);
            let target = defender(0.0, 0.0);
            let heal = heal_amount(
                &source,
                &target,
                &HealSpec {
                    scaling: StatKey::Hp,
                    multiplier: 0.1,
                    flat: 100.0,
                },
            );
            assert!((heal - 360.0).abs() < 0.0001);
            let shield = shield_amount(
                &source,
                &ShieldGrant {
                    scaling: StatKey::Def,
                    multiplier: 0.4,
                    flat: 0.0,
                    duration: 3,
                    cap: None,
                },
            );
            assert!((shield - 220.0).abs() < 0.0001);
        }
    }
}

//! Derived stat computation.
//!
//! Scaled stats (`Hp`, `Atk`, `Def`, `Spd`) resolve as
//! `base × (1 + Σ percent) + Σ flat`. Every other stat resolves as
//! `base + Σ flat + Σ percent`.

use std::collections::VecDeque;

use crate::entity::{Entity, EntityId};
use crate::registry::Registry;

use super::{DynamicValue, ModifierOp, ModifierValue, StatBlock, StatKey};

/// Evaluates a modifier value against the registry as it stands now.
fn evaluate(value: &ModifierValue, registry: &Registry) -> f64 {
    match value {
        ModifierValue::Static(v) => *v,
        ModifierValue::Dynamic(DynamicValue::StatOf {
            entity,
            stat,
            ratio,
            cap,
        }) => {
            let raw = registry
                .get(*entity)
                .map_or(0.0, |source| source.stats.get(*stat) * ratio);
            cap.map_or(raw, |cap| raw.min(cap))
        }
    }
}

/// Computes derived stats for `entity` from its base stats and active
/// effects.
///
/// Dynamic modifiers read the registry's current record of the entity they
/// reference, including `entity` itself.
#[must_use]
pub fn build_stats(entity: &Entity, registry: &Registry) -> StatBlock {
    let mut flat = StatBlock::new();
    let mut percent = StatBlock::new();

    for effect in &entity.effects {
        let scale = effect.modifier_scale();
        for modifier in &effect.modifiers {
            let value = evaluate(&modifier.value, registry) * scale;
            match modifier.op {
                ModifierOp::Flat => flat.add(modifier.stat, value),
                ModifierOp::Percent => percent.add(modifier.stat, value),
            }
        }
    }

    let mut keys: Vec<StatKey> = entity
        .base_stats
        .iter()
        .chain(flat.iter())
        .chain(percent.iter())
        .map(|(key, _)| key)
        .collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .map(|key| {
            let base = entity.base_stats.get(key);
            let value = if key.is_scaled() {
                base * (1.0 + percent.get(key)) + flat.get(key)
            } else {
                base + flat.get(key) + percent.get(key)
            };
            (key, value)
        })
        .collect()
}

/// Outcome of rebuilding a single entity.
struct Rebuilt {
    stats_changed: bool,
    speed_changed: bool,
}

fn rebuild_one(registry: &mut Registry, id: EntityId) -> Option<Rebuilt> {
    let entity = registry.get(id)?;
    let stats = build_stats(entity, registry);
    let stats_changed = stats != entity.stats;
    let old_speed = entity.speed();
    let new_speed = stats.get(StatKey::Spd);
    let speed_changed = (old_speed - new_speed).abs() > f64::EPSILON;

    registry.update(id, |entity| {
        entity.stats = stats;
        if speed_changed && old_speed > 0.0 && new_speed > 0.0 {
            entity.action_value *= old_speed / new_speed;
        }
        let max_hp = entity.max_hp();
        if entity.hp > max_hp {
            entity.hp = max_hp;
        }
        let max_energy = entity.max_energy();
        if entity.energy > max_energy {
            entity.energy = max_energy.max(0.0);
        }
    });
    Some(Rebuilt {
        stats_changed,
        speed_changed,
    })
}

/// Entities other than `source` holding a dynamic modifier that reads
/// `source`, in roster order.
fn dependents_of(registry: &Registry, source: EntityId) -> Vec<EntityId> {
    registry
        .iter()
        .filter(|holder| holder.id() != source)
        .filter(|holder| {
            holder
                .effects
                .iter()
                .flat_map(|effect| &effect.modifiers)
                .any(|modifier| {
                    matches!(
                        modifier.value,
                        ModifierValue::Dynamic(DynamicValue::StatOf { entity, .. }) if entity == source
                    )
                })
        })
        .map(Entity::id)
        .collect()
}

/// Rebuilds the queued entities and, transitively, every entity whose
/// dynamic modifiers read one whose stats changed.
///
/// Dependency cycles stop after `n²` rebuilds for `n` entities.
fn settle(registry: &mut Registry, mut pending: VecDeque<EntityId>) -> bool {
    let mut budget = registry.len().saturating_mul(registry.len()).max(1);
    let mut speed_changed = false;

    while let Some(next) = pending.pop_front() {
        if budget == 0 {
            tracing::warn!(entity = %next, "stat dependency chain did not settle");
            break;
        }
        budget -= 1;
        let Some(rebuilt) = rebuild_one(registry, next) else {
            continue;
        };
        speed_changed |= rebuilt.speed_changed;
        if rebuilt.stats_changed {
            for dependent in dependents_of(registry, next) {
                if !pending.contains(&dependent) {
                    pending.push_back(dependent);
                }
            }
        }
    }
    speed_changed
}

/// Rebuilds one entity's derived stats in place, then every entity whose
/// dynamic modifiers read a stat that changed along the way.
///
/// When speed changes, the remaining action value is rescaled by
/// `old / new` so the entity's progress towards its turn is preserved.
/// HP and energy are clamped to the new maxima.
///
/// Returns true if any rebuilt entity's speed changed; callers must resync
/// the action queue in that case.
pub fn rebuild(registry: &mut Registry, id: EntityId) -> bool {
    settle(registry, VecDeque::from([id]))
}

/// Rebuilds every entity in roster order, then re-runs the dependents of
/// any entity that changed so no one keeps a value read from a source that
/// was rebuilt after it.
///
/// Returns true if any entity's speed changed.
pub fn rebuild_all(registry: &mut Registry) -> bool {
    let ids: Vec<EntityId> = registry.ids().collect();
    let mut speed_changed = false;
    let mut pending = VecDeque::new();
    for id in ids {
        let Some(rebuilt) = rebuild_one(registry, id) else {
            continue;
        };
        speed_changed |= rebuilt.speed_changed;
        if rebuilt.stats_changed {
            for dependent in dependents_of(registry, id) {
                if !pending.contains(&dependent) {
                    pending.push_back(dependent);
                }
            }
        }
    }
    settle(registry, pending) || speed_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Effect, EffectKind};
    use crate::entity::{EntityKind, Side};
    use crate::stats::{DynamicValue, Modifier};

    fn hero(registry: &mut Registry, atk: f64, spd: f64) -> EntityId {
        registry.spawn(|id| {
            let mut entity = Entity::new(id, EntityKind::Character, Side::Ally, "Hero");
            entity.base_stats.set(StatKey::Hp, 1000.0);
            entity.base_stats.set(StatKey::Atk, atk);
            entity.base_stats.set(StatKey::Spd, spd);
            entity.base_stats.set(StatKey::CritRate, 0.05);
            entity.stats = entity.base_stats.clone();
            entity.hp = 1000.0;
            entity
        })
    }

    mod build_tests {
        use super::*;

        #[test]
        fn no_effects_yields_base() {
            let mut registry = Registry::new();
            let id = hero(&mut registry, 1000.0, 100.0);
            let stats = build_stats(registry.get(id).unwrap(), &registry);
            assert!((stats.get(StatKey::Atk) - 1000.0).abs() < 0.0001);
            assert!((stats.get(StatKey::CritRate) - 0.05).abs() < 0.0001);
        }

        #[test]
        fn scaled_and_additive_stats_combine_differently() {
            let mut registry = Registry::new();
            let id = hero(&mut registry, 1000.0, 100.0);
            registry.update(id, |e| {
                e.effects.push(
                    Effect::new("buff", "Buff", EffectKind::Buff)
                        .with_modifier(Modifier::percent(StatKey::Atk, 0.2))
                        .with_modifier(Modifier::flat(StatKey::Atk, 50.0))
                        .with_modifier(Modifier::percent(StatKey::CritRate, 0.1)),
                );
            });
            let stats = build_stats(registry.get(id).unwrap(), &registry);
            assert!((stats.get(StatKey::Atk) - 1250.0).abs() < 0.0001);
            assert!((stats.get(StatKey::CritRate) - 0.15).abs() < 0.0001);
        }

        #[test]
        fn stacks_multiply_modifiers() {
            let mut registry = Registry::new();
            let id = hero(&mut registry, 1000.0, 100.0);
            registry.update(id, |e| {
                e.effects.push(
                    Effect::new("stack", "Stacking", EffectKind::Buff)
                        .with_stacks(3, 5)
                        .with_modifier(Modifier::percent(StatKey::Atk, 0.1)),
                );
            });
            let stats = build_stats(registry.get(id).unwrap(), &registry);
            assert!((stats.get(StatKey::Atk) - 1300.0).abs() < 0.0001);
        }

        #[test]
        fn dynamic_modifier_reads_live_source() {
            let mut registry = Registry::new();
            let giver = hero(&mut registry, 2000.0, 100.0);
            let taker = hero(&mut registry, 1000.0, 100.0);
            registry.update(taker, |e| {
                e.effects.push(Effect::new("share", "Share", EffectKind::Buff).with_modifier(
                    Modifier::dynamic(
                        StatKey::Atk,
                        ModifierOp::Flat,
                        DynamicValue::StatOf {
                            entity: giver,
                            stat: StatKey::Atk,
                            ratio: 0.1,
                            cap: None,
                        },
                    ),
                ));
            });
            rebuild(&mut registry, taker);
            assert!((registry.get(taker).unwrap().stats.get(StatKey::Atk) - 1200.0).abs() < 0.0001);

            registry.update(giver, |e| e.stats.set(StatKey::Atk, 3000.0));
            rebuild(&mut registry, taker);
            assert!((registry.get(taker).unwrap().stats.get(StatKey::Atk) - 1300.0).abs() < 0.0001);
        }

        #[test]
        fn dynamic_modifier_respects_cap() {
            let mut registry = Registry::new();
            let giver = hero(&mut registry, 5000.0, 100.0);
            let taker = hero(&mut registry, 1000.0, 100.0);
            registry.update(taker, |e| {
                e.effects.push(Effect::new("share", "Share", EffectKind::Buff).with_modifier(
                    Modifier::dynamic(
                        StatKey::Atk,
                        ModifierOp::Flat,
                        DynamicValue::StatOf {
                            entity: giver,
                            stat: StatKey::Atk,
                            ratio: 0.5,
                            cap: Some(400.0),
                        },
                    ),
                ));
            });
            rebuild(&mut registry, taker);
            assert!((registry.get(taker).unwrap().stats.get(StatKey::Atk) - 1400.0).abs() < 0.0001);
        }
    }

    mod rebuild_tests {
        use super::*;

        #[test]
        fn speed_change_rescales_action_value() {
            let mut registry = Registry::new();
            let id = hero(&mut registry, 1000.0, 100.0);
            registry.update(id, |e| {
                e.action_value = 50.0;
                e.effects.push(
                    Effect::new("haste", "Haste", EffectKind::Buff)
                        .with_modifier(Modifier::percent(StatKey::Spd, 0.25)),
                );
            });
            assert!(rebuild(&mut registry, id));
            let entity = registry.get(id).unwrap();
            assert!((entity.speed() - 125.0).abs() < 0.0001);
            assert!((entity.action_value - 40.0).abs() < 0.0001);
        }

        #[test]
        fn hp_is_clamped_to_new_max() {
            let mut registry = Registry::new();
            let id = hero(&mut registry, 1000.0, 100.0);
            registry.update(id, |e| {
                e.base_stats.set(StatKey::Hp, 500.0);
            });
            assert!(!rebuild(&mut registry, id));
            assert!((registry.get(id).unwrap().hp - 500.0).abs() < 0.0001);
        }

        fn share_atk(registry: &mut Registry, taker: EntityId, giver: EntityId) {
            registry.update(taker, |e| {
                e.effects.push(Effect::new("share", "Share", EffectKind::Buff).with_modifier(
                    Modifier::dynamic(
                        StatKey::Atk,
                        ModifierOp::Flat,
                        DynamicValue::StatOf {
                            entity: giver,
                            stat: StatKey::Atk,
                            ratio: 0.1,
                            cap: None,
                        },
                    ),
                ));
            });
        }

        fn buff_atk(registry: &mut Registry, id: EntityId) {
            registry.update(id, |e| {
                e.effects.push(
                    Effect::new("rally", "Rally", EffectKind::Buff)
                        .with_modifier(Modifier::percent(StatKey::Atk, 1.0)),
                );
            });
        }

        #[test]
        fn rebuild_reaches_dependents() {
            let mut registry = Registry::new();
            let taker = hero(&mut registry, 1000.0, 100.0);
            let giver = hero(&mut registry, 1000.0, 100.0);
            share_atk(&mut registry, taker, giver);
            rebuild(&mut registry, taker);
            assert!((registry.get(taker).unwrap().stats.get(StatKey::Atk) - 1100.0).abs() < 0.0001);

            buff_atk(&mut registry, giver);
            rebuild(&mut registry, giver);
            assert!((registry.get(giver).unwrap().stats.get(StatKey::Atk) - 2000.0).abs() < 0.0001);
            assert!((registry.get(taker).unwrap().stats.get(StatKey::Atk) - 1200.0).abs() < 0.0001);
        }

        #[test]
        fn rebuild_all_settles_dependents_earlier_in_roster() {
            let mut registry = Registry::new();
            let taker = hero(&mut registry, 1000.0, 100.0);
            let giver = hero(&mut registry, 1000.0, 100.0);
            share_atk(&mut registry, taker, giver);
            buff_atk(&mut registry, giver);
            rebuild_all(&mut registry);
            assert!((registry.get(taker).unwrap().stats.get(StatKey::Atk) - 1200.0).abs() < 0.0001);
        }

        #[test]
        fn dependency_cycle_terminates() {
            let mut registry = Registry::new();
            let a = hero(&mut registry, 1000.0, 100.0);
            let b = hero(&mut registry, 1000.0, 100.0);
            share_atk(&mut registry, a, b);
            share_atk(&mut registry, b, a);
            rebuild(&mut registry, a);
            assert!(registry.get(a).unwrap().stats.get(StatKey::Atk) > 1000.0);
            assert!(registry.get(b).unwrap().stats.get(StatKey::Atk) > 1000.0);
        }

        #[test]
        fn rebuild_all_touches_every_entity() {
            let mut registry = Registry::new();
            let a = hero(&mut registry, 1000.0, 100.0);
            let b = hero(&mut registry, 1000.0, 100.0);
            for id in [a, b] {
                registry.update(id, |e| e.base_stats.set(StatKey::Atk, 10.0));
            }
            rebuild_all(&mut registry);
            assert!((registry.get(a).unwrap().stats.get(StatKey::Atk) - 10.0).abs() < 0.0001);
            assert!((registry.get(b).unwrap().stats.get(StatKey::Atk) - 10.0).abs() < 0.0001);
        }
    }
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rotasim_core::kits::standard_catalog;
use rotasim_core::{Action, Simulation, SimulationConfig};

// Four kitted characters against two sturdy enemies, long enough to exercise
// follow-ups, extra actions and summons.
const PARTY: &str = r#"{
    "characters": [
        { "name": "Seele", "element": "quantum", "kit": "resurgence",
          "stats": { "hp": 4000, "atk": 2500, "spd": 115 },
          "abilities": { "skill": { "name": "Sheathed Blade", "hits": [{ "multiplier": 2.2, "toughness": 20 }], "energy_gain": 30, "sp_cost": 1 } },
          "rotation": { "sequence": "sbb" } },
        { "name": "Bronya", "element": "wind", "kit": "benediction",
          "stats": { "hp": 4500, "atk": 1800, "spd": 100 } },
        { "name": "March", "element": "ice", "kit": "counter",
          "stats": { "hp": 3500, "atk": 1500, "def": 900, "spd": 101 } },
        { "name": "Topaz", "element": "fire", "kit": "spirit",
          "stats": { "hp": 3800, "atk": 2200, "spd": 110 } }
    ],
    "enemies": [
        { "name": "Slime A", "hp": 200000, "speed": 90, "toughness": 90 },
        { "name": "Slime B", "hp": 200000, "speed": 85, "toughness": 90 }
    ],
    "weaknesses": ["quantum", "ice", "fire"],
    "rounds": 10,
    "seed": 42
}"#;

fn party_config() -> SimulationConfig {
    serde_json::from_str(PARTY).expect("benchmark config should parse")
}

fn bench_full_battle(c: &mut Criterion) {
    let config = party_config();

    c.bench_function("full_battle", |b| {
        b.iter(|| {
            let simulation = Simulation::new(black_box(&config), standard_catalog()).unwrap();
            black_box(simulation.run().unwrap())
        })
    });
}

fn bench_single_step(c: &mut Criterion) {
    let config = party_config();
    let simulation = Simulation::new(&config, standard_catalog()).unwrap();
    let kernel = simulation.kernel();
    let state = kernel
        .dispatch(simulation.state(), &Action::BattleStart)
        .unwrap();

    c.bench_function("single_step", |b| {
        b.iter(|| black_box(kernel.step(black_box(&state)).unwrap()))
    });
}

criterion_group!(benches, bench_full_battle, bench_single_step);
criterion_main!(benches);

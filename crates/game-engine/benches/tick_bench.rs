use criterion::{black_box, criterion_group, criterion_main, Criterion};
use game_core::catalog::{self, ids, Catalog};
use game_core::{BuildingId, ResourceId, UpgradeId};
use game_engine::{step, Intent};

fn developed_state() -> (Catalog, game_core::GameState) {
    let cat = Catalog::standard();
    let mut state = catalog::new_game();
    state
        .resources
        .get_mut(&ResourceId(ids::USD.into()))
        .unwrap()
        .value = 1e9;
    let _ = game_engine::unlocks::run(&cat, &mut state);
    for (id, count) in [("generator", 20), ("homeComputer", 10)] {
        state
            .buildings
            .get_mut(&BuildingId(id.into()))
            .unwrap()
            .count = count;
    }
    for id in ["overclocking", "undervolting", "miningSoftware"] {
        state
            .upgrades
            .get_mut(&UpgradeId(id.into()))
            .unwrap()
            .purchased = true;
    }
    let _ = step(&cat, &mut state, Intent::Tick { delta_seconds: 1.0 });
    (cat, state)
}

fn bench_tick(c: &mut Criterion) {
    let (cat, state) = developed_state();
    c.bench_function("tick_1s", |b| {
        b.iter(|| {
            let mut s = state.clone();
            let _ = black_box(step(&cat, &mut s, Intent::Tick { delta_seconds: 1.0 }));
        })
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);

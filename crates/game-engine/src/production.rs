//! Production aggregation: recomputes every resource's production,
//! consumption, capacity, and net rate from scratch.

use crate::effects::{self, EffectSet};
use game_core::catalog::ids;
use game_core::{GameState, ResourceId};
use std::collections::BTreeMap;

/// Aggregate consumption cuts are capped here so stacked reductions can
/// never drive consumption negative.
pub const CONSUMPTION_CUT_CAP: f64 = 0.9;

/// Recompute all derived rate fields on `state`.
///
/// Deterministic and idempotent: given the same ownership flags and stocks,
/// two consecutive calls produce identical results. The derived `features`
/// cache is refreshed as part of the pass.
pub fn recompute(state: &mut GameState) -> EffectSet {
    let set = effects::collect(state);
    state.features = set.features.clone();

    let mut production: BTreeMap<ResourceId, f64> = BTreeMap::new();
    let mut consumption: BTreeMap<ResourceId, f64> = BTreeMap::new();
    for b in state.buildings.values().filter(|b| b.count > 0) {
        let count = b.count as f64;
        for (rid, rate) in &b.production {
            *production.entry(rid.clone()).or_insert(0.0) += rate * count;
        }
        for (rid, rate) in &b.consumption {
            *consumption.entry(rid.clone()).or_insert(0.0) += rate * count;
        }
    }

    // Mined coin: output is a function of the computing-power stock, not
    // of building counts, so boosted hashrate feeds straight into it.
    let computing = state
        .resources
        .get(&ResourceId(ids::COMPUTING.into()))
        .filter(|r| r.unlocked)
        .map(|r| r.value)
        .unwrap_or(0.0);
    let coin_rate = game_econ::mining_rate(computing, &state.mining, set.mining_boost);
    if coin_rate > 0.0 {
        *production.entry(ResourceId(ids::COIN.into())).or_insert(0.0) += coin_rate;
    }

    let electricity = ResourceId(ids::ELECTRICITY.into());
    for r in state.resources.values_mut() {
        let gross = r.base_production + production.get(&r.id).copied().unwrap_or(0.0);
        let boosted = gross * (1.0 + set.production_boost_for(&r.id));

        let mut upkeep = consumption.get(&r.id).copied().unwrap_or(0.0);
        if r.id == electricity {
            upkeep *= state.mining.energy_efficiency;
        }
        let cut = set.consumption_cut_for(&r.id).min(CONSUMPTION_CUT_CAP);
        let reduced = upkeep * (1.0 - cut);

        r.production = boosted;
        r.consumption = reduced;
        r.per_second = boosted - reduced;
        r.max = r
            .base_max
            .map(|m| m * (1.0 + set.capacity_boost_for(&r.id)));
    }
    set
}

//! Effect aggregation: folds every granted bonus into one additive set
//! consumed by the production recompute.
//!
//! Contributors: owned buildings (per unit), purchased upgrades, active
//! synergies, and the selected specialization. The fold is re-derived from
//! flags on every pass, so applying it is idempotent by construction.

use game_core::{Effect, GameState, ResourceId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Summed effect magnitudes, keyed by the resource they touch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectSet {
    /// Resource -> summed production-boost fraction.
    pub production_boost: BTreeMap<ResourceId, f64>,
    /// Resource -> summed capacity-boost fraction.
    pub capacity_boost: BTreeMap<ResourceId, f64>,
    /// Resource -> summed consumption cut (capped at 90% when applied).
    pub consumption_cut: BTreeMap<ResourceId, f64>,
    /// Summed knowledge-apply yield fraction.
    pub knowledge_yield: f64,
    /// Summed mined-coin output fraction.
    pub mining_boost: f64,
    /// Summed commission cut, clamped to [0, 1] at use.
    pub commission_cut: f64,
    /// Features granted by `UnlockFeature` effects.
    pub features: BTreeSet<String>,
}

impl EffectSet {
    pub fn production_boost_for(&self, id: &ResourceId) -> f64 {
        self.production_boost.get(id).copied().unwrap_or(0.0)
    }

    pub fn capacity_boost_for(&self, id: &ResourceId) -> f64 {
        self.capacity_boost.get(id).copied().unwrap_or(0.0)
    }

    pub fn consumption_cut_for(&self, id: &ResourceId) -> f64 {
        self.consumption_cut.get(id).copied().unwrap_or(0.0)
    }
}

fn fold(
    set: &mut EffectSet,
    resources: &BTreeMap<ResourceId, game_core::Resource>,
    owner: &str,
    effect: &Effect,
    weight: f64,
) {
    // A dangling resource reference is catalog corruption: skip the one
    // effect, keep the recompute going.
    let known = |id: &ResourceId| -> bool {
        if resources.contains_key(id) {
            true
        } else {
            warn!(owner, resource = %id.0, "skipping effect referencing unknown resource");
            false
        }
    };
    match effect {
        Effect::ProductionBoost { resource, fraction } => {
            if known(resource) {
                *set.production_boost.entry(resource.clone()).or_insert(0.0) += fraction * weight;
            }
        }
        Effect::MaxCapacityBoost { resource, fraction } => {
            if known(resource) {
                *set.capacity_boost.entry(resource.clone()).or_insert(0.0) += fraction * weight;
            }
        }
        Effect::ConsumptionReduction { resource, fraction } => {
            if known(resource) {
                *set.consumption_cut.entry(resource.clone()).or_insert(0.0) += fraction * weight;
            }
        }
        Effect::KnowledgeYieldBoost { fraction } => set.knowledge_yield += fraction * weight,
        Effect::MiningBoost { fraction } => set.mining_boost += fraction * weight,
        Effect::CommissionReduction { fraction } => set.commission_cut += fraction * weight,
        Effect::UnlockFeature { feature } => {
            set.features.insert(feature.clone());
        }
    }
}

/// Derive the full effect set from current flags: purchased upgrades,
/// active synergies, the selected specialization, and owned buildings
/// (whose passive effects scale with count).
pub fn collect(state: &GameState) -> EffectSet {
    let mut set = EffectSet::default();
    for b in state.buildings.values().filter(|b| b.count > 0) {
        for e in &b.effects {
            fold(&mut set, &state.resources, &b.id.0, e, b.count as f64);
        }
    }
    for u in state.upgrades.values().filter(|u| u.purchased) {
        for e in &u.effects {
            fold(&mut set, &state.resources, &u.id.0, e, 1.0);
        }
    }
    for s in state.synergies.values().filter(|s| s.active) {
        for e in &s.bonus {
            fold(&mut set, &state.resources, &s.id.0, e, 1.0);
        }
    }
    if let Some(id) = &state.specialization {
        if let Some(sp) = state.specializations.get(id) {
            for e in &sp.effects {
                fold(&mut set, &state.resources, &sp.id.0, e, 1.0);
            }
        } else {
            warn!(specialization = %id.0, "selected specialization missing from catalog");
        }
    }
    set
}

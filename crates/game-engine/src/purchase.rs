//! Purchase/transaction processor: validate-then-commit transitions for
//! buildings, upgrades, and specializations, plus sell-back and the full
//! prestige reset.
//!
//! Every attempt either fully applies or is rejected before any debit; no
//! intermediate state escapes.

use crate::error::ActionError;
use crate::event::GameEvent;
use crate::{production, synergy, unlocks};
use game_core::catalog::{self, counters, Catalog};
use game_core::{BuildingId, GameState, ResourceId, SpecializationId, UpgradeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Polymorphic purchase target, dispatched by pattern match below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PurchaseTarget {
    Building(BuildingId),
    Upgrade(UpgradeId),
    Specialization(SpecializationId),
}

/// Fraction of the current cost returned when selling a building.
pub const SELL_REFUND: f64 = 0.5;

fn debit(state: &mut GameState, cost: &BTreeMap<ResourceId, f64>) {
    for (rid, amount) in cost {
        if let Some(r) = state.resources.get_mut(rid) {
            game_econ::decrement(r, *amount);
        }
    }
}

/// Buy `quantity` units of a building. The cost covers each unit at its
/// own scaled price; the stored `cost` map is re-priced afterwards.
pub fn purchase_building(
    catalog: &Catalog,
    state: &mut GameState,
    id: &BuildingId,
    quantity: u64,
) -> Result<Vec<GameEvent>, ActionError> {
    let quantity = quantity.max(1);
    let b = state
        .buildings
        .get(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    if !b.unlocked {
        return Err(ActionError::NotUnlocked { id: id.0.clone() });
    }
    let cost = game_econ::bulk_cost(&b.base_cost, b.cost_multiplier, b.count, quantity);
    if !game_econ::can_afford(&state.resources, &cost) {
        return Err(ActionError::InsufficientResources {
            id: id.0.clone(),
            missing: game_econ::missing_resources(&state.resources, &cost),
        });
    }

    debit(state, &cost);
    let b = state
        .buildings
        .get_mut(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    b.count += quantity;
    b.cost = game_econ::scaled_cost(&b.base_cost, b.cost_multiplier, b.count);
    let name = b.name.clone();
    state.bump_counter(counters::BUILDINGS_BOUGHT, quantity as f64);

    production::recompute(state);
    let mut events = vec![GameEvent::success(format!("Bought {quantity}x {name}"))];
    events.extend(unlocks::run(catalog, state));
    Ok(events)
}

/// Buy a one-shot upgrade and apply its effects. Synergy detection runs
/// immediately afterwards, since synergy unlocks derive from upgrade state.
pub fn purchase_upgrade(
    catalog: &Catalog,
    state: &mut GameState,
    id: &UpgradeId,
) -> Result<Vec<GameEvent>, ActionError> {
    let u = state
        .upgrades
        .get(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    if !u.unlocked {
        return Err(ActionError::NotUnlocked { id: id.0.clone() });
    }
    if u.purchased {
        return Err(ActionError::AlreadyPurchased { id: id.0.clone() });
    }
    let cost = u.cost.clone();
    if !game_econ::can_afford(&state.resources, &cost) {
        return Err(ActionError::InsufficientResources {
            id: id.0.clone(),
            missing: game_econ::missing_resources(&state.resources, &cost),
        });
    }

    debit(state, &cost);
    let u = state
        .upgrades
        .get_mut(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    u.purchased = true;
    let name = u.name.clone();
    state.bump_counter(counters::UPGRADES_BOUGHT, 1.0);

    production::recompute(state);
    let mut events = vec![GameEvent::success(format!("Researched {name}"))];
    events.extend(synergy::check(state));
    events.extend(unlocks::run(catalog, state));
    Ok(events)
}

/// Select (or switch) the single active specialization.
pub fn select_specialization(
    state: &mut GameState,
    id: &SpecializationId,
) -> Result<Vec<GameEvent>, ActionError> {
    let sp = state
        .specializations
        .get(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    if !sp.unlocked {
        return Err(ActionError::NotUnlocked { id: id.0.clone() });
    }
    if state.specialization.as_ref() == Some(id) {
        return Ok(Vec::new());
    }
    let name = sp.name.clone();
    state.specialization = Some(id.clone());
    production::recompute(state);
    Ok(vec![GameEvent::success(format!("Specialized as {name}"))])
}

/// Sell one unit back for half its current price, floored per resource.
/// One-shot upgrade effects are independent purchases and are not revoked.
pub fn sell_building(
    state: &mut GameState,
    id: &BuildingId,
) -> Result<Vec<GameEvent>, ActionError> {
    let b = state
        .buildings
        .get(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    if b.count == 0 {
        return Err(ActionError::NothingToSell { id: id.0.clone() });
    }
    let refund: BTreeMap<ResourceId, f64> = b
        .cost
        .iter()
        .map(|(rid, amount)| (rid.clone(), (amount * SELL_REFUND).floor()))
        .collect();

    for (rid, amount) in &refund {
        if let Some(r) = state.resources.get_mut(rid) {
            game_econ::increment(r, *amount);
        }
    }
    let b = state
        .buildings
        .get_mut(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    b.count -= 1;
    b.cost = game_econ::scaled_cost(&b.base_cost, b.cost_multiplier, b.count);
    let name = b.name.clone();

    production::recompute(state);
    Ok(vec![GameEvent::info(format!("Sold 1x {name}"))])
}

/// Full reset. Prestige points earned this run are banked on top of any
/// previously carried; everything else returns to catalog defaults.
pub fn prestige(catalog: &Catalog, state: &mut GameState) -> Vec<GameEvent> {
    let earned = prestige_earned(state);
    let carried = state.prestige_points + earned;
    info!(earned, carried, "prestige reset");

    let mut fresh = catalog::new_game();
    fresh.prestige_points = carried;
    production::recompute(&mut fresh);
    let _ = unlocks::run(catalog, &mut fresh);
    *state = fresh;

    vec![GameEvent::achievement(format!(
        "Reset complete: +{earned} prestige"
    ))]
}

/// Prestige yield for the current run, from lifetime usd earned.
pub fn prestige_earned(state: &GameState) -> f64 {
    (state.counter(counters::LIFETIME_USD) / 1000.0).sqrt().floor()
}

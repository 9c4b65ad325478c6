//! Inbound player intents and the tick pipeline.
//!
//! `step` is the single entry point the hosting layer dispatches through.
//! Each intent runs synchronously to completion; a rejection leaves the
//! state exactly as it was.

use crate::error::ActionError;
use crate::event::GameEvent;
use crate::purchase::{self, PurchaseTarget};
use crate::{effects, production, synergy, unlocks};
use chrono::{DateTime, Utc};
use game_core::catalog::{counters, features, ids, Catalog, KNOWLEDGE_APPLY_COST};
use game_core::{GameState, ResourceId, SynergyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Offline gains are replayed for at most this much elapsed time.
pub const OFFLINE_CAP_SECS: f64 = 12.0 * 3600.0;
/// Offline production runs at reduced efficiency.
pub const OFFLINE_EFFICIENCY: f64 = 0.6;

/// Everything a player (or a script driving the engine) can ask for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// Manual gain, e.g. a learn click on `knowledge`.
    IncrementResource { resource: ResourceId, amount: f64 },
    Purchase { target: PurchaseTarget, quantity: u64 },
    Sell { building: game_core::BuildingId },
    ActivateSynergy { synergy: SynergyId },
    /// Convert 10 knowledge into usd, once.
    ApplyKnowledge,
    /// Convert every full 10-knowledge block at once.
    ApplyAllKnowledge,
    /// Sell coin for usd at the current rate; `None` sells the whole stock.
    ExchangeCoin { amount: Option<f64> },
    Tick { delta_seconds: f64 },
    Reset,
}

/// Dispatch one intent against the state.
pub fn step(
    catalog: &Catalog,
    state: &mut GameState,
    intent: Intent,
) -> Result<Vec<GameEvent>, ActionError> {
    match intent {
        Intent::IncrementResource { resource, amount } => {
            increment_resource(catalog, state, &resource, amount)
        }
        Intent::Purchase { target, quantity } => match target {
            PurchaseTarget::Building(id) => {
                purchase::purchase_building(catalog, state, &id, quantity)
            }
            PurchaseTarget::Upgrade(id) => purchase::purchase_upgrade(catalog, state, &id),
            PurchaseTarget::Specialization(id) => purchase::select_specialization(state, &id),
        },
        Intent::Sell { building } => purchase::sell_building(state, &building),
        Intent::ActivateSynergy { synergy } => synergy::activate(state, &synergy),
        Intent::ApplyKnowledge => apply_knowledge(catalog, state, false),
        Intent::ApplyAllKnowledge => apply_knowledge(catalog, state, true),
        Intent::ExchangeCoin { amount } => exchange_coin(catalog, state, amount),
        Intent::Tick { delta_seconds } => Ok(tick(catalog, state, delta_seconds)),
        Intent::Reset => Ok(purchase::prestige(catalog, state)),
    }
}

fn increment_resource(
    catalog: &Catalog,
    state: &mut GameState,
    id: &ResourceId,
    amount: f64,
) -> Result<Vec<GameEvent>, ActionError> {
    let r = state
        .resources
        .get_mut(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    if !r.unlocked {
        return Err(ActionError::NotUnlocked { id: id.0.clone() });
    }
    game_econ::increment(r, amount);
    if id.0 == ids::KNOWLEDGE {
        state.bump_counter(counters::LEARN_CLICKS, 1.0);
    }
    Ok(unlocks::run(catalog, state))
}

/// Credit usd and keep the lifetime earnings counter in step. Every usd
/// credit funnels through here so the prestige metric cannot drift.
fn credit_usd(state: &mut GameState, amount: f64) {
    if let Some(usd) = state.resources.get_mut(&ResourceId(ids::USD.into())) {
        game_econ::increment(usd, amount);
    }
    state.bump_counter(counters::LIFETIME_USD, amount);
}

fn apply_knowledge(
    catalog: &Catalog,
    state: &mut GameState,
    all: bool,
) -> Result<Vec<GameEvent>, ActionError> {
    let knowledge_id = ResourceId(ids::KNOWLEDGE.into());
    let available = state
        .resources
        .get(&knowledge_id)
        .filter(|r| r.unlocked)
        .map(|r| r.value)
        .ok_or_else(|| ActionError::NotUnlocked {
            id: ids::KNOWLEDGE.into(),
        })?;

    let conversions = if all {
        (available / KNOWLEDGE_APPLY_COST).floor() as u64
    } else {
        u64::from(available >= KNOWLEDGE_APPLY_COST)
    };
    if conversions == 0 {
        let mut missing = BTreeMap::new();
        missing.insert(knowledge_id, KNOWLEDGE_APPLY_COST - available);
        return Err(ActionError::InsufficientResources {
            id: ids::KNOWLEDGE.into(),
            missing,
        });
    }

    let yield_boost = effects::collect(state).knowledge_yield;
    let proceeds = game_econ::knowledge_apply_yield(conversions, yield_boost);
    if let Some(k) = state.resources.get_mut(&knowledge_id) {
        game_econ::decrement(k, conversions as f64 * KNOWLEDGE_APPLY_COST);
    }
    credit_usd(state, proceeds);
    state.bump_counter(counters::KNOWLEDGE_APPLIED, conversions as f64);

    let mut events = vec![GameEvent::success(format!(
        "Applied knowledge: +${proceeds:.2}"
    ))];
    events.extend(unlocks::run(catalog, state));
    Ok(events)
}

fn exchange_coin(
    catalog: &Catalog,
    state: &mut GameState,
    amount: Option<f64>,
) -> Result<Vec<GameEvent>, ActionError> {
    if !state.features.contains(features::COIN_EXCHANGE) {
        return Err(ActionError::NotUnlocked {
            id: features::COIN_EXCHANGE.into(),
        });
    }
    let coin_id = ResourceId(ids::COIN.into());
    let held = state
        .resources
        .get(&coin_id)
        .filter(|r| r.unlocked)
        .map(|r| r.value)
        .ok_or_else(|| ActionError::NotUnlocked {
            id: ids::COIN.into(),
        })?;
    let requested = amount.unwrap_or(held);
    if requested <= 0.0 || held < requested {
        let mut missing = BTreeMap::new();
        missing.insert(coin_id.clone(), (requested - held).max(0.0));
        return Err(ActionError::InsufficientResources {
            id: ids::COIN.into(),
            missing,
        });
    }

    // Market parameters were validated at load; a failure here is data
    // corruption, handled by falling back to the flat base rate.
    let rate = game_econ::exchange_rate(&state.mining, state.game_time).unwrap_or_else(|e| {
        warn!(error = %e, "exchange rate unavailable, using base rate");
        state.mining.base_rate
    });
    let commission_cut = effects::collect(state).commission_cut;
    let proceeds = game_econ::exchange_proceeds(requested, rate, &state.mining, commission_cut)
        .unwrap_or_else(|e| {
            warn!(error = %e, "commission unavailable, selling uncommissioned");
            requested * rate
        });

    if let Some(c) = state.resources.get_mut(&coin_id) {
        game_econ::decrement(c, requested);
    }
    credit_usd(state, proceeds);
    state.bump_counter(counters::COINS_EXCHANGED, 1.0);

    let mut events = vec![GameEvent::success(format!(
        "Exchanged {requested:.4} coin for ${proceeds:.2}"
    ))];
    events.extend(unlocks::run(catalog, state));
    Ok(events)
}

/// One simulation step: advance time, re-aggregate production, integrate
/// every unlocked resource, then re-check unlocks and synergies.
pub fn tick(catalog: &Catalog, state: &mut GameState, delta_seconds: f64) -> Vec<GameEvent> {
    let dt = delta_seconds.max(0.0);
    state.game_time += dt;
    production::recompute(state);
    for r in state.resources.values_mut() {
        game_econ::advance(r, dt, false);
    }
    let mut events = unlocks::run(catalog, state);
    events.extend(synergy::check(state));
    state.last_update = Utc::now();
    events
}

/// Replay wall-clock time spent away as a single capped, reduced-rate tick
/// with upkeep waived. Runs before the loaded state is handed to the
/// player.
pub fn apply_offline(
    catalog: &Catalog,
    state: &mut GameState,
    now: DateTime<Utc>,
) -> Vec<GameEvent> {
    let elapsed = (now - state.last_update).num_seconds().max(0) as f64;
    let dt = elapsed.min(OFFLINE_CAP_SECS) * OFFLINE_EFFICIENCY;
    state.last_update = now;
    if dt < 1.0 {
        return Vec::new();
    }
    info!(elapsed, credited = dt, "applying offline accumulation");
    state.game_time += dt;
    production::recompute(state);
    for r in state.resources.values_mut() {
        game_econ::advance(r, dt, true);
    }
    let mut events = unlocks::run(catalog, state);
    events.extend(synergy::check(state));
    events.push(GameEvent::info(format!(
        "While you were away: {:.0} minutes of production credited",
        dt / 60.0
    )));
    events
}

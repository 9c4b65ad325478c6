//! Unlock engine: declarative predicate evaluation over the rule table.
//!
//! Safe to re-run on every tick and after every mutating action: flags only
//! ever flip false -> true, so repeated passes beyond the first satisfying
//! transition are no-ops.

use crate::event::GameEvent;
use game_core::catalog::{ids, Catalog};
use game_core::{Condition, GameState, ResourceId, UnlockRule, UnlockTarget, UpgradeId};
use tracing::{debug, warn};

fn condition_met(cond: &Condition, state: &GameState) -> bool {
    match cond {
        Condition::ResourceAtLeast { resource, amount } => state
            .resources
            .get(resource)
            .is_some_and(|r| r.value >= *amount),
        Condition::BuildingCountAtLeast { building, count } => state
            .buildings
            .get(building)
            .is_some_and(|b| b.count >= *count),
        Condition::UpgradePurchased { upgrade } => state
            .upgrades
            .get(upgrade)
            .is_some_and(|u| u.purchased),
        Condition::CounterAtLeast { counter, value } => state.counter(counter) >= *value,
        Condition::AllOf { conditions } => conditions.iter().all(|c| condition_met(c, state)),
    }
}

/// `Some(flag)` when the target exists, `None` otherwise.
fn target_unlocked(state: &GameState, target: &UnlockTarget) -> Option<bool> {
    match target {
        UnlockTarget::Resource(id) => state.resources.get(id).map(|r| r.unlocked),
        UnlockTarget::Building(id) => state.buildings.get(id).map(|b| b.unlocked),
        UnlockTarget::Upgrade(id) => state.upgrades.get(id).map(|u| u.unlocked),
        UnlockTarget::Specialization(id) => state.specializations.get(id).map(|s| s.unlocked),
    }
}

/// Flips the flag and returns the display name for the notification.
fn set_unlocked(state: &mut GameState, target: &UnlockTarget) -> Option<String> {
    match target {
        UnlockTarget::Resource(id) => state.resources.get_mut(id).map(|r| {
            r.unlocked = true;
            r.name.clone()
        }),
        UnlockTarget::Building(id) => state.buildings.get_mut(id).map(|b| {
            b.unlocked = true;
            b.name.clone()
        }),
        UnlockTarget::Upgrade(id) => state.upgrades.get_mut(id).map(|u| {
            u.unlocked = true;
            u.name.clone()
        }),
        UnlockTarget::Specialization(id) => state.specializations.get_mut(id).map(|s| {
            s.unlocked = true;
            s.name.clone()
        }),
    }
}

fn rule_id(rule: &UnlockRule) -> &str {
    match &rule.target {
        UnlockTarget::Resource(id) => &id.0,
        UnlockTarget::Building(id) => &id.0,
        UnlockTarget::Upgrade(id) => &id.0,
        UnlockTarget::Specialization(id) => &id.0,
    }
}

/// Evaluate the rule table and flip newly satisfied targets. Returns one
/// achievement event per fresh unlock. Flags never revert.
pub fn run(catalog: &Catalog, state: &mut GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for rule in &catalog.rules {
        let already = match target_unlocked(state, &rule.target) {
            Some(flag) => flag,
            None => {
                warn!(rule = rule_id(rule), "unlock rule targets unknown entity");
                continue;
            }
        };
        if already || !condition_met(&rule.condition, state) {
            continue;
        }
        if let Some(name) = set_unlocked(state, &rule.target) {
            debug!(rule = rule_id(rule), "unlock condition satisfied");
            events.push(GameEvent::achievement(format!("{name} unlocked")));
        }
    }
    events.extend(advance_phase(state));
    events
}

/// Forced rebuild for recovering persisted saves: re-runs every rule from
/// scratch, repairs the `active => unlocked` synergy invariant, and
/// re-derives the phase. Keeps any flag a previous session already earned
/// (unlocks are monotonic) and emits no notifications.
pub fn rebuild(catalog: &Catalog, state: &mut GameState) {
    let _ = run(catalog, state);
    let _ = crate::synergy::check(state);
    for s in state.synergies.values_mut() {
        if s.active && !s.unlocked {
            warn!(synergy = %s.id.0, "deactivating synergy that is no longer unlocked");
            s.active = false;
        }
    }
    let _ = advance_phase(state);
}

/// Progression stage derived from unlock milestones.
fn derived_phase(state: &GameState) -> u32 {
    let mut phase = 0;
    if state
        .resources
        .get(&ResourceId(ids::ELECTRICITY.into()))
        .is_some_and(|r| r.unlocked)
    {
        phase = 1;
    }
    if state
        .resources
        .get(&ResourceId(ids::COIN.into()))
        .is_some_and(|r| r.unlocked)
    {
        phase = 2;
    }
    if state
        .upgrades
        .get(&UpgradeId("tradingDesk".into()))
        .is_some_and(|u| u.purchased)
    {
        phase = 3;
    }
    phase
}

const PHASE_NAMES: [&str; 4] = ["Bootstrap", "Powered", "Mining", "Trading"];

/// Raise `phase` to the derived stage; it never regresses here (only a
/// full reset may lower it).
pub fn advance_phase(state: &mut GameState) -> Vec<GameEvent> {
    let derived = derived_phase(state);
    if derived > state.phase {
        state.phase = derived;
        let name = PHASE_NAMES
            .get(derived as usize)
            .copied()
            .unwrap_or("Unknown");
        return vec![GameEvent::info(format!("Entered the {name} phase"))];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::catalog::{self, counters};
    use game_core::BuildingId;

    fn rid(s: &str) -> ResourceId {
        ResourceId(s.into())
    }

    #[test]
    fn threshold_unlocks_once() {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        state.resources.get_mut(&rid("usd")).unwrap().value = 30.0;
        let events = run(&cat, &mut state);
        assert!(state.resources[&rid("electricity")].unlocked);
        assert!(state.buildings[&BuildingId("generator".into())].unlocked);
        assert!(!events.is_empty());

        // Second pass: nothing new to report.
        let events = run(&cat, &mut state);
        assert!(events.is_empty());
    }

    #[test]
    fn unlocks_never_revert() {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        state.resources.get_mut(&rid("usd")).unwrap().value = 30.0;
        run(&cat, &mut state);
        assert!(state.resources[&rid("electricity")].unlocked);

        // Condition no longer holds; the flag must stay.
        state.resources.get_mut(&rid("usd")).unwrap().value = 0.0;
        run(&cat, &mut state);
        assert!(state.resources[&rid("electricity")].unlocked);
    }

    #[test]
    fn counter_rule_fires() {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        state.bump_counter(counters::LEARN_CLICKS, 5.0);
        run(&cat, &mut state);
        assert!(state.upgrades[&UpgradeId("blockchainBasics".into())].unlocked);
    }

    #[test]
    fn composite_rule_needs_every_leg() {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        state.resources.get_mut(&rid("computing")).unwrap().unlocked = true;
        state.resources.get_mut(&rid("computing")).unwrap().value = 50.0;
        run(&cat, &mut state);
        assert!(!state.resources[&rid("coin")].unlocked);

        state
            .upgrades
            .get_mut(&UpgradeId("miningSoftware".into()))
            .unwrap()
            .purchased = true;
        run(&cat, &mut state);
        assert!(state.resources[&rid("coin")].unlocked);
    }

    #[test]
    fn phase_tracks_milestones_monotonically() {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        assert_eq!(state.phase, 0);
        state.resources.get_mut(&rid("usd")).unwrap().value = 30.0;
        run(&cat, &mut state);
        assert_eq!(state.phase, 1);

        state.resources.get_mut(&rid("usd")).unwrap().value = 0.0;
        run(&cat, &mut state);
        assert_eq!(state.phase, 1);
    }

    #[test]
    fn rebuild_repairs_synergy_invariant() {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        let s = state
            .synergies
            .get_mut(&game_core::SynergyId("smartGrid".into()))
            .unwrap();
        s.active = true; // corrupted save: active without unlocked
        rebuild(&cat, &mut state);
        let s = &state.synergies[&game_core::SynergyId("smartGrid".into())];
        assert!(!s.active);
    }

    #[test]
    fn repeated_runs_are_idempotent() {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        state.resources.get_mut(&rid("usd")).unwrap().value = 1_000.0;
        run(&cat, &mut state);
        let snapshot = state.clone();
        for _ in 0..100 {
            run(&cat, &mut state);
        }
        assert_eq!(state, snapshot);
    }
}

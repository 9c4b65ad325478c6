//! Synergy engine: unlock detection over purchased upgrade categories and
//! explicit, player-gated activation.

use crate::error::ActionError;
use crate::event::GameEvent;
use crate::production;
use game_core::{GameState, SynergyId, UpgradeCategory};
use std::collections::BTreeSet;
use tracing::debug;

/// Re-derive synergy unlocks from upgrade state. Must run after every
/// upgrade purchase; running it more often is harmless since purchased
/// flags never revert.
pub fn check(state: &mut GameState) -> Vec<GameEvent> {
    let purchased: BTreeSet<UpgradeCategory> = state
        .upgrades
        .values()
        .filter(|u| u.purchased)
        .map(|u| u.category)
        .collect();
    let mut events = Vec::new();
    for s in state.synergies.values_mut() {
        if s.unlocked {
            continue;
        }
        if s.required_categories.iter().all(|c| purchased.contains(c)) {
            s.unlocked = true;
            debug!(synergy = %s.id.0, "synergy requirements met");
            events.push(GameEvent::achievement(format!("Synergy available: {}", s.name)));
        }
    }
    events
}

/// Fold an unlocked synergy's bonus into the active effect set. No-op when
/// already active; rejected while still locked.
pub fn activate(state: &mut GameState, id: &SynergyId) -> Result<Vec<GameEvent>, ActionError> {
    let s = state
        .synergies
        .get_mut(id)
        .ok_or_else(|| ActionError::UnknownEntity { id: id.0.clone() })?;
    if s.active {
        return Ok(Vec::new());
    }
    if !s.unlocked {
        return Err(ActionError::NotUnlocked { id: id.0.clone() });
    }
    s.active = true;
    let name = s.name.clone();
    production::recompute(state);
    Ok(vec![GameEvent::success(format!("{name} activated"))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::catalog;
    use game_core::UpgradeId;

    fn buy(state: &mut GameState, id: &str) {
        state
            .upgrades
            .get_mut(&UpgradeId(id.into()))
            .unwrap()
            .purchased = true;
    }

    #[test]
    fn synergy_needs_every_category() {
        let mut state = catalog::new_game();
        // smartGrid wants Hardware + Energy; Hardware alone is not enough.
        buy(&mut state, "overclocking");
        buy(&mut state, "undervolting");
        check(&mut state);
        assert!(!state.synergies[&SynergyId("smartGrid".into())].unlocked);

        buy(&mut state, "greenEnergy");
        check(&mut state);
        assert!(state.synergies[&SynergyId("smartGrid".into())].unlocked);
    }

    #[test]
    fn activation_is_gated_on_unlock() {
        let mut state = catalog::new_game();
        let err = activate(&mut state, &SynergyId("smartGrid".into())).unwrap_err();
        assert_eq!(
            err,
            ActionError::NotUnlocked {
                id: "smartGrid".into()
            }
        );

        buy(&mut state, "overclocking");
        buy(&mut state, "greenEnergy");
        check(&mut state);
        let events = activate(&mut state, &SynergyId("smartGrid".into())).unwrap();
        assert_eq!(events.len(), 1);
        assert!(state.synergies[&SynergyId("smartGrid".into())].active);

        // Second activation is a silent no-op.
        let events = activate(&mut state, &SynergyId("smartGrid".into())).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn unknown_synergy_is_rejected() {
        let mut state = catalog::new_game();
        let err = activate(&mut state, &SynergyId("nope".into())).unwrap_err();
        assert_eq!(err, ActionError::UnknownEntity { id: "nope".into() });
    }

    #[test]
    fn active_bonus_lands_in_effect_set() {
        let mut state = catalog::new_game();
        buy(&mut state, "overclocking");
        buy(&mut state, "greenEnergy");
        check(&mut state);
        activate(&mut state, &SynergyId("smartGrid".into())).unwrap();
        let set = crate::effects::collect(&state);
        assert!(
            (set.consumption_cut_for(&game_core::ResourceId("electricity".into())) - 0.2).abs()
                < 1e-12
        );
    }
}

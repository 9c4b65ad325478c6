#![deny(warnings)]

//! Persistence layer: save-file layout, JSON and bincode codecs, and the
//! load-time repair pipeline.
//!
//! A loaded state is never trusted as-is. Restoring runs, in order:
//! legacy-id normalisation, a schema-compatibility pass filling missing
//! catalog entries (and dropping entries the catalog no longer knows), the
//! unlock engine's forced rebuild, and a full production recompute. Only a
//! state that still validates after all that is handed back.

use chrono::{DateTime, Utc};
use game_core::catalog::{self, Catalog};
use game_core::{GameState, UpgradeId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Bumped whenever the persisted shape changes incompatibly.
pub const SCHEMA_VERSION: u32 = 2;

/// Historical upgrade ids that map onto one canonical entry.
const LEGACY_UPGRADE_IDS: &[(&str, &str)] = &[
    ("basicBlockchain", "blockchainBasics"),
    ("blockchain_basics", "blockchainBasics"),
];

/// The on-disk envelope: the full state tree plus bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveFile {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub state: GameState,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt save: {0}")]
    Corrupt(String),
    #[error("save schema v{0} is newer than supported v{SCHEMA_VERSION}")]
    UnsupportedSchema(u32),
}

/// Wrap a state for writing. The caller hands in a consistent snapshot;
/// no transaction may be in flight.
pub fn snapshot(state: &GameState) -> SaveFile {
    SaveFile {
        schema_version: SCHEMA_VERSION,
        saved_at: Utc::now(),
        state: state.clone(),
    }
}

pub fn save_json(path: &Path, state: &GameState) -> Result<(), PersistError> {
    let text = serde_json::to_string_pretty(&snapshot(state))
        .map_err(|e| PersistError::Corrupt(e.to_string()))?;
    fs::write(path, text)?;
    info!(path = %path.display(), "saved game (json)");
    Ok(())
}

pub fn load_json(catalog: &Catalog, path: &Path) -> Result<GameState, PersistError> {
    let text = fs::read_to_string(path)?;
    let save: SaveFile =
        serde_json::from_str(&text).map_err(|e| PersistError::Corrupt(e.to_string()))?;
    restore(catalog, save)
}

/// Compact binary snapshot, for frequent autosaves.
pub fn save_snapshot(path: &Path, state: &GameState) -> Result<(), PersistError> {
    let bytes =
        bincode::serialize(&snapshot(state)).map_err(|e| PersistError::Corrupt(e.to_string()))?;
    fs::write(path, bytes)?;
    info!(path = %path.display(), "saved game (snapshot)");
    Ok(())
}

pub fn load_snapshot(catalog: &Catalog, path: &Path) -> Result<GameState, PersistError> {
    let bytes = fs::read(path)?;
    let save: SaveFile =
        bincode::deserialize(&bytes).map_err(|e| PersistError::Corrupt(e.to_string()))?;
    restore(catalog, save)
}

/// Run the full repair pipeline over a deserialized save.
pub fn restore(catalog: &Catalog, save: SaveFile) -> Result<GameState, PersistError> {
    if save.schema_version > SCHEMA_VERSION {
        return Err(PersistError::UnsupportedSchema(save.schema_version));
    }
    let mut state = save.state;
    fill_catalog_defaults(&mut state);
    migrate_legacy_ids(&mut state);
    game_engine::unlocks::rebuild(catalog, &mut state);
    game_engine::production::recompute(&mut state);
    game_core::validate_state(&state, &catalog.rules)
        .map_err(|e| PersistError::Corrupt(e.to_string()))?;
    Ok(state)
}

/// Schema-compatibility pass: entries the save is missing come in at
/// catalog defaults; entries the catalog no longer defines are dropped.
/// Player progress on known entries is kept untouched.
fn fill_catalog_defaults(state: &mut GameState) {
    let fresh = catalog::new_game();

    state.resources.retain(|id, _| {
        let keep = fresh.resources.contains_key(id);
        if !keep {
            warn!(resource = %id.0, "dropping resource unknown to catalog");
        }
        keep
    });
    state.buildings.retain(|id, _| {
        let keep = fresh.buildings.contains_key(id);
        if !keep {
            warn!(building = %id.0, "dropping building unknown to catalog");
        }
        keep
    });
    state.upgrades.retain(|id, _| {
        let keep = fresh.upgrades.contains_key(id)
            || LEGACY_UPGRADE_IDS.iter().any(|(old, _)| *old == id.0);
        if !keep {
            warn!(upgrade = %id.0, "dropping upgrade unknown to catalog");
        }
        keep
    });
    state.synergies.retain(|id, _| fresh.synergies.contains_key(id));
    state
        .specializations
        .retain(|id, _| fresh.specializations.contains_key(id));

    for (id, r) in fresh.resources {
        state.resources.entry(id).or_insert(r);
    }
    for (id, b) in fresh.buildings {
        state.buildings.entry(id).or_insert(b);
    }
    for (id, u) in fresh.upgrades {
        state.upgrades.entry(id).or_insert(u);
    }
    for (id, s) in fresh.synergies {
        state.synergies.entry(id).or_insert(s);
    }
    for (id, s) in fresh.specializations {
        state.specializations.entry(id).or_insert(s);
    }

    if game_core::validate_mining_params(&state.mining).is_err() {
        warn!("mining parameters out of range, resetting to catalog defaults");
        state.mining = fresh.mining;
    }
    if let Some(selected) = state.specialization.clone() {
        if !state.specializations.contains_key(&selected) {
            warn!(specialization = %selected.0, "clearing unknown specialization selection");
            state.specialization = None;
        }
    }
}

/// One-time normalisation of historical ids. Progress on a legacy entry is
/// merged into the canonical one; the legacy entry is removed.
fn migrate_legacy_ids(state: &mut GameState) {
    for (old, new) in LEGACY_UPGRADE_IDS {
        let Some(legacy) = state.upgrades.remove(&UpgradeId((*old).to_string())) else {
            continue;
        };
        info!(from = old, to = new, "migrating legacy upgrade id");
        if let Some(canonical) = state.upgrades.get_mut(&UpgradeId((*new).to_string())) {
            canonical.purchased |= legacy.purchased;
            canonical.unlocked |= legacy.unlocked;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{BuildingId, ResourceId};
    use std::path::PathBuf;

    fn rid(s: &str) -> ResourceId {
        ResourceId(s.into())
    }

    fn tmp(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("chainclicker-{}-{name}", std::process::id()))
    }

    fn played_state() -> (Catalog, GameState) {
        let cat = Catalog::standard();
        let mut state = catalog::new_game();
        state.resources.get_mut(&rid("usd")).unwrap().value = 5_000.0;
        let _ = game_engine::unlocks::run(&cat, &mut state);
        let _ = game_engine::step(
            &cat,
            &mut state,
            game_engine::Intent::Purchase {
                target: game_engine::PurchaseTarget::Building(BuildingId("generator".into())),
                quantity: 2,
            },
        )
        .unwrap();
        (cat, state)
    }

    #[test]
    fn json_roundtrip_preserves_progress() {
        let (cat, state) = played_state();
        let path = tmp("roundtrip.json");
        save_json(&path, &state).unwrap();
        let back = load_json(&cat, &path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.buildings[&BuildingId("generator".into())].count, 2);
        assert_eq!(back.resources[&rid("usd")].value, state.resources[&rid("usd")].value);
    }

    #[test]
    fn snapshot_roundtrip_matches_json() {
        let (cat, state) = played_state();
        let path = tmp("roundtrip.bin");
        save_snapshot(&path, &state).unwrap();
        let back = load_snapshot(&cat, &path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.buildings[&BuildingId("generator".into())].count, 2);
    }

    #[test]
    fn missing_entries_come_back_at_defaults() {
        let (cat, state) = played_state();
        let mut save = snapshot(&state);
        // Simulate a save written before the asicFarm existed.
        save.state.buildings.remove(&BuildingId("asicFarm".into()));
        let back = restore(&cat, save).unwrap();
        let farm = &back.buildings[&BuildingId("asicFarm".into())];
        assert_eq!(farm.count, 0);
        assert!(!farm.unlocked);
    }

    #[test]
    fn legacy_upgrade_id_is_normalised() {
        let (cat, state) = played_state();
        let mut save = snapshot(&state);
        let canonical = UpgradeId("blockchainBasics".into());
        let mut legacy = save.state.upgrades[&canonical].clone();
        legacy.id = UpgradeId("basicBlockchain".into());
        legacy.purchased = true;
        legacy.unlocked = true;
        save.state.upgrades.remove(&canonical);
        save.state
            .upgrades
            .insert(UpgradeId("basicBlockchain".into()), legacy);

        let back = restore(&cat, save).unwrap();
        assert!(back.upgrades[&canonical].purchased);
        assert!(!back.upgrades.contains_key(&UpgradeId("basicBlockchain".into())));
    }

    #[test]
    fn unlock_drift_is_repaired_on_load() {
        let (cat, state) = played_state();
        let mut save = snapshot(&state);
        // Drifted save: threshold long met but the flag never flipped.
        save.state.resources.get_mut(&rid("usd")).unwrap().value = 10_000.0;
        save.state
            .resources
            .get_mut(&rid("electricity"))
            .unwrap()
            .unlocked = false;
        let back = restore(&cat, save).unwrap();
        assert!(back.resources[&rid("electricity")].unlocked);
    }

    #[test]
    fn corrupt_mining_params_are_reset() {
        let (cat, state) = played_state();
        let mut save = snapshot(&state);
        save.state.mining.volatility = 40.0;
        let back = restore(&cat, save).unwrap();
        assert_eq!(back.mining.volatility, 0.3);
    }

    #[test]
    fn newer_schema_is_refused() {
        let (cat, state) = played_state();
        let mut save = snapshot(&state);
        save.schema_version = SCHEMA_VERSION + 1;
        assert!(matches!(
            restore(&cat, save),
            Err(PersistError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn restored_state_is_recomputed() {
        let (cat, state) = played_state();
        let mut save = snapshot(&state);
        // Zero out derived fields; restore must rebuild them.
        for r in save.state.resources.values_mut() {
            r.production = 0.0;
            r.per_second = 0.0;
        }
        let back = restore(&cat, save).unwrap();
        assert_eq!(back.resources[&rid("electricity")].production, 4.0);
    }
}

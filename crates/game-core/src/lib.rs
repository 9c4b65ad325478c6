#![deny(warnings)]

//! Core domain models and invariants for chainclicker.
//!
//! This crate defines the serializable world state shared by every other
//! crate, the closed effect vocabulary, the declarative unlock-rule table,
//! and validation helpers that guarantee catalog cross-references hold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub mod catalog;

/// Unique identifier for a resource, e.g. "knowledge", "coin".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

/// Unique identifier for a building, e.g. "gpuRig".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub String);

/// Unique identifier for a one-shot upgrade, e.g. "blockchainBasics".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpgradeId(pub String);

/// Unique identifier for a synergy, e.g. "smartGrid".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SynergyId(pub String);

/// Unique identifier for a specialization, e.g. "soloMiner".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecializationId(pub String);

/// Coarse grouping tag on resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// Hand-earned or converted quantities (knowledge, usd).
    Basic,
    /// Power generation and storage.
    Energy,
    /// Hashrate and the mined coin.
    Mining,
}

/// Upgrade categories; synergies require purchased upgrades across a set
/// of these.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum UpgradeCategory {
    Education,
    Hardware,
    Energy,
    Trading,
}

/// A declarative bonus. Magnitudes are fractions (0.25 = +25%) unless
/// stated otherwise. Effects are validated against the catalog at init, so
/// runtime consumers may treat unknown resource references as data
/// corruption to skip, never to abort on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Multiplies total production of a resource by `1 + fraction`.
    ProductionBoost { resource: ResourceId, fraction: f64 },
    /// Raises a resource's max capacity by `fraction` of its base max.
    MaxCapacityBoost { resource: ResourceId, fraction: f64 },
    /// Cuts total consumption of a resource; the aggregate cut is capped
    /// at 90% when applied.
    ConsumptionReduction { resource: ResourceId, fraction: f64 },
    /// Raises the usd yield of applying knowledge by `fraction` (relative).
    KnowledgeYieldBoost { fraction: f64 },
    /// Raises mined-coin output by `fraction`.
    MiningBoost { fraction: f64 },
    /// Cuts the coin-exchange commission by `fraction` of itself.
    CommissionReduction { fraction: f64 },
    /// Makes a named feature (e.g. "coinExchange") available.
    UnlockFeature { feature: String },
}

/// A quantity accumulated over time and spent on purchases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    /// Display name, e.g. "Computing Power".
    pub name: String,
    pub category: ResourceCategory,
    /// Current stock. Invariant: `0 <= value <= max` when max is finite.
    pub value: f64,
    /// Catalog capacity before capacity boosts. `None` = unbounded.
    pub base_max: Option<f64>,
    /// Effective capacity after boosts; recomputed, never hand-edited.
    pub max: Option<f64>,
    /// Intrinsic production before buildings and boosts, per second.
    pub base_production: f64,
    /// Total production per second; recomputed every aggregation pass.
    pub production: f64,
    /// Total consumption per second; recomputed every aggregation pass.
    pub consumption: f64,
    /// Net rate (`production - consumption`), cached for display.
    pub per_second: f64,
    pub unlocked: bool,
}

/// A repeatable purchase contributing ongoing production/consumption,
/// priced with geometric scaling by owned count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    /// Owned quantity.
    pub count: u64,
    /// Catalog price for the first unit.
    pub base_cost: BTreeMap<ResourceId, f64>,
    /// Price of the next unit: `floor(base * multiplier^count)` per
    /// resource, refreshed after every purchase and sale.
    pub cost: BTreeMap<ResourceId, f64>,
    /// Geometric scaling factor, > 1.
    pub cost_multiplier: f64,
    /// Per-unit output, resource id -> amount per second.
    pub production: BTreeMap<ResourceId, f64>,
    /// Per-unit upkeep, resource id -> amount per second.
    pub consumption: BTreeMap<ResourceId, f64>,
    /// Per-unit passive bonuses (e.g. cooling reduces power draw).
    pub effects: Vec<Effect>,
    pub unlocked: bool,
}

/// A one-shot research purchase granting permanent effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    pub id: UpgradeId,
    pub name: String,
    /// Flat, non-scaling price.
    pub cost: BTreeMap<ResourceId, f64>,
    pub category: UpgradeCategory,
    /// Tech-tree row, for grouping only.
    pub tier: u8,
    /// Once true, never reverts. Effects are re-derived from this flag on
    /// every recompute, so applying them is idempotent.
    pub purchased: bool,
    pub unlocked: bool,
    pub effects: Vec<Effect>,
}

/// A bonus unlocked by owning upgrades across several categories and
/// switched on explicitly by the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Synergy {
    pub id: SynergyId,
    pub name: String,
    /// Every listed category must have at least one purchased upgrade.
    pub required_categories: BTreeSet<UpgradeCategory>,
    pub unlocked: bool,
    /// Invariant: `active` implies `unlocked`.
    pub active: bool,
    pub bonus: Vec<Effect>,
}

/// A mutually exclusive play-style pick; exactly one may be selected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Specialization {
    pub id: SpecializationId,
    pub name: String,
    pub unlocked: bool,
    pub effects: Vec<Effect>,
}

/// Parameters of the mined-coin market. The exchange rate itself is a pure
/// function of these and `game_time`, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiningParams {
    /// Center of the exchange-rate walk, usd per coin.
    pub base_rate: f64,
    /// Walk amplitude as a fraction of `base_rate`, in [0, 1).
    pub volatility: f64,
    /// Coin output per second per unit of computing power.
    pub mining_efficiency: f64,
    /// Multiplier on mining-related electricity draw.
    pub energy_efficiency: f64,
    /// Fraction of exchange proceeds kept by the market, in [0, 1).
    pub commission: f64,
}

/// Kinds of entities an unlock rule can flip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UnlockTarget {
    Resource(ResourceId),
    Building(BuildingId),
    Upgrade(UpgradeId),
    Specialization(SpecializationId),
}

/// Declarative unlock predicates, evaluated idempotently on every tick and
/// after every mutating action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    ResourceAtLeast { resource: ResourceId, amount: f64 },
    BuildingCountAtLeast { building: BuildingId, count: u64 },
    UpgradePurchased { upgrade: UpgradeId },
    CounterAtLeast { counter: String, value: f64 },
    AllOf { conditions: Vec<Condition> },
}

/// One row of the unlock table: when `condition` first holds, `target`
/// becomes visible/available.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnlockRule {
    pub target: UnlockTarget,
    pub condition: Condition,
}

/// The aggregate world state. Single source of truth: every engine
/// operation is `fn(&mut GameState, input) -> Result<...>` with no other
/// hidden state, so recompute-from-scratch and replay are always safe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub resources: BTreeMap<ResourceId, Resource>,
    pub buildings: BTreeMap<BuildingId, Building>,
    pub upgrades: BTreeMap<UpgradeId, Upgrade>,
    pub synergies: BTreeMap<SynergyId, Synergy>,
    pub specializations: BTreeMap<SpecializationId, Specialization>,
    /// The single selected specialization, if any.
    pub specialization: Option<SpecializationId>,
    /// Monotonic lifetime statistics, keyed by the `counters` constants.
    pub counters: BTreeMap<String, f64>,
    /// Features granted by `Effect::UnlockFeature`; refreshed on every
    /// production recompute (derived cache, not independent truth).
    pub features: BTreeSet<String>,
    /// Coarse progression stage; only a full reset may lower it.
    pub phase: u32,
    pub mining: MiningParams,
    /// Simulated seconds since the session began.
    pub game_time: f64,
    /// Wall-clock time of the last applied tick; drives offline gains.
    pub last_update: DateTime<Utc>,
    pub prestige_points: f64,
}

impl GameState {
    pub fn resource(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Sum of a counter, zero when it was never bumped.
    pub fn counter(&self, name: &str) -> f64 {
        self.counters.get(name).copied().unwrap_or(0.0)
    }

    /// Adds to a monotonic counter. Negative amounts are ignored.
    pub fn bump_counter(&mut self, name: &str, amount: f64) {
        if amount > 0.0 {
            *self.counters.entry(name.to_string()).or_insert(0.0) += amount;
        }
    }
}

/// Read-only projection of every `unlocked` flag, keyed `"kind:id"`.
/// Rebuilt on demand; never stored, so it cannot drift.
pub fn unlock_table(state: &GameState) -> BTreeMap<String, bool> {
    let mut table = BTreeMap::new();
    for (id, r) in &state.resources {
        table.insert(format!("resource:{}", id.0), r.unlocked);
    }
    for (id, b) in &state.buildings {
        table.insert(format!("building:{}", id.0), b.unlocked);
    }
    for (id, u) in &state.upgrades {
        table.insert(format!("upgrade:{}", id.0), u.unlocked);
    }
    for (id, s) in &state.synergies {
        table.insert(format!("synergy:{}", id.0), s.unlocked);
    }
    for (id, s) in &state.specializations {
        table.insert(format!("specialization:{}", id.0), s.unlocked);
    }
    table
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Map key and embedded id disagree.
    #[error("entity stored under key {key} carries id {id}")]
    IdMismatch { key: String, id: String },
    /// Display name is empty.
    #[error("empty display name on {0}")]
    EmptyName(String),
    /// A cost/production/effect entry references a resource that is not in
    /// the catalog.
    #[error("unknown resource referenced: {0}")]
    UnknownResource(String),
    /// An unlock rule references an entity that is not in the catalog.
    #[error("unlock rule references unknown entity: {0}")]
    UnknownRuleTarget(String),
    /// Numeric field must be finite.
    #[error("non-finite numeric value on {0}")]
    NonFinite(String),
    /// Amounts, rates, and fractions must be non-negative.
    #[error("negative amount on {0}")]
    NegativeAmount(String),
    /// Geometric cost scaling must exceed 1.
    #[error("cost multiplier {multiplier} on {id} must be > 1")]
    InvalidCostMultiplier { id: String, multiplier: f64 },
    /// Volatility and commission are fractions in [0, 1).
    #[error("mining parameter out of range: {0}")]
    ParamOutOfRange(&'static str),
}

fn check_amount(label: &str, v: f64) -> Result<(), ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite(label.to_string()));
    }
    if v < 0.0 {
        return Err(ValidationError::NegativeAmount(label.to_string()));
    }
    Ok(())
}

fn check_cost_map(
    owner: &str,
    map: &BTreeMap<ResourceId, f64>,
    resources: &BTreeMap<ResourceId, Resource>,
) -> Result<(), ValidationError> {
    for (rid, amount) in map {
        if !resources.contains_key(rid) {
            return Err(ValidationError::UnknownResource(rid.0.clone()));
        }
        check_amount(&format!("{owner}.{}", rid.0), *amount)?;
    }
    Ok(())
}

/// Validate a single effect against the resource catalog.
pub fn validate_effect(
    owner: &str,
    effect: &Effect,
    resources: &BTreeMap<ResourceId, Resource>,
) -> Result<(), ValidationError> {
    match effect {
        Effect::ProductionBoost { resource, fraction }
        | Effect::MaxCapacityBoost { resource, fraction }
        | Effect::ConsumptionReduction { resource, fraction } => {
            if !resources.contains_key(resource) {
                return Err(ValidationError::UnknownResource(resource.0.clone()));
            }
            check_amount(&format!("{owner} effect fraction"), *fraction)
        }
        Effect::KnowledgeYieldBoost { fraction }
        | Effect::MiningBoost { fraction }
        | Effect::CommissionReduction { fraction } => {
            check_amount(&format!("{owner} effect fraction"), *fraction)
        }
        Effect::UnlockFeature { feature } => {
            if feature.trim().is_empty() {
                return Err(ValidationError::EmptyName(format!("{owner} feature")));
            }
            Ok(())
        }
    }
}

/// Validate a resource record.
pub fn validate_resource(r: &Resource) -> Result<(), ValidationError> {
    if r.name.trim().is_empty() {
        return Err(ValidationError::EmptyName(r.id.0.clone()));
    }
    check_amount(&format!("{}.value", r.id.0), r.value)?;
    check_amount(&format!("{}.base_production", r.id.0), r.base_production)?;
    if let Some(max) = r.base_max {
        check_amount(&format!("{}.base_max", r.id.0), max)?;
    }
    Ok(())
}

/// Validate the mining market parameters.
pub fn validate_mining_params(p: &MiningParams) -> Result<(), ValidationError> {
    check_amount("mining.base_rate", p.base_rate)?;
    check_amount("mining.mining_efficiency", p.mining_efficiency)?;
    check_amount("mining.energy_efficiency", p.energy_efficiency)?;
    if !(0.0..1.0).contains(&p.volatility) {
        return Err(ValidationError::ParamOutOfRange("volatility"));
    }
    if !(0.0..1.0).contains(&p.commission) {
        return Err(ValidationError::ParamOutOfRange("commission"));
    }
    Ok(())
}

fn rule_target_exists(target: &UnlockTarget, state: &GameState) -> bool {
    match target {
        UnlockTarget::Resource(id) => state.resources.contains_key(id),
        UnlockTarget::Building(id) => state.buildings.contains_key(id),
        UnlockTarget::Upgrade(id) => state.upgrades.contains_key(id),
        UnlockTarget::Specialization(id) => state.specializations.contains_key(id),
    }
}

fn validate_condition(cond: &Condition, state: &GameState) -> Result<(), ValidationError> {
    match cond {
        Condition::ResourceAtLeast { resource, amount } => {
            if !state.resources.contains_key(resource) {
                return Err(ValidationError::UnknownResource(resource.0.clone()));
            }
            check_amount("rule threshold", *amount)
        }
        Condition::BuildingCountAtLeast { building, .. } => {
            if !state.buildings.contains_key(building) {
                return Err(ValidationError::UnknownRuleTarget(building.0.clone()));
            }
            Ok(())
        }
        Condition::UpgradePurchased { upgrade } => {
            if !state.upgrades.contains_key(upgrade) {
                return Err(ValidationError::UnknownRuleTarget(upgrade.0.clone()));
            }
            Ok(())
        }
        Condition::CounterAtLeast { value, .. } => check_amount("rule threshold", *value),
        Condition::AllOf { conditions } => {
            for c in conditions {
                validate_condition(c, state)?;
            }
            Ok(())
        }
    }
}

/// Validate the whole state tree, including cross-references from costs,
/// production maps, effects, and unlock rules back to the catalog.
pub fn validate_state(state: &GameState, rules: &[UnlockRule]) -> Result<(), ValidationError> {
    for (key, r) in &state.resources {
        if key != &r.id {
            return Err(ValidationError::IdMismatch {
                key: key.0.clone(),
                id: r.id.0.clone(),
            });
        }
        validate_resource(r)?;
    }
    for (key, b) in &state.buildings {
        if key != &b.id {
            return Err(ValidationError::IdMismatch {
                key: key.0.clone(),
                id: b.id.0.clone(),
            });
        }
        if b.name.trim().is_empty() {
            return Err(ValidationError::EmptyName(b.id.0.clone()));
        }
        if !(b.cost_multiplier > 1.0) || !b.cost_multiplier.is_finite() {
            return Err(ValidationError::InvalidCostMultiplier {
                id: b.id.0.clone(),
                multiplier: b.cost_multiplier,
            });
        }
        check_cost_map(&b.id.0, &b.base_cost, &state.resources)?;
        check_cost_map(&b.id.0, &b.cost, &state.resources)?;
        check_cost_map(&b.id.0, &b.production, &state.resources)?;
        check_cost_map(&b.id.0, &b.consumption, &state.resources)?;
        for e in &b.effects {
            validate_effect(&b.id.0, e, &state.resources)?;
        }
    }
    for (key, u) in &state.upgrades {
        if key != &u.id {
            return Err(ValidationError::IdMismatch {
                key: key.0.clone(),
                id: u.id.0.clone(),
            });
        }
        if u.name.trim().is_empty() {
            return Err(ValidationError::EmptyName(u.id.0.clone()));
        }
        check_cost_map(&u.id.0, &u.cost, &state.resources)?;
        for e in &u.effects {
            validate_effect(&u.id.0, e, &state.resources)?;
        }
    }
    for (key, s) in &state.synergies {
        if key != &s.id {
            return Err(ValidationError::IdMismatch {
                key: key.0.clone(),
                id: s.id.0.clone(),
            });
        }
        for e in &s.bonus {
            validate_effect(&s.id.0, e, &state.resources)?;
        }
    }
    for (_, s) in &state.specializations {
        for e in &s.effects {
            validate_effect(&s.id.0, e, &state.resources)?;
        }
    }
    validate_mining_params(&state.mining)?;
    for rule in rules {
        if !rule_target_exists(&rule.target, state) {
            return Err(ValidationError::UnknownRuleTarget(format!("{:?}", rule.target)));
        }
        validate_condition(&rule.condition, state)?;
    }
    Ok(())
}

//! Default world content: resources, buildings, upgrades, synergies,
//! specializations, and the declarative unlock table.

use crate::{
    Building, BuildingId, Condition, Effect, GameState, MiningParams, Resource, ResourceCategory,
    ResourceId, Specialization, SpecializationId, Synergy, SynergyId, UnlockRule, UnlockTarget,
    Upgrade, UpgradeCategory, UpgradeId,
};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

/// Knowledge consumed per application.
pub const KNOWLEDGE_APPLY_COST: f64 = 10.0;
/// Usd credited per knowledge unit applied (before yield boosts).
pub const KNOWLEDGE_APPLY_YIELD: f64 = 0.1;

/// Counter keys. Counters are lifetime statistics and unlock-predicate
/// inputs; they never decrease.
pub mod counters {
    pub const LEARN_CLICKS: &str = "learnClicks";
    pub const KNOWLEDGE_APPLIED: &str = "knowledgeApplied";
    pub const BUILDINGS_BOUGHT: &str = "buildingsBought";
    pub const UPGRADES_BOUGHT: &str = "upgradesBought";
    /// Completed coin-exchange operations.
    pub const COINS_EXCHANGED: &str = "coinsExchanged";
    /// Cumulative usd ever credited; feeds the prestige formula.
    pub const LIFETIME_USD: &str = "lifetimeUsd";
}

/// Feature keys granted through `Effect::UnlockFeature`.
pub mod features {
    pub const COIN_EXCHANGE: &str = "coinExchange";
}

/// Well-known resource ids the engine formulas address directly.
pub mod ids {
    pub const KNOWLEDGE: &str = "knowledge";
    pub const USD: &str = "usd";
    pub const ELECTRICITY: &str = "electricity";
    pub const COMPUTING: &str = "computing";
    pub const COIN: &str = "coin";
}

/// Static catalog data that is not part of the mutable state tree.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub rules: Vec<UnlockRule>,
}

fn rid(id: &str) -> ResourceId {
    ResourceId(id.to_string())
}

fn bid(id: &str) -> BuildingId {
    BuildingId(id.to_string())
}

fn uid(id: &str) -> UpgradeId {
    UpgradeId(id.to_string())
}

fn amounts(entries: &[(&str, f64)]) -> BTreeMap<ResourceId, f64> {
    entries.iter().map(|(id, v)| (rid(id), *v)).collect()
}

fn resource(
    id: &str,
    name: &str,
    category: ResourceCategory,
    base_max: Option<f64>,
    unlocked: bool,
) -> (ResourceId, Resource) {
    (
        rid(id),
        Resource {
            id: rid(id),
            name: name.to_string(),
            category,
            value: 0.0,
            base_max,
            max: base_max,
            base_production: 0.0,
            production: 0.0,
            consumption: 0.0,
            per_second: 0.0,
            unlocked,
        },
    )
}

#[allow(clippy::too_many_arguments)]
fn building(
    id: &str,
    name: &str,
    base_cost: &[(&str, f64)],
    cost_multiplier: f64,
    production: &[(&str, f64)],
    consumption: &[(&str, f64)],
    effects: Vec<Effect>,
    unlocked: bool,
) -> (BuildingId, Building) {
    (
        bid(id),
        Building {
            id: bid(id),
            name: name.to_string(),
            count: 0,
            base_cost: amounts(base_cost),
            cost: amounts(base_cost),
            cost_multiplier,
            production: amounts(production),
            consumption: amounts(consumption),
            effects,
            unlocked,
        },
    )
}

fn upgrade(
    id: &str,
    name: &str,
    cost: &[(&str, f64)],
    category: UpgradeCategory,
    tier: u8,
    effects: Vec<Effect>,
) -> (UpgradeId, Upgrade) {
    (
        uid(id),
        Upgrade {
            id: uid(id),
            name: name.to_string(),
            cost: amounts(cost),
            category,
            tier,
            purchased: false,
            unlocked: false,
            effects,
        },
    )
}

fn synergy(
    id: &str,
    name: &str,
    required: &[UpgradeCategory],
    bonus: Vec<Effect>,
) -> (SynergyId, Synergy) {
    (
        SynergyId(id.to_string()),
        Synergy {
            id: SynergyId(id.to_string()),
            name: name.to_string(),
            required_categories: required.iter().copied().collect::<BTreeSet<_>>(),
            unlocked: false,
            active: false,
            bonus,
        },
    )
}

fn specialization(id: &str, name: &str, effects: Vec<Effect>) -> (SpecializationId, Specialization) {
    (
        SpecializationId(id.to_string()),
        Specialization {
            id: SpecializationId(id.to_string()),
            name: name.to_string(),
            unlocked: false,
            effects,
        },
    )
}

/// A fresh session at catalog defaults.
pub fn new_game() -> GameState {
    use UpgradeCategory::*;

    let resources: BTreeMap<_, _> = [
        resource("knowledge", "Knowledge", ResourceCategory::Basic, Some(100.0), true),
        resource("usd", "Dollars", ResourceCategory::Basic, None, true),
        resource(
            "electricity",
            "Electricity",
            ResourceCategory::Energy,
            Some(100.0),
            false,
        ),
        resource("computing", "Computing Power", ResourceCategory::Mining, None, false),
        resource("coin", "Coin", ResourceCategory::Mining, None, false),
    ]
    .into_iter()
    .collect();

    let buildings: BTreeMap<_, _> = [
        building(
            "onlineCourse",
            "Online Course",
            &[("usd", 15.0)],
            1.15,
            &[("knowledge", 0.2)],
            &[],
            vec![],
            false,
        ),
        building(
            "generator",
            "Diesel Generator",
            &[("usd", 25.0)],
            1.15,
            &[("electricity", 2.0)],
            &[],
            vec![],
            false,
        ),
        building(
            "solarPanel",
            "Solar Panel",
            &[("usd", 120.0)],
            1.17,
            &[("electricity", 5.0)],
            &[],
            vec![],
            false,
        ),
        building(
            "homeComputer",
            "Home Computer",
            &[("usd", 60.0)],
            1.18,
            &[("computing", 1.0)],
            &[("electricity", 0.5)],
            vec![],
            false,
        ),
        building(
            "gpuRig",
            "GPU Rig",
            &[("usd", 400.0)],
            1.2,
            &[("computing", 6.0)],
            &[("electricity", 2.5)],
            vec![],
            false,
        ),
        building(
            "asicFarm",
            "ASIC Farm",
            &[("usd", 2500.0)],
            1.25,
            &[("computing", 30.0)],
            &[("electricity", 9.0)],
            vec![],
            false,
        ),
        building(
            "coolingTower",
            "Cooling Tower",
            &[("usd", 800.0)],
            1.3,
            &[],
            &[],
            vec![Effect::ConsumptionReduction {
                resource: rid("electricity"),
                fraction: 0.04,
            }],
            false,
        ),
    ]
    .into_iter()
    .collect();

    let upgrades: BTreeMap<_, _> = [
        upgrade(
            "blockchainBasics",
            "Blockchain Basics",
            &[("knowledge", 10.0)],
            Education,
            1,
            vec![Effect::KnowledgeYieldBoost { fraction: 0.1 }],
        ),
        upgrade(
            "efficientStudy",
            "Efficient Study",
            &[("knowledge", 25.0)],
            Education,
            1,
            vec![Effect::ProductionBoost {
                resource: rid("knowledge"),
                fraction: 0.25,
            }],
        ),
        upgrade(
            "overclocking",
            "Overclocking",
            &[("usd", 200.0)],
            Hardware,
            1,
            vec![Effect::ProductionBoost {
                resource: rid("computing"),
                fraction: 0.25,
            }],
        ),
        upgrade(
            "undervolting",
            "Undervolting",
            &[("usd", 350.0)],
            Hardware,
            2,
            vec![Effect::ConsumptionReduction {
                resource: rid("electricity"),
                fraction: 0.15,
            }],
        ),
        upgrade(
            "miningSoftware",
            "Mining Software",
            &[("usd", 250.0)],
            Hardware,
            1,
            vec![Effect::MiningBoost { fraction: 0.2 }],
        ),
        upgrade(
            "greenEnergy",
            "Green Energy",
            &[("usd", 500.0)],
            Energy,
            2,
            vec![Effect::ProductionBoost {
                resource: rid("electricity"),
                fraction: 0.3,
            }],
        ),
        upgrade(
            "batteryBank",
            "Battery Bank",
            &[("usd", 400.0)],
            Energy,
            1,
            vec![Effect::MaxCapacityBoost {
                resource: rid("electricity"),
                fraction: 0.5,
            }],
        ),
        upgrade(
            "tradingDesk",
            "Trading Desk",
            &[("usd", 1000.0)],
            Trading,
            1,
            vec![Effect::UnlockFeature {
                feature: features::COIN_EXCHANGE.to_string(),
            }],
        ),
        upgrade(
            "arbitrage",
            "Arbitrage",
            &[("usd", 2000.0)],
            Trading,
            2,
            vec![Effect::CommissionReduction { fraction: 0.5 }],
        ),
    ]
    .into_iter()
    .collect();

    let synergies: BTreeMap<_, _> = [
        synergy(
            "smartGrid",
            "Smart Grid",
            &[Hardware, Energy],
            vec![Effect::ConsumptionReduction {
                resource: rid("electricity"),
                fraction: 0.2,
            }],
        ),
        synergy(
            "quantFund",
            "Quant Fund",
            &[Education, Trading],
            vec![Effect::ProductionBoost {
                resource: rid("coin"),
                fraction: 0.25,
            }],
        ),
        synergy(
            "fullStack",
            "Full Stack",
            &[Education, Hardware, Energy, Trading],
            vec![
                Effect::ProductionBoost {
                    resource: rid("computing"),
                    fraction: 0.3,
                },
                Effect::MiningBoost { fraction: 0.2 },
            ],
        ),
    ]
    .into_iter()
    .collect();

    let specializations: BTreeMap<_, _> = [
        specialization(
            "soloMiner",
            "Solo Miner",
            vec![Effect::MiningBoost { fraction: 0.3 }],
        ),
        specialization(
            "gridEngineer",
            "Grid Engineer",
            vec![Effect::ProductionBoost {
                resource: rid("electricity"),
                fraction: 0.4,
            }],
        ),
        specialization(
            "dayTrader",
            "Day Trader",
            vec![
                Effect::CommissionReduction { fraction: 0.5 },
                Effect::KnowledgeYieldBoost { fraction: 0.1 },
            ],
        ),
    ]
    .into_iter()
    .collect();

    GameState {
        resources,
        buildings,
        upgrades,
        synergies,
        specializations,
        specialization: None,
        counters: BTreeMap::new(),
        features: BTreeSet::new(),
        phase: 0,
        mining: MiningParams {
            base_rate: 100.0,
            volatility: 0.3,
            mining_efficiency: 0.001,
            energy_efficiency: 1.0,
            commission: 0.05,
        },
        game_time: 0.0,
        last_update: Utc::now(),
        prestige_points: 0.0,
    }
}

impl Catalog {
    /// The standard unlock table.
    pub fn standard() -> Self {
        use Condition::*;
        let rules = vec![
            UnlockRule {
                target: UnlockTarget::Resource(rid("electricity")),
                condition: ResourceAtLeast {
                    resource: rid("usd"),
                    amount: 25.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Building(bid("generator")),
                condition: ResourceAtLeast {
                    resource: rid("usd"),
                    amount: 25.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Building(bid("solarPanel")),
                condition: ResourceAtLeast {
                    resource: rid("electricity"),
                    amount: 50.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Building(bid("homeComputer")),
                condition: ResourceAtLeast {
                    resource: rid("electricity"),
                    amount: 10.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Resource(rid("computing")),
                condition: BuildingCountAtLeast {
                    building: bid("homeComputer"),
                    count: 1,
                },
            },
            UnlockRule {
                target: UnlockTarget::Building(bid("onlineCourse")),
                condition: ResourceAtLeast {
                    resource: rid("knowledge"),
                    amount: 15.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("blockchainBasics")),
                condition: CounterAtLeast {
                    counter: counters::LEARN_CLICKS.to_string(),
                    value: 5.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("efficientStudy")),
                condition: ResourceAtLeast {
                    resource: rid("knowledge"),
                    amount: 20.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("overclocking")),
                condition: BuildingCountAtLeast {
                    building: bid("homeComputer"),
                    count: 2,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("undervolting")),
                condition: ResourceAtLeast {
                    resource: rid("electricity"),
                    amount: 50.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("greenEnergy")),
                condition: ResourceAtLeast {
                    resource: rid("electricity"),
                    amount: 50.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("batteryBank")),
                condition: ResourceAtLeast {
                    resource: rid("electricity"),
                    amount: 50.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("miningSoftware")),
                condition: ResourceAtLeast {
                    resource: rid("computing"),
                    amount: 5.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Resource(rid("coin")),
                condition: AllOf {
                    conditions: vec![
                        ResourceAtLeast {
                            resource: rid("computing"),
                            amount: 5.0,
                        },
                        UpgradePurchased {
                            upgrade: uid("miningSoftware"),
                        },
                    ],
                },
            },
            UnlockRule {
                target: UnlockTarget::Building(bid("gpuRig")),
                condition: AllOf {
                    conditions: vec![
                        UpgradePurchased {
                            upgrade: uid("miningSoftware"),
                        },
                        ResourceAtLeast {
                            resource: rid("computing"),
                            amount: 10.0,
                        },
                    ],
                },
            },
            UnlockRule {
                target: UnlockTarget::Building(bid("asicFarm")),
                condition: BuildingCountAtLeast {
                    building: bid("gpuRig"),
                    count: 3,
                },
            },
            UnlockRule {
                target: UnlockTarget::Building(bid("coolingTower")),
                condition: BuildingCountAtLeast {
                    building: bid("gpuRig"),
                    count: 1,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("tradingDesk")),
                condition: ResourceAtLeast {
                    resource: rid("coin"),
                    amount: 0.01,
                },
            },
            UnlockRule {
                target: UnlockTarget::Upgrade(uid("arbitrage")),
                condition: CounterAtLeast {
                    counter: counters::COINS_EXCHANGED.to_string(),
                    value: 1.0,
                },
            },
            UnlockRule {
                target: UnlockTarget::Specialization(SpecializationId("soloMiner".into())),
                condition: UpgradePurchased {
                    upgrade: uid("tradingDesk"),
                },
            },
            UnlockRule {
                target: UnlockTarget::Specialization(SpecializationId("gridEngineer".into())),
                condition: UpgradePurchased {
                    upgrade: uid("tradingDesk"),
                },
            },
            UnlockRule {
                target: UnlockTarget::Specialization(SpecializationId("dayTrader".into())),
                condition: UpgradePurchased {
                    upgrade: uid("tradingDesk"),
                },
            },
        ];
        Self { rules }
    }
}

#![deny(warnings)]

//! Headless CLI: plays a scripted session against the engine and prints a
//! KPI summary. Useful for balancing passes and smoke-testing saves.

use anyhow::{Context, Result};
use chrono::Utc;
use game_core::catalog::{ids, Catalog};
use game_core::{GameState, ResourceId};
use game_engine::{step, ActionError, Intent, PurchaseTarget, Severity};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Scripted-session parameters, loadable from a YAML scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct Scenario {
    /// Number of 1-second ticks to simulate.
    ticks: u64,
    /// A learn click lands every N ticks.
    click_every: u64,
    /// Greedily buy whatever is unlocked and affordable.
    autobuy: bool,
    /// Sell coin whenever the exchange is available.
    exchange: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            ticks: 600,
            click_every: 2,
            autobuy: true,
            exchange: true,
        }
    }
}

struct Args {
    scenario: Option<PathBuf>,
    ticks: Option<u64>,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        scenario: None,
        ticks: None,
        load: None,
        save: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next().map(PathBuf::from),
            "--ticks" => args.ticks = it.next().and_then(|s| s.parse().ok()),
            "--load" => args.load = it.next().map(PathBuf::from),
            "--save" => args.save = it.next().map(PathBuf::from),
            "--version" => {
                println!("chainclicker cli {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_SHA"));
                std::process::exit(0);
            }
            _ => {}
        }
    }
    args
}

/// Expected rejections (can't afford yet, still locked) are part of normal
/// play for a greedy script; anything else should surface.
fn tolerate(result: Result<Vec<game_engine::GameEvent>, ActionError>) -> Vec<game_engine::GameEvent> {
    match result {
        Ok(events) => events,
        Err(
            ActionError::InsufficientResources { .. }
            | ActionError::NotUnlocked { .. }
            | ActionError::AlreadyPurchased { .. },
        ) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "intent rejected");
            Vec::new()
        }
    }
}

fn report(events: &[game_engine::GameEvent]) {
    for ev in events {
        match ev.severity {
            Severity::Achievement => info!(target: "session", "{}", ev.message),
            _ => debug!(target: "session", "{}", ev.message),
        }
    }
}

/// One scripted player move per tick: click, convert, shop, trade.
fn play_tick(catalog: &Catalog, state: &mut GameState, tick_no: u64, scenario: &Scenario) {
    if scenario.click_every > 0 && tick_no % scenario.click_every == 0 {
        report(&tolerate(step(
            catalog,
            state,
            Intent::IncrementResource {
                resource: ResourceId(ids::KNOWLEDGE.into()),
                amount: 1.0,
            },
        )));
    }
    report(&tolerate(step(catalog, state, Intent::ApplyAllKnowledge)));

    if scenario.autobuy {
        let affordable: Vec<PurchaseTarget> = state
            .buildings
            .values()
            .filter(|b| b.unlocked && game_econ::can_afford(&state.resources, &b.cost))
            .map(|b| PurchaseTarget::Building(b.id.clone()))
            .chain(
                state
                    .upgrades
                    .values()
                    .filter(|u| {
                        u.unlocked && !u.purchased && game_econ::can_afford(&state.resources, &u.cost)
                    })
                    .map(|u| PurchaseTarget::Upgrade(u.id.clone())),
            )
            .collect();
        for target in affordable {
            report(&tolerate(step(
                catalog,
                state,
                Intent::Purchase { target, quantity: 1 },
            )));
        }
        let ready: Vec<_> = state
            .synergies
            .values()
            .filter(|s| s.unlocked && !s.active)
            .map(|s| s.id.clone())
            .collect();
        for synergy in ready {
            report(&tolerate(step(catalog, state, Intent::ActivateSynergy { synergy })));
        }
    }

    if scenario.exchange {
        let coin = state
            .resources
            .get(&ResourceId(ids::COIN.into()))
            .map(|r| r.value)
            .unwrap_or(0.0);
        if coin >= 0.1 {
            report(&tolerate(step(catalog, state, Intent::ExchangeCoin { amount: None })));
        }
    }

    report(&tolerate(step(catalog, state, Intent::Tick { delta_seconds: 1.0 })));
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args();
    let mut scenario = match &args.scenario {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading scenario {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing scenario {}", path.display()))?
        }
        None => Scenario::default(),
    };
    if let Some(ticks) = args.ticks {
        scenario.ticks = ticks;
    }
    info!(?scenario, "starting session");

    let catalog = Catalog::standard();
    let mut state = match &args.load {
        Some(path) => {
            let mut state = persistence::load_json(&catalog, path)
                .with_context(|| format!("loading {}", path.display()))?;
            report(&game_engine::apply_offline(&catalog, &mut state, Utc::now()));
            state
        }
        None => game_core::catalog::new_game(),
    };

    for tick_no in 0..scenario.ticks {
        play_tick(&catalog, &mut state, tick_no, &scenario);
    }

    if let Some(path) = &args.save {
        persistence::save_json(path, &state)
            .with_context(|| format!("saving {}", path.display()))?;
    }

    let usd = state.resources[&ResourceId(ids::USD.into())].value;
    let coin = state.resources[&ResourceId(ids::COIN.into())].value;
    let owned: u64 = state.buildings.values().map(|b| b.count).sum();
    let researched = state.upgrades.values().filter(|u| u.purchased).count();
    println!(
        "Session | ticks: {} | usd: {:.2} | coin: {:.4} | buildings: {} | upgrades: {} | phase: {} | prestige ready: {}",
        scenario.ticks,
        usd,
        coin,
        owned,
        researched,
        state.phase,
        game_engine::purchase::prestige_earned(&state),
    );

    Ok(())
}

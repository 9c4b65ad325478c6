#![deny(warnings)]

//! Resource ledger, cost evaluation, and mined-coin market math.
//!
//! Everything here is a pure helper over `game_core` records:
//! - ledger operations that advance/clamp a single resource
//! - geometric cost scaling and affordability checks
//! - the deterministic exchange-rate walk and mining output formula

use game_core::catalog::{KNOWLEDGE_APPLY_COST, KNOWLEDGE_APPLY_YIELD};
use game_core::{MiningParams, Resource, ResourceId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use thiserror::Error;

/// Deltas smaller than this are dropped to avoid float churn.
pub const EPSILON: f64 = 1e-6;

/// The rate walk draws one offset per bucket of this many simulated seconds.
pub const RATE_BUCKET_SECS: f64 = 60.0;

/// Fixed stream seed for the exchange-rate walk. The walk must be a pure
/// function of `game_time`, so the seed is a constant, not state.
const RATE_SEED: u64 = 0x1D1E_C01B;

/// Errors produced by market helpers. Ledger and cost operations are total
/// over well-formed input and return no errors.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Volatility and commission are fractions in [0, 1).
    #[error("fraction out of [0,1) range: {0}")]
    FractionOutOfRange(&'static str),
    /// Rates and amounts must be finite and non-negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),
}

// ── Resource ledger ─────────────────────────────────────────────────────

/// Net rate of a resource: production minus consumption.
pub fn net_change(r: &Resource) -> f64 {
    r.production - r.consumption
}

/// Advance a resource by elapsed time. No-op for locked resources. The
/// `per_second` display field is refreshed even when the delta is dropped.
///
/// `ignore_consumption` exists for the offline-accumulation path, where
/// upkeep is waived.
pub fn advance(r: &mut Resource, delta_seconds: f64, ignore_consumption: bool) {
    if !r.unlocked {
        return;
    }
    r.per_second = net_change(r);
    let rate = if ignore_consumption {
        r.production
    } else {
        r.per_second
    };
    let delta = rate * delta_seconds;
    if delta.abs() < EPSILON {
        return;
    }
    let cap = r.max.unwrap_or(f64::INFINITY);
    r.value = (r.value + delta).clamp(0.0, cap);
}

/// Add to a resource, clamped to its capacity. Locked resources ignore
/// credits; negative amounts are treated as zero.
pub fn increment(r: &mut Resource, amount: f64) {
    if !r.unlocked {
        return;
    }
    let amount = amount.max(0.0);
    let cap = r.max.unwrap_or(f64::INFINITY);
    r.value = (r.value + amount).min(cap);
}

/// Remove from a resource, clamped to zero. Locked resources ignore
/// debits; negative amounts are treated as zero.
pub fn decrement(r: &mut Resource, amount: f64) {
    if !r.unlocked {
        return;
    }
    let amount = amount.max(0.0);
    r.value = (r.value - amount).max(0.0);
}

/// Make a resource visible/mutable. Does not touch its value.
pub fn unlock(r: &mut Resource) {
    r.unlocked = true;
}

pub fn has_enough(r: &Resource, amount: f64) -> bool {
    r.value >= amount
}

// ── Cost evaluation ─────────────────────────────────────────────────────

/// Price of the next unit after `count` purchases:
/// `floor(base * multiplier^count)` per resource.
pub fn scaled_cost(
    base: &BTreeMap<ResourceId, f64>,
    multiplier: f64,
    count: u64,
) -> BTreeMap<ResourceId, f64> {
    let factor = multiplier.powf(count as f64);
    base.iter()
        .map(|(id, amount)| (id.clone(), (amount * factor).floor()))
        .collect()
}

/// Total price of buying `quantity` units starting from `count` owned.
/// Each unit is floored individually, matching repeated single purchases.
pub fn bulk_cost(
    base: &BTreeMap<ResourceId, f64>,
    multiplier: f64,
    count: u64,
    quantity: u64,
) -> BTreeMap<ResourceId, f64> {
    let mut total: BTreeMap<ResourceId, f64> = BTreeMap::new();
    for i in 0..quantity {
        for (id, amount) in scaled_cost(base, multiplier, count + i) {
            *total.entry(id).or_insert(0.0) += amount;
        }
    }
    total
}

/// True when every listed resource exists and covers its amount. A cost
/// entry naming a resource absent from the ledger fails closed.
pub fn can_afford(
    resources: &BTreeMap<ResourceId, Resource>,
    cost: &BTreeMap<ResourceId, f64>,
) -> bool {
    cost.iter()
        .all(|(id, amount)| resources.get(id).is_some_and(|r| r.value >= *amount))
}

/// Positive shortfalls per under-funded resource (`required - available`).
/// A missing resource is short by the full required amount.
pub fn missing_resources(
    resources: &BTreeMap<ResourceId, Resource>,
    cost: &BTreeMap<ResourceId, f64>,
) -> BTreeMap<ResourceId, f64> {
    let mut missing = BTreeMap::new();
    for (id, amount) in cost {
        let available = resources.get(id).map_or(0.0, |r| r.value);
        if available < *amount {
            missing.insert(id.clone(), amount - available);
        }
    }
    missing
}

// ── Mined-coin market ───────────────────────────────────────────────────

fn bucket_offset(bucket: u64, volatility: f64) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(RATE_SEED ^ bucket.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    rng.gen_range(-volatility..=volatility)
}

/// Exchange rate (usd per coin) at a point in simulated time.
///
/// A bounded walk: each 60 s bucket draws a seeded offset in
/// `[-volatility, +volatility]` and the rate interpolates linearly between
/// adjacent buckets, staying inside `base_rate * (1 ± volatility)`. The
/// same `game_time` always yields the same rate.
pub fn exchange_rate(params: &MiningParams, game_time: f64) -> Result<f64, EconError> {
    if !(0.0..1.0).contains(&params.volatility) {
        return Err(EconError::FractionOutOfRange("volatility"));
    }
    if !params.base_rate.is_finite() || params.base_rate <= 0.0 {
        return Err(EconError::InvalidAmount("base_rate"));
    }
    if params.volatility == 0.0 {
        return Ok(params.base_rate);
    }
    let t = game_time.max(0.0) / RATE_BUCKET_SECS;
    let bucket = t.floor() as u64;
    let frac = t - t.floor();
    let lo = bucket_offset(bucket, params.volatility);
    let hi = bucket_offset(bucket + 1, params.volatility);
    let offset = lo + (hi - lo) * frac;
    Ok(params.base_rate * (1.0 + offset))
}

/// Coin output per second for a given computing-power stock.
/// `boost` is the summed mining-output fraction from effects.
pub fn mining_rate(computing_value: f64, params: &MiningParams, boost: f64) -> f64 {
    computing_value.max(0.0) * params.mining_efficiency * (1.0 + boost.max(0.0))
}

/// Usd credited for selling `amount` coin at `rate`, after commission.
/// `commission_cut` shrinks the commission itself (e.g. 0.5 halves it).
pub fn exchange_proceeds(
    amount: f64,
    rate: f64,
    params: &MiningParams,
    commission_cut: f64,
) -> Result<f64, EconError> {
    if !(0.0..1.0).contains(&params.commission) {
        return Err(EconError::FractionOutOfRange("commission"));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(EconError::InvalidAmount("amount"));
    }
    let commission = params.commission * (1.0 - commission_cut.clamp(0.0, 1.0));
    Ok(amount * rate * (1.0 - commission))
}

/// Usd yielded by `conversions` knowledge applications. One application
/// consumes 10 knowledge and pays `10 * 0.1 = 1.0` usd before boosts; the
/// boost is relative (`1 + fraction`), applied here and nowhere else.
pub fn knowledge_apply_yield(conversions: u64, yield_boost: f64) -> f64 {
    conversions as f64 * KNOWLEDGE_APPLY_COST * KNOWLEDGE_APPLY_YIELD * (1.0 + yield_boost.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::ResourceCategory;
    use proptest::prelude::*;

    fn res(value: f64, max: Option<f64>, unlocked: bool) -> Resource {
        Resource {
            id: ResourceId("r".into()),
            name: "R".into(),
            category: ResourceCategory::Basic,
            value,
            base_max: max,
            max,
            base_production: 0.0,
            production: 0.0,
            consumption: 0.0,
            per_second: 0.0,
            unlocked,
        }
    }

    fn params() -> MiningParams {
        MiningParams {
            base_rate: 100.0,
            volatility: 0.3,
            mining_efficiency: 0.001,
            energy_efficiency: 1.0,
            commission: 0.05,
        }
    }

    #[test]
    fn advance_applies_net_rate_and_clamps() {
        let mut r = res(5.0, Some(10.0), true);
        r.production = 2.0;
        r.consumption = 0.5;
        advance(&mut r, 2.0, false);
        assert_eq!(r.value, 8.0);
        assert_eq!(r.per_second, 1.5);
        advance(&mut r, 100.0, false);
        assert_eq!(r.value, 10.0);
    }

    #[test]
    fn advance_clamps_drain_at_zero() {
        let mut r = res(1.0, None, true);
        r.consumption = 5.0;
        advance(&mut r, 10.0, false);
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn advance_skips_locked_resources() {
        let mut r = res(5.0, None, false);
        r.production = 100.0;
        advance(&mut r, 10.0, false);
        assert_eq!(r.value, 5.0);
        assert_eq!(r.per_second, 0.0);
    }

    #[test]
    fn advance_drops_sub_epsilon_deltas() {
        let mut r = res(5.0, None, true);
        r.production = 1e-9;
        advance(&mut r, 1.0, false);
        assert_eq!(r.value, 5.0);
        assert_eq!(r.per_second, 1e-9);
    }

    #[test]
    fn ignore_consumption_uses_gross_production() {
        let mut r = res(0.0, None, true);
        r.production = 1.0;
        r.consumption = 3.0;
        advance(&mut r, 10.0, true);
        assert_eq!(r.value, 10.0);
    }

    #[test]
    fn increment_and_decrement_clamp() {
        let mut r = res(9.0, Some(10.0), true);
        increment(&mut r, 5.0);
        assert_eq!(r.value, 10.0);
        decrement(&mut r, 25.0);
        assert_eq!(r.value, 0.0);
        increment(&mut r, -5.0);
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn scaled_cost_floors() {
        let base: BTreeMap<_, _> = [(ResourceId("usd".into()), 10.0)].into_iter().collect();
        let c0 = scaled_cost(&base, 1.15, 0);
        let c1 = scaled_cost(&base, 1.15, 1);
        assert_eq!(c0[&ResourceId("usd".into())], 10.0);
        assert_eq!(c1[&ResourceId("usd".into())], 11.0); // floor(11.5)
    }

    #[test]
    fn bulk_cost_matches_repeated_singles() {
        let base: BTreeMap<_, _> = [(ResourceId("usd".into()), 10.0)].into_iter().collect();
        let bulk = bulk_cost(&base, 1.15, 2, 3);
        let singles: f64 = (2..5)
            .map(|n| scaled_cost(&base, 1.15, n)[&ResourceId("usd".into())])
            .sum();
        assert_eq!(bulk[&ResourceId("usd".into())], singles);
    }

    #[test]
    fn absent_resource_fails_closed() {
        let resources: BTreeMap<ResourceId, Resource> = BTreeMap::new();
        let cost: BTreeMap<_, _> = [(ResourceId("usd".into()), 5.0)].into_iter().collect();
        assert!(!can_afford(&resources, &cost));
        let missing = missing_resources(&resources, &cost);
        assert_eq!(missing[&ResourceId("usd".into())], 5.0);
    }

    #[test]
    fn shortfalls_are_positive_only() {
        let mut r = res(3.0, None, true);
        r.id = ResourceId("usd".into());
        let resources: BTreeMap<_, _> = [(ResourceId("usd".into()), r)].into_iter().collect();
        let cost: BTreeMap<_, _> = [(ResourceId("usd".into()), 10.0)].into_iter().collect();
        let missing = missing_resources(&resources, &cost);
        assert_eq!(missing[&ResourceId("usd".into())], 7.0);

        let cheap: BTreeMap<_, _> = [(ResourceId("usd".into()), 2.0)].into_iter().collect();
        assert!(missing_resources(&resources, &cheap).is_empty());
    }

    #[test]
    fn exchange_rate_is_deterministic() {
        let p = params();
        let a = exchange_rate(&p, 1234.5).unwrap();
        let b = exchange_rate(&p, 1234.5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exchange_rate_rejects_bad_volatility() {
        let mut p = params();
        p.volatility = 1.5;
        assert_eq!(
            exchange_rate(&p, 0.0),
            Err(EconError::FractionOutOfRange("volatility"))
        );
    }

    #[test]
    fn zero_volatility_pins_the_rate() {
        let mut p = params();
        p.volatility = 0.0;
        assert_eq!(exchange_rate(&p, 500.0).unwrap(), 100.0);
    }

    #[test]
    fn knowledge_yield_baseline_and_boost() {
        assert_eq!(knowledge_apply_yield(1, 0.0), 1.0);
        assert!((knowledge_apply_yield(3, 0.0) - 3.0).abs() < 1e-12);
        assert!((knowledge_apply_yield(1, 0.1) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn exchange_proceeds_takes_commission() {
        let p = params();
        let gross = exchange_proceeds(2.0, 100.0, &p, 0.0).unwrap();
        assert!((gross - 190.0).abs() < 1e-9);
        let halved = exchange_proceeds(2.0, 100.0, &p, 0.5).unwrap();
        assert!((halved - 195.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn cost_grows_strictly_with_count(
            base_amount in 1.0f64..10_000.0,
            mult in 1.01f64..2.0,
            count in 0u64..60,
        ) {
            let base: BTreeMap<_, _> =
                [(ResourceId("usd".into()), base_amount.floor())].into_iter().collect();
            let a = scaled_cost(&base, mult, count)[&ResourceId("usd".into())];
            let b = scaled_cost(&base, mult, count + 1)[&ResourceId("usd".into())];
            // floors of a strictly growing sequence can tie only when the
            // growth step is < 1 unit; skip those
            prop_assume!(base_amount * mult.powf(count as f64) * (mult - 1.0) >= 1.0);
            prop_assert!(b > a);
        }

        #[test]
        fn advance_respects_bounds(
            value in 0.0f64..100.0,
            production in 0.0f64..50.0,
            consumption in 0.0f64..50.0,
            dt in 0.0f64..120.0,
        ) {
            let mut r = res(value, Some(100.0), true);
            r.production = production;
            r.consumption = consumption;
            advance(&mut r, dt, false);
            prop_assert!(r.value >= 0.0);
            prop_assert!(r.value <= 100.0);
        }

        #[test]
        fn rate_stays_inside_volatility_band(t in 0.0f64..1_000_000.0) {
            let p = params();
            let rate = exchange_rate(&p, t).unwrap();
            prop_assert!(rate >= p.base_rate * (1.0 - p.volatility) - 1e-9);
            prop_assert!(rate <= p.base_rate * (1.0 + p.volatility) + 1e-9);
        }
    }
}

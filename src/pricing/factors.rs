// src/pricing/factors.rs - Per-kind factor evaluation

use bigdecimal::ToPrimitive;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use crate::constants::*;

use super::types::{AdjustmentFactor, FactorContribution, FactorKind, MarketData};

/// Evaluate one factor against the market snapshot. Prices are carried as
/// `f64` here; the engine converts back to decimal once, after clamping.
pub fn evaluate(
    factor: &AdjustmentFactor,
    price: f64,
    market: &MarketData,
    now: DateTime<Utc>,
) -> FactorContribution {
    let (score, impact) = match factor.kind {
        FactorKind::Demand => demand(factor.weight, price, market),
        FactorKind::Competitor => competitor(factor.weight, price, market),
        FactorKind::Time => time_of_day(factor.weight, price, now),
        FactorKind::Capacity => capacity(factor.weight, price, market),
        // Extension point: custom factors contribute nothing by default.
        FactorKind::Custom => (0.0, 0.0),
    };

    FactorContribution {
        name: factor.name.clone(),
        kind: factor.kind,
        score,
        impact,
    }
}

fn demand(weight: f64, price: f64, market: &MarketData) -> (f64, f64) {
    let score = 2.0 * (market.demand - 0.5);
    let impact = score * weight * price * DEMAND_IMPACT_COEFFICIENT;
    (score, impact)
}

fn competitor(weight: f64, price: f64, market: &MarketData) -> (f64, f64) {
    if market.competitors.is_empty() {
        return (0.0, 0.0);
    }

    let mut weighted_sum = 0.0;
    let mut share_sum = 0.0;
    for quote in &market.competitors {
        let share = quote.market_share.unwrap_or(1.0);
        weighted_sum += quote.price.to_f64().unwrap_or(0.0) * share;
        share_sum += share;
    }
    if share_sum <= 0.0 {
        return (0.0, 0.0);
    }
    let mean = weighted_sum / share_sum;
    if mean <= 0.0 {
        return (0.0, 0.0);
    }

    let impact = (COMPETITOR_UNDERCUT_FACTOR * mean - price) * weight * COMPETITOR_IMPACT_COEFFICIENT;
    let score = (mean - price) / mean;
    (score, impact)
}

fn time_of_day(weight: f64, price: f64, now: DateTime<Utc>) -> (f64, f64) {
    let hour = now.hour();
    let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
    let peak = !weekend && matches!(hour, 9..=11 | 14..=16);

    let score = if peak {
        0.5
    } else if weekend {
        -0.3
    } else if hour < 6 || hour > 22 {
        -0.5
    } else {
        0.0
    };
    let impact = score * weight * price * TIME_IMPACT_COEFFICIENT;
    (score, impact)
}

fn capacity(weight: f64, price: f64, market: &MarketData) -> (f64, f64) {
    let score = 2.0 * (0.5 - market.supply);
    let impact = score * weight * price * CAPACITY_IMPACT_COEFFICIENT;
    (score, impact)
}

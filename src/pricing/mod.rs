// src/pricing/mod.rs - Factor-weighted dynamic pricing

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};
use rand::Rng;
use tracing::debug;

pub mod factors;
pub mod types;

pub use types::*;

use crate::constants::*;
use crate::utils::Clock;

/// Source of the market snapshot fed into `optimal`. Real deployments wire
/// this to a competitor-quote service.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn snapshot(&self) -> MarketData;
}

/// Fixed market snapshot.
#[derive(Debug, Clone)]
pub struct StaticMarketFeed(pub MarketData);

#[async_trait]
impl MarketFeed for StaticMarketFeed {
    async fn snapshot(&self) -> MarketData {
        self.0.clone()
    }
}

/// Pricing combiner: starts from the current price, applies every enabled
/// factor, clamps to the configured bounds, and optionally routes through an
/// A/B variant. Never fails on domain input - a degenerate market simply
/// produces a price at the floor.
pub struct PricingEngine {
    config: PricingConfig,
    clock: Arc<dyn Clock>,
    current_price: Mutex<BigDecimal>,
    history: Mutex<VecDeque<PricePoint>>,
}

impl PricingEngine {
    pub fn new(config: PricingConfig, clock: Arc<dyn Clock>) -> Self {
        let current_price = Mutex::new(config.base_price.clone());
        Self {
            config,
            clock,
            current_price,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Compute the recommended price for the given market snapshot.
    pub fn optimal(&self, market: &MarketData) -> PriceRecommendation {
        let now = self.clock.now();
        let current = self.current_price();
        let price_f64 = current.to_f64().unwrap_or(0.0);

        let contributions: Vec<FactorContribution> = self
            .config
            .factors
            .iter()
            .filter(|f| f.enabled)
            .map(|f| factors::evaluate(f, price_f64, market, now))
            .collect();

        let total_impact: f64 = contributions.iter().map(|c| c.impact).sum();
        let mut recommended = self.clamp(
            BigDecimal::from_f64(price_f64 + total_impact).unwrap_or_else(|| current.clone()),
        );

        let variant = self.pick_variant();
        if let Some(variant) = &variant {
            let multiplied = recommended.to_f64().unwrap_or(0.0) * variant.multiplier;
            recommended = self.clamp(
                BigDecimal::from_f64(multiplied).unwrap_or_else(|| recommended.clone()),
            );
        }

        let expected_impact = expected_impact(price_f64, recommended.to_f64().unwrap_or(0.0));
        let confidence = self.confidence(market, &contributions);

        debug!(
            current = %current,
            recommended = %recommended,
            total_impact,
            confidence,
            "Price recommendation computed"
        );

        PriceRecommendation {
            current_price: current,
            recommended_price: recommended,
            contributions,
            expected_impact,
            confidence,
            variant: variant.map(|v| v.name),
            generated_at: now,
        }
    }

    /// Record an observed price point and make it the current price.
    /// History is capped; the oldest entry falls off first.
    pub fn update(&self, new_price: BigDecimal, volume: f64, revenue: f64) {
        let mut history = self.history.lock().expect("history mutex poisoned");
        history.push_back(PricePoint {
            price: new_price.clone(),
            volume,
            revenue,
            recorded_at: self.clock.now(),
        });
        if history.len() > PRICE_HISTORY_CAP {
            history.pop_front();
        }
        drop(history);

        let mut current = self.current_price.lock().expect("price mutex poisoned");
        *current = new_price;
    }

    pub fn current_price(&self) -> BigDecimal {
        self.current_price
            .lock()
            .expect("price mutex poisoned")
            .clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().expect("history mutex poisoned").len()
    }

    fn clamp(&self, price: BigDecimal) -> BigDecimal {
        if price < self.config.floor {
            self.config.floor.clone()
        } else if price > self.config.ceiling {
            self.config.ceiling.clone()
        } else {
            price
        }
    }

    /// Weighted random pick over the configured variants.
    fn pick_variant(&self) -> Option<PriceVariant> {
        let ab = self.config.ab_test.as_ref().filter(|ab| ab.enabled)?;
        if ab.variants.is_empty() {
            return None;
        }

        let mut remaining = rand::thread_rng().gen::<f64>();
        for variant in &ab.variants {
            remaining -= variant.allocation;
            if remaining <= 0.0 {
                return Some(variant.clone());
            }
        }
        // Allocations sum to 1.0; floating error can leave a sliver.
        ab.variants.last().cloned()
    }

    fn confidence(&self, market: &MarketData, contributions: &[FactorContribution]) -> f64 {
        let mut confidence = PRICING_BASE_CONFIDENCE;
        if self.history_len() > PRICING_HISTORY_BONUS_MIN_LEN {
            confidence += PRICING_HISTORY_CONFIDENCE_BONUS;
        }
        if market.competitors.len() >= PRICING_COMPETITOR_BONUS_MIN {
            confidence += PRICING_COMPETITOR_CONFIDENCE_BONUS;
        }
        if score_variance(contributions) > PRICING_SCORE_VARIANCE_LIMIT {
            confidence -= PRICING_VARIANCE_CONFIDENCE_PENALTY;
        }
        confidence.clamp(0.0, 1.0)
    }
}

fn score_variance(contributions: &[FactorContribution]) -> f64 {
    if contributions.is_empty() {
        return 0.0;
    }
    let n = contributions.len() as f64;
    let mean = contributions.iter().map(|c| c.score).sum::<f64>() / n;
    contributions
        .iter()
        .map(|c| (c.score - mean).powi(2))
        .sum::<f64>()
        / n
}

/// Constant-elasticity projection of the price move.
fn expected_impact(current: f64, recommended: f64) -> ExpectedImpact {
    if current <= 0.0 {
        return ExpectedImpact {
            demand_change_pct: 0.0,
            revenue_change_pct: 0.0,
            margin_change_pct: 0.0,
        };
    }
    let price_ratio = (recommended - current) / current;
    let demand_change = PRICE_ELASTICITY * price_ratio;
    let revenue_change = (1.0 + price_ratio) * (1.0 + demand_change) - 1.0;
    let margin_change = price_ratio * MARGIN_SENSITIVITY;

    ExpectedImpact {
        demand_change_pct: demand_change * 100.0,
        revenue_change_pct: revenue_change * 100.0,
        margin_change_pct: margin_change * 100.0,
    }
}

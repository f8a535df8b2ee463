// src/pricing/types.rs - Type definitions for dynamic pricing

use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Factor family feeding the price adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorKind {
    Demand,
    Competitor,
    Time,
    Capacity,
    Custom,
}

/// One configured adjustment factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentFactor {
    pub name: String,
    pub kind: FactorKind,
    pub weight: f64,
    pub enabled: bool,
    /// Kind-specific settings, opaque to the engine.
    pub config: Option<serde_json::Value>,
}

impl AdjustmentFactor {
    pub fn new(name: impl Into<String>, kind: FactorKind, weight: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            weight,
            enabled: true,
            config: None,
        }
    }
}

/// Competitor quote from the injected feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorQuote {
    pub name: String,
    pub price: BigDecimal,
    pub market_share: Option<f64>,
}

/// Market snapshot handed to `optimal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    /// Demand pressure in [0, 1].
    pub demand: f64,
    /// Available supply in [0, 1].
    pub supply: f64,
    pub competitors: Vec<CompetitorQuote>,
}

/// One entry of the capped price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: BigDecimal,
    pub volume: f64,
    pub revenue: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Per-factor outcome reported with a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorContribution {
    pub name: String,
    pub kind: FactorKind,
    pub score: f64,
    pub impact: f64,
}

/// Projected effect of moving to the recommended price, in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedImpact {
    pub demand_change_pct: f64,
    pub revenue_change_pct: f64,
    pub margin_change_pct: f64,
}

/// Output of the pricing combiner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecommendation {
    pub current_price: BigDecimal,
    pub recommended_price: BigDecimal,
    pub contributions: Vec<FactorContribution>,
    pub expected_impact: ExpectedImpact,
    pub confidence: f64,
    pub variant: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// A/B price variant; allocations across the set sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceVariant {
    pub name: String,
    pub multiplier: f64,
    pub allocation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbTestConfig {
    pub enabled: bool,
    pub variants: Vec<PriceVariant>,
}

/// Engine configuration: price bounds and the factor set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub base_price: BigDecimal,
    pub floor: BigDecimal,
    pub ceiling: BigDecimal,
    /// Reserved tuning knob; nothing reads it yet.
    pub learning_rate: f64,
    pub factors: Vec<AdjustmentFactor>,
    pub ab_test: Option<AbTestConfig>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_price: BigDecimal::from_f64(10.0).expect("valid decimal"),
            floor: BigDecimal::from_f64(1.0).expect("valid decimal"),
            ceiling: BigDecimal::from_f64(100.0).expect("valid decimal"),
            learning_rate: 0.1,
            factors: vec![
                AdjustmentFactor::new("demand", FactorKind::Demand, 1.0),
                AdjustmentFactor::new("competitor", FactorKind::Competitor, 1.0),
                AdjustmentFactor::new("time", FactorKind::Time, 0.5),
                AdjustmentFactor::new("capacity", FactorKind::Capacity, 1.0),
            ],
            ab_test: None,
        }
    }
}

// Protocol, position, and report types

use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categorical risk label on a yield protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Multiplier applied to APY when ranking protocols.
    pub fn risk_multiplier(&self) -> f64 {
        match self {
            RiskTier::Low => 1.0,
            RiskTier::Medium => 0.8,
            RiskTier::High => 0.6,
        }
    }
}

/// Allocation strategy controlling which risk tiers are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl Strategy {
    pub fn admits(&self, tier: RiskTier) -> bool {
        match self {
            Strategy::Conservative => matches!(tier, RiskTier::Low),
            Strategy::Balanced => matches!(tier, RiskTier::Low | RiskTier::Medium),
            Strategy::Aggressive => true,
        }
    }
}

/// One yield protocol as reported by the injected feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub name: String,
    /// Advertised APY in percent.
    pub apy_percent: f64,
    pub tvl: BigDecimal,
    pub risk_tier: RiskTier,
    /// Configured allocation weight; non-negative.
    pub weight: f64,
    pub min_deposit: BigDecimal,
}

impl Protocol {
    /// Ranking score: APY discounted by tier, scaled by weight. Used to
    /// order targets for reporting; allocation itself is weight-based.
    pub fn risk_adjusted_score(&self) -> f64 {
        self.apy_percent * self.risk_tier.risk_multiplier() * self.weight
    }
}

/// A deployed position owned by the allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub protocol: String,
    pub amount: BigDecimal,
    /// APY observed when the position was (last) entered.
    pub entry_apy: f64,
    pub value: BigDecimal,
    pub last_updated: DateTime<Utc>,
}

/// One entry of the computed target allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTarget {
    pub protocol: String,
    pub amount: BigDecimal,
    pub score: f64,
    pub apy_percent: f64,
    pub risk_tier: RiskTier,
}

/// Optimization outcome handed back to the embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldReport {
    pub generated_at: DateTime<Utc>,
    pub total_value: BigDecimal,
    pub weighted_apy: f64,
    pub baseline_apy: f64,
    pub vs_baseline_pct: f64,
    /// Targets ordered by risk-adjusted score, best first.
    pub targets: Vec<AllocationTarget>,
    pub rebalanced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldConfig {
    pub strategy: Strategy,
    /// Funds never deployed to any protocol.
    pub emergency_reserve: BigDecimal,
    /// Balances under this threshold skip optimization entirely.
    pub min_balance_threshold: BigDecimal,
    /// Relative drift tolerated before a rebalance is triggered.
    pub rebalance_tolerance: f64,
    pub baseline_apy: f64,
}

impl Default for YieldConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Balanced,
            emergency_reserve: BigDecimal::from_f64(1000.0).expect("valid decimal"),
            min_balance_threshold: BigDecimal::from_f64(100.0).expect("valid decimal"),
            rebalance_tolerance: 0.05,
            baseline_apy: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_risk_filters() {
        assert!(Strategy::Conservative.admits(RiskTier::Low));
        assert!(!Strategy::Conservative.admits(RiskTier::Medium));
        assert!(Strategy::Balanced.admits(RiskTier::Medium));
        assert!(!Strategy::Balanced.admits(RiskTier::High));
        assert!(Strategy::Aggressive.admits(RiskTier::High));
    }

    #[test]
    fn test_risk_adjusted_score() {
        let protocol = Protocol {
            name: "kamino".to_string(),
            apy_percent: 10.0,
            tvl: BigDecimal::from_f64(1_000_000.0).unwrap(),
            risk_tier: RiskTier::Medium,
            weight: 2.0,
            min_deposit: BigDecimal::from_f64(50.0).unwrap(),
        };
        assert!((protocol.risk_adjusted_score() - 16.0).abs() < 1e-9);
    }
}

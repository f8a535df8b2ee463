// Bridge, hop, and route types

use std::collections::HashSet;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parameterized cross-chain transfer primitive. Contributes one graph
/// edge for every ordered pair of distinct supported chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bridge {
    pub name: String,
    pub supported_chains: HashSet<String>,
    /// Flat fee in USD charged per transfer.
    pub base_fee: BigDecimal,
    /// Percentage fee on the transferred amount.
    pub fee_percent: f64,
    pub avg_transfer_secs: u64,
    pub max_slippage_pct: f64,
    pub min_amount: BigDecimal,
    pub max_amount: BigDecimal,
    /// Intrinsic delivery reliability in (0, 1].
    pub reliability: f64,
}

impl Bridge {
    pub fn connects(&self, a: &str, b: &str) -> bool {
        a != b && self.supported_chains.contains(a) && self.supported_chains.contains(b)
    }

    pub fn admits(&self, amount: &BigDecimal) -> bool {
        *amount >= self.min_amount && *amount <= self.max_amount
    }
}

/// Optimization criterion for route selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteObjective {
    Cost,
    Speed,
    #[default]
    Balance,
}

/// Gas price snapshot for one chain, in gwei per tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasPrices {
    pub standard_gwei: f64,
    pub fast_gwei: f64,
    pub instant_gwei: f64,
    pub updated_at: DateTime<Utc>,
}

impl GasPrices {
    /// Tier selection: cost-optimized routes settle for standard inclusion,
    /// speed-optimized routes pay for instant.
    pub fn tier_gwei(&self, objective: RouteObjective) -> f64 {
        match objective {
            RouteObjective::Cost => self.standard_gwei,
            RouteObjective::Balance => self.fast_gwei,
            RouteObjective::Speed => self.instant_gwei,
        }
    }
}

/// One bridge edge in a selected route. `amount` is what enters the hop;
/// the hop pays its own cost, so `amount - cost_usd` flows onward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteHop {
    pub from_chain: String,
    pub to_chain: String,
    pub bridge: String,
    pub amount: BigDecimal,
    pub cost_usd: BigDecimal,
    pub gas_usd: BigDecimal,
    pub time_secs: u64,
}

/// Selected route with aggregate cost, time, and delivery probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub from_chain: String,
    pub to_chain: String,
    pub amount_in: BigDecimal,
    pub amount_out: BigDecimal,
    pub path: Vec<RouteHop>,
    pub total_cost: BigDecimal,
    pub total_time_secs: u64,
    pub hop_count: usize,
    pub success_probability: f64,
    pub recommendation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::FromPrimitive;

    fn test_bridge() -> Bridge {
        Bridge {
            name: "wormhole".to_string(),
            supported_chains: ["solana".to_string(), "ethereum".to_string()]
                .into_iter()
                .collect(),
            base_fee: BigDecimal::from_f64(5.0).unwrap(),
            fee_percent: 0.1,
            avg_transfer_secs: 180,
            max_slippage_pct: 0.5,
            min_amount: BigDecimal::from_f64(10.0).unwrap(),
            max_amount: BigDecimal::from_f64(1_000_000.0).unwrap(),
            reliability: 0.98,
        }
    }

    #[test]
    fn test_bridge_connects() {
        let bridge = test_bridge();
        assert!(bridge.connects("solana", "ethereum"));
        assert!(bridge.connects("ethereum", "solana"));
        assert!(!bridge.connects("solana", "solana"));
        assert!(!bridge.connects("solana", "polygon"));
    }

    #[test]
    fn test_bridge_admits_range() {
        let bridge = test_bridge();
        assert!(bridge.admits(&BigDecimal::from_f64(10.0).unwrap()));
        assert!(bridge.admits(&BigDecimal::from_f64(1_000_000.0).unwrap()));
        assert!(!bridge.admits(&BigDecimal::from_f64(9.99).unwrap()));
        assert!(!bridge.admits(&BigDecimal::from_f64(1_000_001.0).unwrap()));
    }

    #[test]
    fn test_gas_tier_selection() {
        let gas = GasPrices {
            standard_gwei: 20.0,
            fast_gwei: 30.0,
            instant_gwei: 50.0,
            updated_at: Utc::now(),
        };
        assert_eq!(gas.tier_gwei(RouteObjective::Cost), 20.0);
        assert_eq!(gas.tier_gwei(RouteObjective::Balance), 30.0);
        assert_eq!(gas.tier_gwei(RouteObjective::Speed), 50.0);
    }
}

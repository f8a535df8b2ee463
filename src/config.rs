// src/config.rs - Engine configuration with environment overrides

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Result};
use bigdecimal::{BigDecimal, FromPrimitive};

use paymesh_router::RouterConfig;
use paymesh_swarm::SwarmConfig;
use paymesh_yield::YieldConfig;

use crate::fraud::FraudConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::pricing::PricingConfig;

/// Aggregate configuration for every core. Defaults are production-sane;
/// `from_env` overrides the scalar knobs from the environment.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub fraud: FraudConfig,
    pub pricing: PricingConfig,
    pub router: RouterConfig,
    pub yield_allocation: YieldConfig,
    pub swarm: SwarmConfig,
    pub orchestrator: OrchestratorConfig,
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults.
    /// A `.env` file is honored when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        config.fraud.velocity_threshold =
            env_parse("PAYMESH_VELOCITY_THRESHOLD", config.fraud.velocity_threshold);
        config.fraud.deviation_threshold =
            env_parse("PAYMESH_DEVIATION_THRESHOLD", config.fraud.deviation_threshold);

        config.pricing.base_price = env_decimal("PAYMESH_BASE_PRICE", &config.pricing.base_price);
        config.pricing.floor = env_decimal("PAYMESH_PRICE_FLOOR", &config.pricing.floor);
        config.pricing.ceiling = env_decimal("PAYMESH_PRICE_CEILING", &config.pricing.ceiling);

        config.router.max_hops = env_parse("PAYMESH_MAX_HOPS", config.router.max_hops);
        config.router.gas_multiplier =
            env_parse("PAYMESH_GAS_MULTIPLIER", config.router.gas_multiplier);

        config.yield_allocation.emergency_reserve = env_decimal(
            "PAYMESH_EMERGENCY_RESERVE",
            &config.yield_allocation.emergency_reserve,
        );
        config.yield_allocation.min_balance_threshold = env_decimal(
            "PAYMESH_MIN_BALANCE_THRESHOLD",
            &config.yield_allocation.min_balance_threshold,
        );

        config.swarm.consensus_threshold = env_parse(
            "PAYMESH_CONSENSUS_THRESHOLD",
            config.swarm.consensus_threshold,
        );
        if let Some(secs) = env_opt::<u64>("PAYMESH_RECOVERY_DELAY_SECS") {
            config.swarm.recovery_delay = Duration::from_secs(secs);
        }

        config.orchestrator.high_value_threshold = env_decimal(
            "PAYMESH_HIGH_VALUE_THRESHOLD",
            &config.orchestrator.high_value_threshold,
        );

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.pricing.floor <= self.pricing.ceiling,
            "price floor must not exceed ceiling"
        );
        ensure!(
            (0.0..=1.0).contains(&self.swarm.consensus_threshold),
            "consensus threshold must lie in [0, 1]"
        );
        ensure!(self.router.max_hops >= 1, "max hops must be at least 1");
        ensure!(
            self.yield_allocation.rebalance_tolerance >= 0.0,
            "rebalance tolerance must be non-negative"
        );
        Ok(())
    }
}

fn env_opt<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.parse().ok())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).unwrap_or(default)
}

fn env_decimal(key: &str, default: &BigDecimal) -> BigDecimal {
    env_opt::<f64>(key)
        .and_then(BigDecimal::from_f64)
        .unwrap_or_else(|| default.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        env::set_var("PAYMESH_MAX_HOPS", "6");
        env::set_var("PAYMESH_CONSENSUS_THRESHOLD", "0.75");

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.router.max_hops, 6);
        assert!((config.swarm.consensus_threshold - 0.75).abs() < 1e-9);

        env::remove_var("PAYMESH_MAX_HOPS");
        env::remove_var("PAYMESH_CONSENSUS_THRESHOLD");
    }

    #[test]
    fn test_garbage_env_falls_back_to_default() {
        env::set_var("PAYMESH_GAS_MULTIPLIER", "not-a-number");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.router.gas_multiplier, 1.0);
        env::remove_var("PAYMESH_GAS_MULTIPLIER");
    }
}

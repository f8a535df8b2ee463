// Injected market-data collaborators: gas prices and bridge snapshots

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::{Bridge, GasPrices, RouterError};

/// Gas and native-token price source for each chain.
#[async_trait]
pub trait GasFeed: Send + Sync {
    async fn gas(&self, chain: &str) -> Result<GasPrices, RouterError>;
    async fn native_price_usd(&self, chain: &str) -> Result<f64, RouterError>;
}

/// Enumeration of available bridges plus per-bridge liquidity.
#[async_trait]
pub trait BridgeFeed: Send + Sync {
    async fn bridges(&self) -> Result<Vec<Bridge>, RouterError>;
    /// Current liquidity for a bridge; `None` when the feed has no data,
    /// in which case the router does not constrain on liquidity.
    async fn liquidity(&self, bridge: &str) -> Result<Option<BigDecimal>, RouterError>;
}

/// Fixed in-memory gas feed for configuration-driven deployments and tests.
#[derive(Debug, Default)]
pub struct StaticGasFeed {
    chains: HashMap<String, (GasPrices, f64)>,
}

impl StaticGasFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, chain: &str, gas: GasPrices, native_price_usd: f64) -> Self {
        self.chains
            .insert(chain.to_string(), (gas, native_price_usd));
        self
    }
}

#[async_trait]
impl GasFeed for StaticGasFeed {
    async fn gas(&self, chain: &str) -> Result<GasPrices, RouterError> {
        self.chains
            .get(chain)
            .map(|(gas, _)| gas.clone())
            .ok_or_else(|| RouterError::FeedFailure(format!("no gas data for chain {chain}")))
    }

    async fn native_price_usd(&self, chain: &str) -> Result<f64, RouterError> {
        self.chains
            .get(chain)
            .map(|(_, price)| *price)
            .ok_or_else(|| RouterError::FeedFailure(format!("no native price for chain {chain}")))
    }
}

/// Fixed in-memory bridge feed.
#[derive(Debug, Default)]
pub struct StaticBridgeFeed {
    bridges: Vec<Bridge>,
    liquidity: HashMap<String, BigDecimal>,
}

impl StaticBridgeFeed {
    pub fn new(bridges: Vec<Bridge>) -> Self {
        Self {
            bridges,
            liquidity: HashMap::new(),
        }
    }

    pub fn with_liquidity(mut self, bridge: &str, liquidity: BigDecimal) -> Self {
        self.liquidity.insert(bridge.to_string(), liquidity);
        self
    }
}

#[async_trait]
impl BridgeFeed for StaticBridgeFeed {
    async fn bridges(&self) -> Result<Vec<Bridge>, RouterError> {
        Ok(self.bridges.clone())
    }

    async fn liquidity(&self, bridge: &str) -> Result<Option<BigDecimal>, RouterError> {
        Ok(self.liquidity.get(bridge).cloned())
    }
}
